//! Payout countries.
//!
//! The withholding table matches this enum exhaustively, so supporting a
//! new country is a compile-time-checked change rather than a missing key
//! at runtime. Codes that the platform has no specific rule for parse to
//! [`Country::Other`], which carries the conservative default treatment.

use serde::{Deserialize, Serialize};

/// Country of a creator's payout profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Country {
    UnitedStates,
    UnitedKingdom,
    Germany,
    Japan,
    Brazil,
    /// Any country without a specific withholding rule.
    #[default]
    Other,
}

impl Country {
    /// Parse an ISO 3166-1 alpha-2 code. Unknown codes map to `Other`.
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "US" => Self::UnitedStates,
            "GB" => Self::UnitedKingdom,
            "DE" => Self::Germany,
            "JP" => Self::Japan,
            "BR" => Self::Brazil,
            _ => Self::Other,
        }
    }

    /// Stable storage code.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::UnitedStates => "US",
            Self::UnitedKingdom => "GB",
            Self::Germany => "DE",
            Self::Japan => "JP",
            Self::Brazil => "BR",
            Self::Other => "XX",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(Country::from_code("US"), Country::UnitedStates);
        assert_eq!(Country::from_code("gb"), Country::UnitedKingdom);
        assert_eq!(Country::from_code("De"), Country::Germany);
    }

    #[test]
    fn test_unknown_code_is_other() {
        assert_eq!(Country::from_code("ZZ"), Country::Other);
        assert_eq!(Country::from_code(""), Country::Other);
    }

    #[test]
    fn test_round_trip() {
        for country in [
            Country::UnitedStates,
            Country::UnitedKingdom,
            Country::Germany,
            Country::Japan,
            Country::Brazil,
        ] {
            assert_eq!(Country::from_code(country.as_code()), country);
        }
    }
}
