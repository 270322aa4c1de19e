//! Creator tiers.
//!
//! A tier is a per-creator designation carrying a royalty multiplier.
//! Multipliers are expressed in basis points of 1.0x so that all royalty
//! math stays in integers. Adding a tier is a compile-time-checked change:
//! every match over [`CreatorTier`] is exhaustive.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodeParseError;

/// A creator's designated tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreatorTier {
    /// New creators, 1.0x.
    #[default]
    Emerging,
    /// 1.25x.
    Rising,
    /// 1.5x.
    Established,
    /// 1.75x.
    Featured,
    /// Priority artists, 2.0x.
    Priority,
}

impl CreatorTier {
    /// Royalty multiplier in basis points (10_000 = 1.0x).
    pub fn multiplier_bps(&self) -> u64 {
        match self {
            Self::Emerging => 10_000,
            Self::Rising => 12_500,
            Self::Established => 15_000,
            Self::Featured => 17_500,
            Self::Priority => 20_000,
        }
    }

    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emerging => "emerging",
            Self::Rising => "rising",
            Self::Established => "established",
            Self::Featured => "featured",
            Self::Priority => "priority",
        }
    }
}

impl FromStr for CreatorTier {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emerging" => Ok(Self::Emerging),
            "rising" => Ok(Self::Rising),
            "established" => Ok(Self::Established),
            "featured" => Ok(Self::Featured),
            "priority" => Ok(Self::Priority),
            other => Err(CodeParseError {
                kind: "creator tier",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_emerging() {
        assert_eq!(CreatorTier::default(), CreatorTier::Emerging);
        assert_eq!(CreatorTier::default().multiplier_bps(), 10_000);
    }

    #[test]
    fn test_multipliers_are_monotonic() {
        let tiers = [
            CreatorTier::Emerging,
            CreatorTier::Rising,
            CreatorTier::Established,
            CreatorTier::Featured,
            CreatorTier::Priority,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0].multiplier_bps() < pair[1].multiplier_bps());
        }
    }

    #[test]
    fn test_code_round_trip() {
        for tier in [
            CreatorTier::Emerging,
            CreatorTier::Rising,
            CreatorTier::Established,
            CreatorTier::Featured,
            CreatorTier::Priority,
        ] {
            let parsed: CreatorTier = tier.as_str().parse().expect("parse");
            assert_eq!(parsed, tier);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!("platinum".parse::<CreatorTier>().is_err());
    }
}
