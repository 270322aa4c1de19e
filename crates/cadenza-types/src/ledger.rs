//! Ledger and payout code enumerations.
//!
//! Every enum here has a stable string code used in the database and over
//! RPC. Parsing a stored code back is fallible; the database only ever
//! contains codes written through these types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodeParseError;

/// Origin of a ledger credit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionSource {
    StreamView,
    SubscriptionShare,
    Tip,
    CollaborationSplit,
    LicensingShare,
    FraudReversal,
}

impl TransactionSource {
    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamView => "stream-view",
            Self::SubscriptionShare => "subscription-share",
            Self::Tip => "tip",
            Self::CollaborationSplit => "collaboration-split",
            Self::LicensingShare => "licensing-share",
            Self::FraudReversal => "fraud-reversal",
        }
    }
}

impl FromStr for TransactionSource {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream-view" => Ok(Self::StreamView),
            "subscription-share" => Ok(Self::SubscriptionShare),
            "tip" => Ok(Self::Tip),
            "collaboration-split" => Ok(Self::CollaborationSplit),
            "licensing-share" => Ok(Self::LicensingShare),
            "fraud-reversal" => Ok(Self::FraudReversal),
            other => Err(CodeParseError {
                kind: "transaction source",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a ledger transaction.
///
/// `Reversed` is the only permitted transition, applied to the original
/// row when a fraud-reversal transaction references it. Amounts are never
/// edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionStatus {
    Credited,
    Reversed,
}

impl TransactionStatus {
    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credited => "credited",
            Self::Reversed => "reversed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credited" => Ok(Self::Credited),
            "reversed" => Ok(Self::Reversed),
            other => Err(CodeParseError {
                kind: "transaction status",
                value: other.to_string(),
            }),
        }
    }
}

/// Channel by which accrued balance is paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayoutMethod {
    /// Processor-connect account transfer.
    Connect,
    /// SEPA/SWIFT bank transfer.
    Bank,
    /// Crypto wallet transfer.
    Crypto,
    /// Human-actionable invoice record; the fallback that cannot fail.
    ManualInvoice,
}

impl PayoutMethod {
    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Bank => "bank",
            Self::Crypto => "crypto",
            Self::ManualInvoice => "manual-invoice",
        }
    }
}

impl FromStr for PayoutMethod {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(Self::Connect),
            "bank" => Ok(Self::Bank),
            "crypto" => Ok(Self::Crypto),
            "manual-invoice" => Ok(Self::ManualInvoice),
            other => Err(CodeParseError {
                kind: "payout method",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a payout attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Failed,
}

impl PayoutStatus {
    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CodeParseError {
                kind: "payout status",
                value: other.to_string(),
            }),
        }
    }
}

/// Named treasury fund.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FundKind {
    PlatformOps,
    PriorityFund,
    Governance,
    ResearchDev,
    CreatorPool,
}

impl FundKind {
    /// All funds, in allocation order.
    pub const ALL: [FundKind; 5] = [
        Self::PlatformOps,
        Self::PriorityFund,
        Self::Governance,
        Self::ResearchDev,
        Self::CreatorPool,
    ];

    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformOps => "platform-ops",
            Self::PriorityFund => "priority-fund",
            Self::Governance => "governance",
            Self::ResearchDev => "r-and-d",
            Self::CreatorPool => "creator-pool",
        }
    }
}

impl FromStr for FundKind {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform-ops" => Ok(Self::PlatformOps),
            "priority-fund" => Ok(Self::PriorityFund),
            "governance" => Ok(Self::Governance),
            "r-and-d" => Ok(Self::ResearchDev),
            "creator-pool" => Ok(Self::CreatorPool),
            other => Err(CodeParseError {
                kind: "fund",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for source in [
            TransactionSource::StreamView,
            TransactionSource::SubscriptionShare,
            TransactionSource::Tip,
            TransactionSource::CollaborationSplit,
            TransactionSource::LicensingShare,
            TransactionSource::FraudReversal,
        ] {
            let parsed: TransactionSource = source.as_str().parse().expect("parse");
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_method_round_trip() {
        for method in [
            PayoutMethod::Connect,
            PayoutMethod::Bank,
            PayoutMethod::Crypto,
            PayoutMethod::ManualInvoice,
        ] {
            let parsed: PayoutMethod = method.as_str().parse().expect("parse");
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn test_fund_round_trip() {
        for fund in FundKind::ALL {
            let parsed: FundKind = fund.as_str().parse().expect("parse");
            assert_eq!(parsed, fund);
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        assert!("refund".parse::<TransactionSource>().is_err());
        assert!("paypal".parse::<PayoutMethod>().is_err());
        assert!("slush".parse::<FundKind>().is_err());
        assert!("voided".parse::<TransactionStatus>().is_err());
        assert!("queued".parse::<PayoutStatus>().is_err());
    }
}
