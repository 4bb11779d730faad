//! Activity ledger domain models.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::activities::activities_constants::*;
use crate::errors::ClassificationError;

/// Enum representing the categories of ledger events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Contribution,
    RegularContribution,
    TaxUplift,
    Withdrawal,
    RegularWithdrawal,
    SwitchIn,
    SwitchOut,
    #[serde(rename = "SWITCH")]
    LegacySwitch,
    Fee,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Contribution => ACTIVITY_TYPE_CONTRIBUTION,
            ActivityType::RegularContribution => ACTIVITY_TYPE_REGULAR_CONTRIBUTION,
            ActivityType::TaxUplift => ACTIVITY_TYPE_TAX_UPLIFT,
            ActivityType::Withdrawal => ACTIVITY_TYPE_WITHDRAWAL,
            ActivityType::RegularWithdrawal => ACTIVITY_TYPE_REGULAR_WITHDRAWAL,
            ActivityType::SwitchIn => ACTIVITY_TYPE_SWITCH_IN,
            ActivityType::SwitchOut => ACTIVITY_TYPE_SWITCH_OUT,
            ActivityType::LegacySwitch => ACTIVITY_TYPE_LEGACY_SWITCH,
            ActivityType::Fee => ACTIVITY_TYPE_FEE,
        }
    }

    pub fn is_switch(&self) -> bool {
        matches!(
            self,
            ActivityType::SwitchIn | ActivityType::SwitchOut | ActivityType::LegacySwitch
        )
    }

    /// Sign applied to the stored magnitude to get net capital into the holding.
    /// Legacy switches store a signed amount and keep it as-is.
    pub fn capital_sign(&self) -> Decimal {
        match self {
            ActivityType::Contribution
            | ActivityType::RegularContribution
            | ActivityType::TaxUplift
            | ActivityType::SwitchIn
            | ActivityType::LegacySwitch => Decimal::ONE,
            ActivityType::Withdrawal
            | ActivityType::RegularWithdrawal
            | ActivityType::SwitchOut
            | ActivityType::Fee => Decimal::NEGATIVE_ONE,
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let label = s.trim().to_ascii_uppercase();
        let label = LEGACY_ACTIVITY_LABELS
            .iter()
            .find(|(legacy, _)| *legacy == label)
            .map(|(_, current)| (*current).to_string())
            .unwrap_or(label);

        match label.as_str() {
            ACTIVITY_TYPE_CONTRIBUTION => Ok(ActivityType::Contribution),
            ACTIVITY_TYPE_REGULAR_CONTRIBUTION => Ok(ActivityType::RegularContribution),
            ACTIVITY_TYPE_TAX_UPLIFT => Ok(ActivityType::TaxUplift),
            ACTIVITY_TYPE_WITHDRAWAL => Ok(ActivityType::Withdrawal),
            ACTIVITY_TYPE_REGULAR_WITHDRAWAL => Ok(ActivityType::RegularWithdrawal),
            ACTIVITY_TYPE_SWITCH_IN => Ok(ActivityType::SwitchIn),
            ACTIVITY_TYPE_SWITCH_OUT => Ok(ActivityType::SwitchOut),
            ACTIVITY_TYPE_LEGACY_SWITCH => Ok(ActivityType::LegacySwitch),
            ACTIVITY_TYPE_FEE => Ok(ActivityType::Fee),
            _ => Err(format!("Unknown activity type: {}", s)),
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger record for one holding.
///
/// Corrections never edit a record: a reversal event carries the type of the
/// event it corrects plus `reversal_of`, and negates its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    pub holding_id: String,
    pub activity_type: ActivityType,
    pub amount: Decimal,
    pub event_date: NaiveDate,
    pub related_fund_id: Option<String>,
    pub reversal_of: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn is_reversal(&self) -> bool {
        self.reversal_of.is_some()
    }

    /// Net capital moved into the holding by this event.
    pub fn signed_amount(&self) -> std::result::Result<Decimal, ClassificationError> {
        if self.activity_type != ActivityType::LegacySwitch
            && self.amount.is_sign_negative()
            && !self.amount.is_zero()
        {
            return Err(ClassificationError::NegativeAmount {
                event_id: self.id.clone(),
                activity_type: self.activity_type.to_string(),
            });
        }

        let signed = self.amount * self.activity_type.capital_sign();
        Ok(if self.is_reversal() { -signed } else { signed })
    }
}
