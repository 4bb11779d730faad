//! Fee configuration models and the raw-input parser.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// Raw values treated as an explicitly absent fee.
pub const FEE_ABSENT_MARKERS: [&str; 4] = ["waived", "n/a", "none", "-"];

/// The three tiers of the fee model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    /// Annual amount charged directly to the client.
    FixedDirect,
    /// Annual amount collected through the provider.
    FixedFacilitated,
    /// Percentage of the product valuation collected through the provider.
    PercentageFacilitated,
}

impl FeeKind {
    pub fn field_name(&self) -> &'static str {
        match self {
            FeeKind::FixedDirect => "fixed_fee_direct",
            FeeKind::FixedFacilitated => "fixed_fee_facilitated",
            FeeKind::PercentageFacilitated => "percentage_fee_facilitated",
        }
    }
}

/// Fee configuration of one product. `None` means the fee does not apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfiguration {
    pub product_id: String,
    pub fixed_fee_direct: Option<Decimal>,
    pub fixed_fee_facilitated: Option<Decimal>,
    pub percentage_fee_facilitated: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl FeeConfiguration {
    /// Builds a configuration from raw stored or submitted text.
    pub fn from_raw(
        product_id: impl Into<String>,
        fixed_fee_direct: Option<&str>,
        fixed_fee_facilitated: Option<&str>,
        percentage_fee_facilitated: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            product_id: product_id.into(),
            fixed_fee_direct: parse_fee_field(fixed_fee_direct, FeeKind::FixedDirect)?,
            fixed_fee_facilitated: parse_fee_field(
                fixed_fee_facilitated,
                FeeKind::FixedFacilitated,
            )?,
            percentage_fee_facilitated: parse_fee_field(
                percentage_fee_facilitated,
                FeeKind::PercentageFacilitated,
            )?,
            updated_at,
        })
    }

    pub fn fee(&self, kind: FeeKind) -> Option<Decimal> {
        match kind {
            FeeKind::FixedDirect => self.fixed_fee_direct,
            FeeKind::FixedFacilitated => self.fixed_fee_facilitated,
            FeeKind::PercentageFacilitated => self.percentage_fee_facilitated,
        }
    }
}

/// Normalises one raw fee value.
///
/// Blank input and the absent markers become `None`. A trailing `%` and
/// thousands separators are accepted. Negative or non-numeric values are
/// rejected.
pub fn parse_fee_field(raw: Option<&str>, kind: FeeKind) -> Result<Option<Decimal>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || FEE_ABSENT_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return Ok(None);
    }

    let cleaned: String = trimmed
        .trim_end_matches('%')
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| {
            ValidationError::InvalidInput(format!(
                "{}: '{}' is not a valid fee",
                kind.field_name(),
                raw
            ))
        })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::InvalidInput(format!(
            "{}: fee cannot be negative ({})",
            kind.field_name(),
            raw
        ))
        .into());
    }

    Ok(Some(value.normalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_blank_and_markers_are_absent() {
        for raw in ["", "   ", "waived", "N/A", "None", "-"] {
            assert_eq!(
                parse_fee_field(Some(raw), FeeKind::FixedDirect).unwrap(),
                None,
                "{raw:?}"
            );
        }
        assert_eq!(parse_fee_field(None, FeeKind::FixedDirect).unwrap(), None);
    }

    #[test]
    fn test_numbers_are_parsed() {
        assert_eq!(
            parse_fee_field(Some("1,250.50"), FeeKind::FixedDirect).unwrap(),
            Some(dec!(1250.5))
        );
        assert_eq!(
            parse_fee_field(Some(" 0.75% "), FeeKind::PercentageFacilitated).unwrap(),
            Some(dec!(0.75))
        );
        assert_eq!(
            parse_fee_field(Some("0"), FeeKind::FixedFacilitated).unwrap(),
            Some(dec!(0))
        );
        assert_eq!(
            parse_fee_field(Some("1e2"), FeeKind::FixedFacilitated).unwrap(),
            Some(dec!(100))
        );
    }

    #[test]
    fn test_negative_is_rejected() {
        let err = parse_fee_field(Some("-10"), FeeKind::FixedDirect).unwrap_err();
        assert!(err.to_string().contains("fixed_fee_direct"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_fee_field(Some("ten pounds"), FeeKind::FixedDirect).is_err());
    }

    #[test]
    fn test_from_raw() {
        let config =
            FeeConfiguration::from_raw("p1", Some("waived"), Some("100"), None, Utc::now())
                .unwrap();
        assert_eq!(config.fee(FeeKind::FixedDirect), None);
        assert_eq!(config.fee(FeeKind::FixedFacilitated), Some(dec!(100)));
        assert_eq!(config.fee(FeeKind::PercentageFacilitated), None);
    }
}
