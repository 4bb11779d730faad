/// Activity types
///
/// Each constant is the persisted label of one ledger event category.
/// Amounts are stored as non-negative magnitudes; the type decides the sign.

/// Lump-sum money paid into a holding by the client. Increases capital.
pub const ACTIVITY_TYPE_CONTRIBUTION: &str = "CONTRIBUTION";

/// Scheduled (monthly, quarterly) contribution. Increases capital.
pub const ACTIVITY_TYPE_REGULAR_CONTRIBUTION: &str = "REGULAR_CONTRIBUTION";

/// Government tax relief credited on top of a contribution. Increases capital.
pub const ACTIVITY_TYPE_TAX_UPLIFT: &str = "TAX_UPLIFT";

/// Money paid out of a holding to the client. Decreases capital.
pub const ACTIVITY_TYPE_WITHDRAWAL: &str = "WITHDRAWAL";

/// Scheduled withdrawal (income drawdown). Decreases capital.
pub const ACTIVITY_TYPE_REGULAR_WITHDRAWAL: &str = "REGULAR_WITHDRAWAL";

/// Money moved into this holding from another holding of the same portfolio.
pub const ACTIVITY_TYPE_SWITCH_IN: &str = "SWITCH_IN";

/// Money moved out of this holding into another holding of the same portfolio.
pub const ACTIVITY_TYPE_SWITCH_OUT: &str = "SWITCH_OUT";

/// Switch recorded before switches were split by direction. The amount is
/// signed: positive moves money into the holding, negative moves it out.
pub const ACTIVITY_TYPE_LEGACY_SWITCH: &str = "SWITCH";

/// Platform or adviser fee deducted from the holding. Decreases capital.
pub const ACTIVITY_TYPE_FEE: &str = "FEE";

/// Switch activity types (must carry a related fund)
pub const SWITCH_ACTIVITY_TYPES: [&str; 3] = [
    ACTIVITY_TYPE_SWITCH_IN,
    ACTIVITY_TYPE_SWITCH_OUT,
    ACTIVITY_TYPE_LEGACY_SWITCH,
];

/// Labels written by older data entry screens, mapped to current types.
pub const LEGACY_ACTIVITY_LABELS: [(&str, &str); 4] = [
    ("INVESTMENT", ACTIVITY_TYPE_CONTRIBUTION),
    ("REGULAR_INVESTMENT", ACTIVITY_TYPE_REGULAR_CONTRIBUTION),
    ("GOVERNMENT_UPLIFT", ACTIVITY_TYPE_TAX_UPLIFT),
    ("PRODUCT_SWITCH", ACTIVITY_TYPE_LEGACY_SWITCH),
];

/// Checks if an activity label is a switch between holdings.
pub fn is_switch_activity(activity_type: &str) -> bool {
    SWITCH_ACTIVITY_TYPES.contains(&activity_type)
}
