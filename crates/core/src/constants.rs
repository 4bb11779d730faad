/// Scope label for company-wide reports covering the latest data.
pub const COMPANY_SCOPE: &str = "all";

/// Entity id used for company-level IRR results.
pub const COMPANY_ENTITY_ID: &str = "company";

/// Distribution key for products without a provider.
pub const UNASSIGNED_PROVIDER: &str = "unassigned";

/// Decimal precision for display (weights, percentages)
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Decimal precision for fee averages
pub const AVERAGE_FEE_PRECISION: u32 = 4;

/// Decimal precision for solved rates
pub const RATE_DECIMAL_PRECISION: u32 = 8;

/// Default time-to-live of a cached report, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 15 * 60;

/// Default read recency an entry needs to be recomputed by the scheduler.
pub const DEFAULT_REFRESH_WINDOW_SECS: u64 = 2 * DEFAULT_CACHE_TTL_SECS;

/// Default idle time after which an entry is dropped.
pub const DEFAULT_EVICT_AFTER_SECS: u64 = 4 * DEFAULT_CACHE_TTL_SECS;

/// Default number of refresh outcomes kept for the health check.
pub const DEFAULT_HEALTH_WINDOW: usize = 20;
