//! Analytics report keys, payloads and cache-facing models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::COMPANY_SCOPE;
use crate::errors::AnalyticsError;
use crate::fees::CompanyRevenue;
use crate::performance::{EntityIrr, EntityLevel, ExcludedEntity};
use crate::utils::time_utils::{parse_quarter_label, today};
use crate::valuations::DistributionBucket;

/// Report names served by the query façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    CompanySummary,
    CompanyRevenue,
    FundDistribution,
    ProviderDistribution,
    FundIrr,
    PortfolioIrr,
    ClientIrr,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::CompanySummary,
        ReportKind::CompanyRevenue,
        ReportKind::FundDistribution,
        ReportKind::ProviderDistribution,
        ReportKind::FundIrr,
        ReportKind::PortfolioIrr,
        ReportKind::ClientIrr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::CompanySummary => "company_summary",
            ReportKind::CompanyRevenue => "company_revenue",
            ReportKind::FundDistribution => "fund_distribution",
            ReportKind::ProviderDistribution => "provider_distribution",
            ReportKind::FundIrr => "fund_irr",
            ReportKind::PortfolioIrr => "portfolio_irr",
            ReportKind::ClientIrr => "client_irr",
        }
    }

    /// Company-wide reports take a date scope; the others an entity id.
    pub fn is_company_wide(&self) -> bool {
        matches!(
            self,
            ReportKind::CompanySummary
                | ReportKind::CompanyRevenue
                | ReportKind::FundDistribution
                | ReportKind::ProviderDistribution
        )
    }

    /// Entity level of per-entity IRR reports.
    pub fn entity_level(&self) -> Option<EntityLevel> {
        match self {
            ReportKind::FundIrr => Some(EntityLevel::Fund),
            ReportKind::PortfolioIrr => Some(EntityLevel::Portfolio),
            ReportKind::ClientIrr => Some(EntityLevel::Client),
            _ => None,
        }
    }
}

impl FromStr for ReportKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AnalyticsError::UnknownReport(s.to_string()))
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: one report, one scope, one as-of date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsKey {
    pub report: ReportKind,
    /// `all`, a quarter label, a date, or an entity id.
    pub scope: String,
    pub as_of: NaiveDate,
}

impl AnalyticsKey {
    pub fn new(report: ReportKind, scope: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            report,
            scope: scope.into(),
            as_of,
        }
    }

    /// Company-wide key for `all` on the given date.
    pub fn company(report: ReportKind, as_of: NaiveDate) -> Self {
        Self::new(report, COMPANY_SCOPE, as_of)
    }

    /// Resolves a request into a key.
    ///
    /// For company-wide reports the scope may be `all`, a quarter label
    /// (`2025-Q1`, resolved to the quarter end) or a date. An explicit
    /// `as_of` always wins; otherwise the scope's date or today is used.
    pub fn resolve(
        report: ReportKind,
        scope: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Self, AnalyticsError> {
        let scope = scope.trim();
        if scope.is_empty() {
            return Err(AnalyticsError::InvalidScope {
                report: report.to_string(),
                scope: scope.to_string(),
            });
        }

        if !report.is_company_wide() {
            return Ok(Self::new(report, scope, as_of.unwrap_or_else(today)));
        }

        let scope_date = if scope == COMPANY_SCOPE {
            None
        } else if let Some(quarter_end) = parse_quarter_label(scope) {
            Some(quarter_end)
        } else if let Ok(date) = NaiveDate::parse_from_str(scope, "%Y-%m-%d") {
            Some(date)
        } else {
            return Err(AnalyticsError::InvalidScope {
                report: report.to_string(),
                scope: scope.to_string(),
            });
        };

        let as_of = as_of.or(scope_date).unwrap_or_else(today);
        Ok(Self::new(report, scope, as_of))
    }

    /// Stable string form, e.g. `company_summary:all@2025-03-31`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}@{}", self.report, self.scope, self.as_of)
    }
}

impl fmt::Display for AnalyticsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Headline figures of the whole book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub as_of: NaiveDate,
    pub total_fum: Decimal,
    pub client_count: usize,
    pub portfolio_count: usize,
    pub holding_count: usize,
    /// Company IRR; `None` when it did not converge.
    pub company_irr: Option<Decimal>,
    pub irr_converged: bool,
    pub total_annual_revenue: Decimal,
    /// Active holdings without a valuation on or before `as_of`.
    pub missing_valuations: usize,
    pub excluded_entities: Vec<ExcludedEntity>,
}

/// Value split of included holdings, by fund or by provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionReport {
    pub as_of: NaiveDate,
    pub total_value: Decimal,
    pub buckets: Vec<DistributionBucket>,
}

/// Computed body of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsPayload {
    CompanySummary(CompanySummary),
    CompanyRevenue(CompanyRevenue),
    FundDistribution(DistributionReport),
    ProviderDistribution(DistributionReport),
    Irr(EntityIrr),
}

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheEntryState {
    Fresh,
    Stale,
    Refreshing,
}

impl CacheEntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEntryState::Fresh => "FRESH",
            CacheEntryState::Stale => "STALE",
            CacheEntryState::Refreshing => "REFRESHING",
        }
    }
}

/// Response of `get_analytics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub report: ReportKind,
    pub scope: String,
    pub as_of: NaiveDate,
    pub computed_at: DateTime<Utc>,
    pub is_stale: bool,
    pub state: CacheEntryState,
    pub rate_or_totals: AnalyticsPayload,
}

/// Outcome counters of one `refresh_stale` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Stale entries left alone because nobody read them recently.
    pub skipped: usize,
    /// Idle entries dropped before refreshing.
    pub evicted: usize,
}

/// One recorded refresh outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub key: String,
    pub succeeded: bool,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of `get_health_check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsHealth {
    /// False when every refresh in the recent window failed.
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub window: usize,
    pub recent_refreshes: usize,
    pub recent_failures: usize,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure: Option<RefreshOutcome>,
    pub fresh_entries: usize,
    pub stale_entries: usize,
    pub refreshing_entries: usize,
    pub in_flight: usize,
}
