//! Valuation domain models.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::StatusFilter;

/// Point-in-time value of one holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub holding_id: String,
    pub valuation_date: NaiveDate,
    pub value: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Current value of a holding as of some date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValue {
    pub holding_id: String,
    pub value: Decimal,
    pub valuation_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotal {
    pub product_id: String,
    pub client_id: String,
    pub total: Decimal,
    /// Holdings that passed the status filter and had a valuation.
    pub valued_holdings: usize,
    /// Holdings that passed the status filter but have no valuation.
    pub missing_valuations: Vec<String>,
    /// Whether the portfolio itself passed the status filter.
    pub included: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTotal {
    pub client_id: String,
    pub total: Decimal,
    pub included_portfolios: usize,
    pub included: bool,
}

/// Result of rolling latest valuations up the entity graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationTotals {
    pub as_of: NaiveDate,
    pub filter: StatusFilter,
    /// Latest valuation per holding regardless of status.
    pub holdings: BTreeMap<String, HoldingValue>,
    pub portfolios: BTreeMap<String, PortfolioTotal>,
    pub clients: BTreeMap<String, ClientTotal>,
    pub company_total: Decimal,
    /// Included holdings without any valuation on or before `as_of`.
    pub missing_valuations: Vec<String>,
}

impl ValuationTotals {
    pub fn holding_value(&self, holding_id: &str) -> Option<Decimal> {
        self.holdings.get(holding_id).map(|h| h.value)
    }

    pub fn portfolio_total(&self, product_id: &str) -> Option<&PortfolioTotal> {
        self.portfolios.get(product_id)
    }

    pub fn client_total(&self, client_id: &str) -> Option<&ClientTotal> {
        self.clients.get(client_id)
    }
}

/// One slice of a fund or provider distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub key: String,
    pub label: String,
    pub value: Decimal,
    pub holding_count: usize,
    /// Share of the distribution total in percent, two decimal places.
    pub weight: Decimal,
}
