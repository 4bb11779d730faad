//! Fees module - fee configuration, parser and the revenue aggregator.

mod fees_model;
mod fees_traits;
mod revenue_aggregator;


pub use fees_model::{parse_fee_field, FeeConfiguration, FeeKind, FEE_ABSENT_MARKERS};
pub use fees_traits::FeeConfigurationReaderTrait;
pub use revenue_aggregator::{
    company_revenue, product_revenue, product_valuation, CompanyRevenue, ProductRevenue,
    RevenueFlag,
};
