//! Valuations module - valuation series, reader trait and the aggregator.

mod valuation_aggregator;
mod valuations_model;
mod valuations_traits;


pub use valuation_aggregator::{
    aggregate_valuations, fund_distribution, included_holdings, latest_valuations,
    provider_distribution,
};
pub use valuations_model::*;
pub use valuations_traits::ValuationReaderTrait;
