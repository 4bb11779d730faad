//! Combines fee configuration with aggregated valuations into per-product
//! and company-wide revenue.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{FeeConfiguration, FeeKind};
use crate::constants::AVERAGE_FEE_PRECISION;
use crate::entities::{EntityGraph, Product};
use crate::valuations::{PortfolioTotal, ValuationTotals};

/// Input gaps behind a revenue figure. Affected components are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueFlag {
    MissingFeeConfiguration,
    MissingValuation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRevenue {
    pub product_id: String,
    pub client_id: String,
    pub provider_id: Option<String>,
    pub valuation: Option<Decimal>,
    pub fixed_fee_direct: Option<Decimal>,
    pub fixed_fee_facilitated: Option<Decimal>,
    pub percentage_fee_facilitated: Option<Decimal>,
    pub fixed_direct_revenue: Decimal,
    pub fixed_facilitated_revenue: Decimal,
    pub percentage_facilitated_revenue: Decimal,
    pub total_annual_revenue: Decimal,
    pub flags: Vec<RevenueFlag>,
}

impl ProductRevenue {
    pub fn is_stale_input(&self) -> bool {
        !self.flags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRevenue {
    pub product_count: usize,
    pub total_valuation: Decimal,
    pub total_fixed_direct_revenue: Decimal,
    pub total_fixed_facilitated_revenue: Decimal,
    pub total_percentage_facilitated_revenue: Decimal,
    pub total_annual_revenue: Decimal,
    /// Averages only cover products where the fee is present and non-zero.
    pub avg_fixed_fee_direct: Option<Decimal>,
    pub avg_fixed_fee_facilitated: Option<Decimal>,
    pub avg_percentage_fee_facilitated: Option<Decimal>,
    /// Annual revenue as a percentage of valuation.
    pub revenue_to_valuation_pct: Option<Decimal>,
    pub stale_input_count: usize,
    pub products: Vec<ProductRevenue>,
}

/// Current valuation of a product for revenue purposes.
///
/// `None` when the product has holdings but none of them is valued.
pub fn product_valuation(portfolio: Option<&PortfolioTotal>) -> (Option<Decimal>, bool) {
    match portfolio {
        None => (None, true),
        Some(p) if p.valued_holdings == 0 && !p.missing_valuations.is_empty() => (None, true),
        Some(p) => (Some(p.total), !p.missing_valuations.is_empty()),
    }
}

/// Revenue of one product. Absent fees count as 0.
pub fn product_revenue(
    product: &Product,
    fee: Option<&FeeConfiguration>,
    valuation: Option<Decimal>,
    valuation_incomplete: bool,
) -> ProductRevenue {
    let mut flags = Vec::new();
    if fee.is_none() {
        flags.push(RevenueFlag::MissingFeeConfiguration);
    }
    if valuation.is_none() || valuation_incomplete {
        flags.push(RevenueFlag::MissingValuation);
    }

    let fixed_fee_direct = fee.and_then(|f| f.fee(FeeKind::FixedDirect));
    let fixed_fee_facilitated = fee.and_then(|f| f.fee(FeeKind::FixedFacilitated));
    let percentage_fee_facilitated = fee.and_then(|f| f.fee(FeeKind::PercentageFacilitated));

    let fixed_direct_revenue = fixed_fee_direct.unwrap_or(Decimal::ZERO);
    let fixed_facilitated_revenue = fixed_fee_facilitated.unwrap_or(Decimal::ZERO);
    let percentage_facilitated_revenue = match (valuation, percentage_fee_facilitated) {
        (Some(value), Some(pct)) => value * pct / Decimal::ONE_HUNDRED,
        _ => Decimal::ZERO,
    };

    ProductRevenue {
        product_id: product.id.clone(),
        client_id: product.client_id.clone(),
        provider_id: product.provider_id.clone(),
        valuation,
        fixed_fee_direct,
        fixed_fee_facilitated,
        percentage_fee_facilitated,
        fixed_direct_revenue,
        fixed_facilitated_revenue,
        percentage_facilitated_revenue,
        total_annual_revenue: fixed_direct_revenue
            + fixed_facilitated_revenue
            + percentage_facilitated_revenue,
        flags,
    }
}

/// Revenue across every product included by the totals' status filter.
pub fn company_revenue(
    graph: &EntityGraph,
    fees: &HashMap<String, FeeConfiguration>,
    totals: &ValuationTotals,
) -> CompanyRevenue {
    let mut products = Vec::new();
    for client in graph.clients() {
        if !totals.client_total(&client.id).is_some_and(|c| c.included) {
            continue;
        }
        for product in graph.products_of_client(&client.id) {
            let portfolio = totals.portfolio_total(&product.id);
            if !portfolio.is_some_and(|p| p.included) {
                continue;
            }
            let (valuation, incomplete) = product_valuation(portfolio);
            products.push(product_revenue(
                product,
                fees.get(&product.id),
                valuation,
                incomplete,
            ));
        }
    }

    let sum = |f: fn(&ProductRevenue) -> Decimal| products.iter().map(f).sum::<Decimal>();
    let total_valuation = products
        .iter()
        .filter_map(|p| p.valuation)
        .sum::<Decimal>();
    let total_annual_revenue = sum(|p| p.total_annual_revenue);

    let revenue_to_valuation_pct = if total_valuation.is_zero() {
        None
    } else {
        Some(
            (total_annual_revenue / total_valuation * Decimal::ONE_HUNDRED)
                .round_dp(AVERAGE_FEE_PRECISION),
        )
    };

    let stale_input_count = products.iter().filter(|p| p.is_stale_input()).count();
    if stale_input_count > 0 {
        log::warn!(
            "{} of {} products have incomplete revenue inputs",
            stale_input_count,
            products.len()
        );
    }

    CompanyRevenue {
        product_count: products.len(),
        total_valuation,
        total_fixed_direct_revenue: sum(|p| p.fixed_direct_revenue),
        total_fixed_facilitated_revenue: sum(|p| p.fixed_facilitated_revenue),
        total_percentage_facilitated_revenue: sum(|p| p.percentage_facilitated_revenue),
        total_annual_revenue,
        avg_fixed_fee_direct: average_fee(&products, |p| p.fixed_fee_direct),
        avg_fixed_fee_facilitated: average_fee(&products, |p| p.fixed_fee_facilitated),
        avg_percentage_fee_facilitated: average_fee(&products, |p| p.percentage_fee_facilitated),
        revenue_to_valuation_pct,
        stale_input_count,
        products,
    }
}

/// Mean over products where the fee is present and non-zero.
fn average_fee(
    products: &[ProductRevenue],
    fee: fn(&ProductRevenue) -> Option<Decimal>,
) -> Option<Decimal> {
    let present: Vec<Decimal> = products
        .iter()
        .filter_map(fee)
        .filter(|value| !value.is_zero())
        .collect();
    if present.is_empty() {
        return None;
    }
    let total: Decimal = present.iter().sum();
    Some((total / Decimal::from(present.len())).round_dp(AVERAGE_FEE_PRECISION))
}
