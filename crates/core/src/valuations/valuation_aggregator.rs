//! Rolls latest holding valuations up into portfolio, client and company
//! totals, and derives fund and provider distributions from them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{ClientTotal, DistributionBucket, HoldingValue, PortfolioTotal, Valuation, ValuationTotals};
use crate::constants::{DISPLAY_DECIMAL_PRECISION, UNASSIGNED_PROVIDER};
use crate::entities::{EntityGraph, PortfolioFund, Product, StatusFilter};

/// Picks the current valuation per holding: the latest-dated one on or
/// before `as_of`. Same-date duplicates resolve to the latest recorded.
pub fn latest_valuations<'a, I>(valuations: I, as_of: NaiveDate) -> BTreeMap<String, HoldingValue>
where
    I: IntoIterator<Item = &'a Valuation>,
{
    let mut latest: BTreeMap<String, &Valuation> = BTreeMap::new();
    for valuation in valuations {
        if valuation.valuation_date > as_of {
            continue;
        }
        match latest.get(&valuation.holding_id) {
            Some(current)
                if (current.valuation_date, current.recorded_at)
                    >= (valuation.valuation_date, valuation.recorded_at) => {}
            _ => {
                latest.insert(valuation.holding_id.clone(), valuation);
            }
        }
    }

    latest
        .into_iter()
        .map(|(holding_id, v)| {
            (
                holding_id.clone(),
                HoldingValue {
                    holding_id,
                    value: v.value,
                    valuation_date: v.valuation_date,
                },
            )
        })
        .collect()
}

/// Aggregates valuations over the entity graph.
///
/// Every portfolio and client gets a total computed from its own included
/// children; only included portfolios count towards a client and only
/// included clients count towards the company.
pub fn aggregate_valuations(
    graph: &EntityGraph,
    valuations: &[Valuation],
    as_of: NaiveDate,
    filter: StatusFilter,
) -> ValuationTotals {
    let holdings = latest_valuations(valuations, as_of);

    let mut portfolios = BTreeMap::new();
    for product in graph.products() {
        let mut total = Decimal::ZERO;
        let mut valued_holdings = 0;
        let mut missing_valuations = Vec::new();

        for holding in graph.holdings_of_product(&product.id) {
            if !filter.includes(holding.status) {
                continue;
            }
            match holdings.get(&holding.id) {
                Some(value) => {
                    total += value.value;
                    valued_holdings += 1;
                }
                None => missing_valuations.push(holding.id.clone()),
            }
        }

        portfolios.insert(
            product.id.clone(),
            PortfolioTotal {
                product_id: product.id.clone(),
                client_id: product.client_id.clone(),
                total,
                valued_holdings,
                missing_valuations,
                included: filter.includes(product.status),
            },
        );
    }

    let mut clients = BTreeMap::new();
    let mut company_total = Decimal::ZERO;
    let mut missing_valuations = Vec::new();
    for client in graph.clients() {
        let client_included = filter.includes(client.status);
        let mut total = Decimal::ZERO;
        let mut included_portfolios = 0;

        for product in graph.products_of_client(&client.id) {
            let Some(portfolio) = portfolios.get(&product.id) else {
                continue;
            };
            if !portfolio.included {
                continue;
            }
            total += portfolio.total;
            included_portfolios += 1;
            if client_included {
                missing_valuations.extend(portfolio.missing_valuations.iter().cloned());
            }
        }

        if client_included {
            company_total += total;
        }
        clients.insert(
            client.id.clone(),
            ClientTotal {
                client_id: client.id.clone(),
                total,
                included_portfolios,
                included: client_included,
            },
        );
    }

    if !missing_valuations.is_empty() {
        log::debug!(
            "{} included holdings have no valuation on or before {}",
            missing_valuations.len(),
            as_of
        );
    }

    ValuationTotals {
        as_of,
        filter,
        holdings,
        portfolios,
        clients,
        company_total,
        missing_valuations,
    }
}

/// Holdings that contribute to the company total, with their current value.
pub fn included_holdings<'g>(
    graph: &'g EntityGraph,
    totals: &ValuationTotals,
) -> Vec<(&'g PortfolioFund, &'g Product, Decimal)> {
    let mut result = Vec::new();
    for client in graph.clients() {
        if !totals.client_total(&client.id).is_some_and(|c| c.included) {
            continue;
        }
        for product in graph.products_of_client(&client.id) {
            if !totals.portfolio_total(&product.id).is_some_and(|p| p.included) {
                continue;
            }
            for holding in graph.holdings_of_product(&product.id) {
                if !totals.filter.includes(holding.status) {
                    continue;
                }
                if let Some(value) = totals.holding_value(&holding.id) {
                    result.push((holding, product, value));
                }
            }
        }
    }
    result
}

/// Company FUM split by catalogue fund.
pub fn fund_distribution(graph: &EntityGraph, totals: &ValuationTotals) -> Vec<DistributionBucket> {
    let entries = included_holdings(graph, totals)
        .into_iter()
        .map(|(holding, _, value)| (holding.fund_id.clone(), holding.fund_name.clone(), value));
    build_buckets(entries)
}

/// Company FUM split by product provider.
pub fn provider_distribution(
    graph: &EntityGraph,
    totals: &ValuationTotals,
) -> Vec<DistributionBucket> {
    let entries = included_holdings(graph, totals).into_iter().map(|(_, product, value)| {
        let provider = product
            .provider_id
            .clone()
            .unwrap_or_else(|| UNASSIGNED_PROVIDER.to_string());
        (provider.clone(), provider, value)
    });
    build_buckets(entries)
}

fn build_buckets<I>(entries: I) -> Vec<DistributionBucket>
where
    I: IntoIterator<Item = (String, String, Decimal)>,
{
    let mut grouped: BTreeMap<String, DistributionBucket> = BTreeMap::new();
    for (key, label, value) in entries {
        let bucket = grouped.entry(key.clone()).or_insert_with(|| DistributionBucket {
            key,
            label,
            value: Decimal::ZERO,
            holding_count: 0,
            weight: Decimal::ZERO,
        });
        bucket.value += value;
        bucket.holding_count += 1;
    }

    let total: Decimal = grouped.values().map(|b| b.value).sum();
    let mut buckets: Vec<DistributionBucket> = grouped.into_values().collect();
    if !total.is_zero() {
        for bucket in &mut buckets {
            bucket.weight = (bucket.value / total * Decimal::ONE_HUNDRED)
                .round_dp(DISPLAY_DECIMAL_PRECISION);
        }
    }
    buckets.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    buckets
}
