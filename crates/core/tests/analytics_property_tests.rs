//! Property-based integration tests for the analytics engine.
//!
//! These tests verify that universal properties of the IRR solver and the
//! aggregators hold across generated inputs, using `proptest`.

use advisory_core::entities::{Client, EntityGraph, EntityStatus, PortfolioFund, Product, StatusFilter};
use advisory_core::errors::NonConvergenceError;
use advisory_core::performance::{npv, solve_irr, SolverConfig};
use advisory_core::valuations::{aggregate_valuations, Valuation};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

// =============================================================================
// Generators
// =============================================================================

fn arb_status() -> impl Strategy<Value = EntityStatus> {
    prop_oneof![
        Just(EntityStatus::Active),
        Just(EntityStatus::Inactive),
        Just(EntityStatus::Dormant),
    ]
}

/// Outflows (investments) on distinct days followed by one terminal inflow.
fn arb_investment_series() -> impl Strategy<Value = Vec<(NaiveDate, f64)>> {
    (
        prop::collection::vec((0i64..1000, 100.0f64..50_000.0), 1..8),
        1.05f64..2.5,
    )
        .prop_map(|(investments, multiple)| {
            let mut flows: Vec<(NaiveDate, f64)> = investments
                .iter()
                .map(|(day, amount)| (start() + Duration::days(*day), -amount))
                .collect();
            let invested: f64 = investments.iter().map(|(_, amount)| amount).sum();
            flows.push((start() + Duration::days(1600), invested * multiple));
            flows
        })
}

/// A small entity graph with random statuses and random valuations.
fn arb_book() -> impl Strategy<Value = (EntityGraph, Vec<Valuation>)> {
    (
        prop::collection::vec(arb_status(), 1..4),
        prop::collection::vec((0usize..4, arb_status()), 1..6),
        prop::collection::vec((0usize..6, arb_status(), proptest::option::of(0u32..100_000)), 1..12),
    )
        .prop_map(|(client_statuses, products, holdings)| {
            let clients: Vec<Client> = client_statuses
                .iter()
                .enumerate()
                .map(|(i, status)| Client {
                    id: format!("c{}", i),
                    name: format!("Client {}", i),
                    status: *status,
                })
                .collect();
            let products: Vec<Product> = products
                .iter()
                .enumerate()
                .map(|(i, (client, status))| Product {
                    id: format!("p{}", i),
                    client_id: format!("c{}", client % clients.len()),
                    product_name: format!("Product {}", i),
                    provider_id: Some(format!("prov{}", i % 2)),
                    status: *status,
                })
                .collect();

            let mut valuations = Vec::new();
            let holdings: Vec<PortfolioFund> = holdings
                .iter()
                .enumerate()
                .map(|(i, (product, status, value))| {
                    let id = format!("h{}", i);
                    if let Some(value) = value {
                        valuations.push(Valuation {
                            holding_id: id.clone(),
                            valuation_date: start(),
                            value: Decimal::from(*value),
                            recorded_at: Utc.from_utc_datetime(&start().and_hms_opt(18, 0, 0).unwrap()),
                        });
                    }
                    PortfolioFund {
                        id,
                        product_id: format!("p{}", product % products.len()),
                        fund_id: format!("f{}", i % 3),
                        fund_name: format!("Fund {}", i % 3),
                        status: *status,
                    }
                })
                .collect();

            (EntityGraph::new(clients, products, holdings), valuations)
        })
}

// =============================================================================
// IRR solver properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A single investment grown at rate r solves back to r.
    #[test]
    fn prop_single_investment_recovers_rate(
        amount in 100.0f64..1_000_000.0,
        rate in -0.5f64..1.0,
        days in 30i64..3650,
    ) {
        let years = days as f64 / 365.0;
        let flows = vec![
            (start(), -amount),
            (start() + Duration::days(days), amount * (1.0 + rate).powf(years)),
        ];

        let solution = solve_irr(&flows, &SolverConfig::default()).unwrap();

        prop_assert!((solution.rate - rate).abs() < 1e-3,
            "solved {} expected {}", solution.rate, rate);
    }

    /// NPV at the solved rate is zero within the relative tolerance.
    #[test]
    fn prop_npv_vanishes_at_solution(flows in arb_investment_series()) {
        let scale: f64 = flows.iter().map(|(_, amount)| amount.abs()).sum();

        let solution = solve_irr(&flows, &SolverConfig::default()).unwrap();

        prop_assert!(solution.rate > 0.0);
        prop_assert!(npv(solution.rate, &flows).abs() <= 1e-5 * scale);
    }

    /// Flows that never change sign have no rate.
    #[test]
    fn prop_same_sign_flows_never_converge(
        amounts in prop::collection::vec(1.0f64..10_000.0, 2..10),
        negative in any::<bool>(),
    ) {
        let flows: Vec<(NaiveDate, f64)> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                let amount = if negative { -amount } else { *amount };
                (start() + Duration::days(i as i64 * 90), amount)
            })
            .collect();

        let result = solve_irr(&flows, &SolverConfig::default());

        prop_assert_eq!(result.unwrap_err(), NonConvergenceError::NoSignChange);
    }
}

// =============================================================================
// Aggregator properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Company total equals the sum of included client totals, and each
    /// client total equals the sum of its included portfolio totals.
    #[test]
    fn prop_totals_roll_up_consistently(
        (graph, valuations) in arb_book(),
        include_dormant in any::<bool>(),
    ) {
        let filter = if include_dormant {
            StatusFilter::ActiveAndDormant
        } else {
            StatusFilter::ActiveOnly
        };
        let totals = aggregate_valuations(&graph, &valuations, start(), filter);

        let clients_sum: Decimal = totals
            .clients
            .values()
            .filter(|c| c.included)
            .map(|c| c.total)
            .sum();
        prop_assert_eq!(totals.company_total, clients_sum);

        for client in totals.clients.values() {
            let portfolios_sum: Decimal = totals
                .portfolios
                .values()
                .filter(|p| p.client_id == client.client_id && p.included)
                .map(|p| p.total)
                .sum();
            prop_assert_eq!(client.total, portfolios_sum);
        }

        for holding_id in &totals.missing_valuations {
            prop_assert!(totals.holding_value(holding_id).is_none());
        }
    }
}
