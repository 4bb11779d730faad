//! IRR computation for funds, portfolios, clients and the company.
//!
//! Flows are classified per portfolio. A portfolio whose flows cannot be
//! classified, or whose included holdings lack a valuation, is excluded from
//! client and company figures and listed in `excluded_entities`; it never
//! turns into a zero flow.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::flow_classifier::{external_cash_flows, FlowScope, FlowWindow};
use super::irr_solver::{solve_irr, to_f64_flows, SolverConfig};
use super::{CashFlow, EntityIrr, EntityLevel, ExcludedEntity, IrrMethod, IrrResult};
use crate::activities::ActivityEvent;
use crate::constants::{COMPANY_ENTITY_ID, RATE_DECIMAL_PRECISION};
use crate::entities::{EntityGraph, EntityStatus};
use crate::errors::{AnalyticsError, NonConvergenceError, Result, StaleInputError};
use crate::valuations::ValuationTotals;

/// Flows and current value of one portfolio.
#[derive(Debug, Clone)]
struct PortfolioInputs {
    flows: Vec<CashFlow>,
    terminal_value: Decimal,
    included: bool,
}

/// Computes IRR results over one consistent set of inputs.
pub struct IrrCalculator<'a> {
    graph: &'a EntityGraph,
    totals: &'a ValuationTotals,
    events_by_holding: HashMap<&'a str, Vec<&'a ActivityEvent>>,
    config: SolverConfig,
    computed_at: DateTime<Utc>,
}

impl<'a> IrrCalculator<'a> {
    pub fn new(
        graph: &'a EntityGraph,
        activities: &'a [ActivityEvent],
        totals: &'a ValuationTotals,
        config: SolverConfig,
    ) -> Self {
        let mut events_by_holding: HashMap<&'a str, Vec<&'a ActivityEvent>> = HashMap::new();
        for event in activities {
            events_by_holding
                .entry(event.holding_id.as_str())
                .or_default()
                .push(event);
        }

        Self {
            graph,
            totals,
            events_by_holding,
            config,
            computed_at: Utc::now(),
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.totals.as_of
    }

    fn window(&self) -> FlowWindow {
        FlowWindow::since_inception(self.as_of())
    }

    fn events_of(&self, holding_id: &str) -> impl Iterator<Item = &'a ActivityEvent> + '_ {
        self.events_by_holding
            .get(holding_id)
            .into_iter()
            .flat_map(|events| events.iter().copied())
    }

    /// IRR of a single holding. Switches count as flows.
    pub fn fund_irr(&self, holding_id: &str) -> Result<EntityIrr> {
        let holding = self.graph.holding(holding_id).ok_or_else(|| {
            AnalyticsError::UnknownEntity {
                level: EntityLevel::Fund.to_string(),
                id: holding_id.to_string(),
            }
        })?;

        let flows = external_cash_flows(
            self.events_of(holding_id),
            FlowScope::Fund,
            self.graph,
            self.window(),
        )?;

        let terminal_value = match self.totals.holding_value(holding_id) {
            Some(value) => value,
            None if holding.status == EntityStatus::Active => {
                return Err(StaleInputError::MissingValuation {
                    holding_id: holding_id.to_string(),
                    as_of: self.as_of(),
                }
                .into());
            }
            None => Decimal::ZERO,
        };

        Ok(self.solve(holding_id, EntityLevel::Fund, flows, terminal_value, Vec::new()))
    }

    fn portfolio_inputs(&self, product_id: &str) -> Result<PortfolioInputs> {
        let portfolio = self.totals.portfolio_total(product_id).ok_or_else(|| {
            AnalyticsError::UnknownEntity {
                level: EntityLevel::Portfolio.to_string(),
                id: product_id.to_string(),
            }
        })?;

        let holding_ids = self.graph.holding_ids_of_product(product_id);
        let events = holding_ids.iter().flat_map(|id| self.events_of(id));
        let flows = external_cash_flows(events, FlowScope::Portfolio, self.graph, self.window())?;

        if portfolio.included {
            if let Some(missing) = portfolio.missing_valuations.first() {
                return Err(StaleInputError::MissingValuation {
                    holding_id: missing.clone(),
                    as_of: self.as_of(),
                }
                .into());
            }
        }

        Ok(PortfolioInputs {
            flows,
            terminal_value: portfolio.total,
            included: portfolio.included,
        })
    }

    /// IRR of a portfolio. Switches between its holdings are internal.
    pub fn portfolio_irr(&self, product_id: &str) -> Result<EntityIrr> {
        let inputs = self.portfolio_inputs(product_id)?;
        Ok(self.solve(
            product_id,
            EntityLevel::Portfolio,
            inputs.flows,
            inputs.terminal_value,
            Vec::new(),
        ))
    }

    /// Collects the flows and value of a set of portfolios, excluding the
    /// ones whose inputs are unusable.
    fn combine_portfolios<'p, I>(&self, product_ids: I, counts_value: bool) -> Combined
    where
        I: IntoIterator<Item = &'p str>,
    {
        let mut combined = Combined::default();
        for product_id in product_ids {
            match self.portfolio_inputs(product_id) {
                Ok(inputs) => {
                    combined.flows.extend(inputs.flows);
                    if counts_value && inputs.included {
                        combined.terminal_value += inputs.terminal_value;
                    }
                }
                Err(err) => {
                    log::warn!("Excluding portfolio {} from IRR: {}", product_id, err);
                    combined.excluded.push(ExcludedEntity {
                        entity_id: product_id.to_string(),
                        entity_level: EntityLevel::Portfolio,
                        reason: err.to_string(),
                    });
                }
            }
        }
        combined
    }

    /// IRR of a client across all of its portfolios.
    pub fn client_irr(&self, client_id: &str) -> Result<EntityIrr> {
        let client = self.graph.client(client_id).ok_or_else(|| AnalyticsError::UnknownEntity {
            level: EntityLevel::Client.to_string(),
            id: client_id.to_string(),
        })?;

        let products = self.graph.products_of_client(&client.id);
        let combined = self.combine_portfolios(products.iter().map(|p| p.id.as_str()), true);

        Ok(self.solve(
            client_id,
            EntityLevel::Client,
            merge_flows(combined.flows),
            combined.terminal_value,
            combined.excluded,
        ))
    }

    /// IRR of the whole book. Only included clients contribute value.
    pub fn company_irr(&self) -> EntityIrr {
        let mut flows = Vec::new();
        let mut terminal_value = Decimal::ZERO;
        let mut excluded = Vec::new();

        for client in self.graph.clients() {
            let counts_value = self
                .totals
                .client_total(&client.id)
                .is_some_and(|c| c.included);
            let products = self.graph.products_of_client(&client.id);
            let combined =
                self.combine_portfolios(products.iter().map(|p| p.id.as_str()), counts_value);
            flows.extend(combined.flows);
            terminal_value += combined.terminal_value;
            excluded.extend(combined.excluded);
        }

        self.solve(
            COMPANY_ENTITY_ID,
            EntityLevel::Company,
            merge_flows(flows),
            terminal_value,
            excluded,
        )
    }

    /// Solves from the investor's point of view: capital paid in is an
    /// outflow and the current value is the final inflow at the as-of date.
    fn solve(
        &self,
        entity_id: &str,
        entity_level: EntityLevel,
        flows: Vec<CashFlow>,
        terminal_value: Decimal,
        excluded_entities: Vec<ExcludedEntity>,
    ) -> EntityIrr {
        let mut investor_flows: Vec<(NaiveDate, f64)> = to_f64_flows(&flows)
            .into_iter()
            .map(|(date, amount)| (date, -amount))
            .collect();
        if !terminal_value.is_zero() {
            investor_flows.extend(to_f64_flows(&[CashFlow {
                date: self.as_of(),
                amount: terminal_value,
            }]));
        }

        let cash_flow_count = investor_flows.len() as u32;
        let (rate, iterations, method, failure_reason) =
            match solve_irr(&investor_flows, &self.config) {
                Ok(solution) => match Decimal::from_f64(solution.rate) {
                    Some(rate) => (
                        Some(rate.round_dp(RATE_DECIMAL_PRECISION)),
                        solution.iterations,
                        solution.method,
                        None,
                    ),
                    None => (
                        None,
                        solution.iterations,
                        IrrMethod::Unsolved,
                        Some(format!("Rate {} is not representable", solution.rate)),
                    ),
                },
                Err(err) => {
                    log::debug!("IRR for {} {} not solved: {}", entity_level, entity_id, err);
                    let iterations = match &err {
                        NonConvergenceError::IterationLimit { iterations, .. } => *iterations,
                        _ => 0,
                    };
                    (None, iterations, IrrMethod::Unsolved, Some(err.to_string()))
                }
            };

        let net_contributions = flows.iter().map(|f| f.amount).sum();

        EntityIrr {
            result: IrrResult {
                id: Uuid::new_v4().to_string(),
                entity_id: entity_id.to_string(),
                entity_level,
                converged: rate.is_some(),
                rate,
                as_of_date: self.as_of(),
                cash_flow_count,
                iterations,
                method,
                failure_reason,
                computed_at: self.computed_at,
            },
            terminal_value,
            net_contributions,
            cash_flows: flows,
            excluded_entities,
        }
    }
}

#[derive(Debug, Default)]
struct Combined {
    flows: Vec<CashFlow>,
    terminal_value: Decimal,
    excluded: Vec<ExcludedEntity>,
}

/// Nets flows of several entities per date, dropping dates that cancel out.
pub fn merge_flows(flows: Vec<CashFlow>) -> Vec<CashFlow> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for flow in flows {
        *by_date.entry(flow.date).or_insert(Decimal::ZERO) += flow.amount;
    }
    by_date
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(date, amount)| CashFlow { date, amount })
        .collect()
}
