//! Builds report payloads from a snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::{
    AnalyticsComputer, AnalyticsKey, AnalyticsPayload, AnalyticsSnapshot, AnalyticsSnapshotSource,
    CompanySummary, DistributionReport, ReportKind, SnapshotScope,
};
use crate::entities::StatusFilter;
use crate::errors::{Error, Result};
use crate::fees::company_revenue;
use crate::performance::{IrrCalculator, IrrResult, IrrResultRepositoryTrait, SolverConfig};
use crate::valuations::{
    aggregate_valuations, fund_distribution, included_holdings, provider_distribution,
};

/// Pure report computation. Returns the payload and the IRR results it
/// produced, so callers can persist them.
pub fn build_report(
    key: &AnalyticsKey,
    snapshot: &AnalyticsSnapshot,
    solver: &SolverConfig,
) -> Result<(AnalyticsPayload, Vec<IrrResult>)> {
    let graph = &snapshot.graph;
    let as_of = key.as_of;

    match key.report {
        ReportKind::CompanyRevenue => {
            let totals = aggregate_valuations(
                graph,
                &snapshot.valuations,
                as_of,
                StatusFilter::ActiveAndDormant,
            );
            let revenue = company_revenue(graph, &snapshot.fee_configurations, &totals);
            Ok((AnalyticsPayload::CompanyRevenue(revenue), Vec::new()))
        }
        ReportKind::FundDistribution | ReportKind::ProviderDistribution => {
            let totals =
                aggregate_valuations(graph, &snapshot.valuations, as_of, StatusFilter::ActiveOnly);
            let report = |buckets| DistributionReport {
                as_of,
                total_value: totals.company_total,
                buckets,
            };
            let payload = if key.report == ReportKind::FundDistribution {
                AnalyticsPayload::FundDistribution(report(fund_distribution(graph, &totals)))
            } else {
                AnalyticsPayload::ProviderDistribution(report(provider_distribution(
                    graph, &totals,
                )))
            };
            Ok((payload, Vec::new()))
        }
        ReportKind::CompanySummary => {
            let totals =
                aggregate_valuations(graph, &snapshot.valuations, as_of, StatusFilter::ActiveOnly);
            let calculator =
                IrrCalculator::new(graph, &snapshot.activities, &totals, *solver);
            let company_irr = calculator.company_irr();
            let revenue = company_revenue(graph, &snapshot.fee_configurations, &totals);

            let summary = CompanySummary {
                as_of,
                total_fum: totals.company_total,
                client_count: totals.clients.values().filter(|c| c.included).count(),
                portfolio_count: totals
                    .clients
                    .values()
                    .filter(|c| c.included)
                    .map(|c| c.included_portfolios)
                    .sum(),
                holding_count: included_holdings(graph, &totals).len(),
                company_irr: company_irr.result.rate,
                irr_converged: company_irr.result.converged,
                total_annual_revenue: revenue.total_annual_revenue,
                missing_valuations: totals.missing_valuations.len(),
                excluded_entities: company_irr.excluded_entities,
            };
            Ok((
                AnalyticsPayload::CompanySummary(summary),
                vec![company_irr.result],
            ))
        }
        ReportKind::FundIrr | ReportKind::PortfolioIrr | ReportKind::ClientIrr => {
            let totals =
                aggregate_valuations(graph, &snapshot.valuations, as_of, StatusFilter::ActiveOnly);
            let calculator =
                IrrCalculator::new(graph, &snapshot.activities, &totals, *solver);
            let irr = match key.report {
                ReportKind::FundIrr => calculator.fund_irr(&key.scope)?,
                ReportKind::PortfolioIrr => calculator.portfolio_irr(&key.scope)?,
                _ => calculator.client_irr(&key.scope)?,
            };
            let result = irr.result.clone();
            Ok((AnalyticsPayload::Irr(irr), vec![result]))
        }
    }
}

/// Computes reports from storage snapshots.
pub struct AnalyticsEngine {
    source: Arc<dyn AnalyticsSnapshotSource>,
    irr_repository: Option<Arc<dyn IrrResultRepositoryTrait>>,
    solver: SolverConfig,
}

impl AnalyticsEngine {
    pub fn new(source: Arc<dyn AnalyticsSnapshotSource>, solver: SolverConfig) -> Self {
        Self {
            source,
            irr_repository: None,
            solver,
        }
    }

    /// Persists every IRR result the engine computes.
    pub fn with_irr_repository(mut self, repository: Arc<dyn IrrResultRepositoryTrait>) -> Self {
        self.irr_repository = Some(repository);
        self
    }

    async fn load_snapshot(&self, key: &AnalyticsKey) -> Result<AnalyticsSnapshot> {
        let source = Arc::clone(&self.source);
        let scope = SnapshotScope::for_key(key);
        let as_of = key.as_of;
        tokio::task::spawn_blocking(move || source.load_snapshot(&scope, as_of))
            .await
            .map_err(|e| Error::Unexpected(format!("Snapshot load task failed: {}", e)))?
    }
}

#[async_trait]
impl AnalyticsComputer for AnalyticsEngine {
    async fn compute(&self, key: &AnalyticsKey) -> Result<AnalyticsPayload> {
        let snapshot = self.load_snapshot(key).await?;
        debug!(
            "Computing {} from {} activities and {} valuations",
            key,
            snapshot.activities.len(),
            snapshot.valuations.len()
        );

        let (payload, results) = build_report(key, &snapshot, &self.solver)?;

        if let Some(repository) = &self.irr_repository {
            if !results.is_empty() {
                if let Err(e) = repository.record_results(&results).await {
                    warn!("Failed to persist IRR results for {}: {}", key, e);
                }
            }
        }

        Ok(payload)
    }
}
