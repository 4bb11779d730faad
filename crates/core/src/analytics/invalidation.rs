//! Maps input changes to the cache entries they make stale.

use std::collections::BTreeSet;

use super::{AnalyticsKey, ReportKind};
use crate::entities::EntityGraph;
use crate::events::DomainEvent;

const VALUE_REPORTS: [ReportKind; 4] = [
    ReportKind::CompanySummary,
    ReportKind::CompanyRevenue,
    ReportKind::FundDistribution,
    ReportKind::ProviderDistribution,
];

const REVENUE_REPORTS: [ReportKind; 2] = [ReportKind::CompanySummary, ReportKind::CompanyRevenue];

/// Reports touched by one change, across every scope and as-of date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeImpact {
    /// Company-wide reports to mark stale.
    pub company_reports: BTreeSet<ReportKind>,
    /// Per-entity reports to mark stale, by entity id.
    pub entity_reports: BTreeSet<(ReportKind, String)>,
}

impl ChangeImpact {
    /// Resolves the targets of an event by walking the entity graph upward
    /// from the changed entities.
    pub fn from_event(event: &DomainEvent, graph: &EntityGraph) -> Self {
        let mut impact = Self::default();

        match event {
            DomainEvent::ActivitiesRecorded { holding_ids } => {
                for holding_id in holding_ids {
                    impact.add_holding_lineage(holding_id, graph);
                }
                impact.company_reports.insert(ReportKind::CompanySummary);
            }
            DomainEvent::ValuationsRecorded { holding_ids } => {
                for holding_id in holding_ids {
                    impact.add_holding_lineage(holding_id, graph);
                }
                impact.company_reports.extend(VALUE_REPORTS);
            }
            DomainEvent::FeeConfigurationChanged { .. } => {
                impact.company_reports.extend(REVENUE_REPORTS);
            }
            DomainEvent::EntityStatusChanged {
                client_ids,
                product_ids,
                holding_ids,
            } => {
                for client_id in client_ids {
                    impact
                        .entity_reports
                        .insert((ReportKind::ClientIrr, client_id.clone()));
                    for product in graph.products_of_client(client_id) {
                        impact.add_product_lineage(&product.id, graph);
                    }
                }
                for product_id in product_ids {
                    impact.add_product_lineage(product_id, graph);
                }
                for holding_id in holding_ids {
                    impact.add_holding_lineage(holding_id, graph);
                }
                impact.company_reports.extend(VALUE_REPORTS);
            }
        }

        impact
    }

    fn add_holding_lineage(&mut self, holding_id: &str, graph: &EntityGraph) {
        self.entity_reports
            .insert((ReportKind::FundIrr, holding_id.to_string()));
        if let Some(lineage) = graph.lineage(holding_id) {
            self.entity_reports
                .insert((ReportKind::PortfolioIrr, lineage.product_id.to_string()));
            self.entity_reports
                .insert((ReportKind::ClientIrr, lineage.client_id.to_string()));
        }
    }

    fn add_product_lineage(&mut self, product_id: &str, graph: &EntityGraph) {
        self.entity_reports
            .insert((ReportKind::PortfolioIrr, product_id.to_string()));
        if let Some(product) = graph.product(product_id) {
            self.entity_reports
                .insert((ReportKind::ClientIrr, product.client_id.clone()));
        }
        for holding_id in graph.holding_ids_of_product(product_id) {
            self.entity_reports.insert((ReportKind::FundIrr, holding_id));
        }
    }

    pub fn affects(&self, key: &AnalyticsKey) -> bool {
        if key.report.is_company_wide() {
            self.company_reports.contains(&key.report)
        } else {
            self.entity_reports
                .contains(&(key.report, key.scope.clone()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.company_reports.is_empty() && self.entity_reports.is_empty()
    }
}
