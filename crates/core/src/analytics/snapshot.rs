//! Consistent input set for one analytics computation.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::{AnalyticsKey, ReportKind};
use crate::activities::ActivityEvent;
use crate::entities::EntityGraph;
use crate::fees::FeeConfiguration;
use crate::valuations::Valuation;

/// Which part of the book a snapshot has to cover.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SnapshotScope {
    Company,
    Client(String),
    Portfolio(String),
    Holding(String),
}

impl SnapshotScope {
    pub fn for_key(key: &AnalyticsKey) -> Self {
        match key.report {
            ReportKind::FundIrr => SnapshotScope::Holding(key.scope.clone()),
            ReportKind::PortfolioIrr => SnapshotScope::Portfolio(key.scope.clone()),
            ReportKind::ClientIrr => SnapshotScope::Client(key.scope.clone()),
            _ => SnapshotScope::Company,
        }
    }

    /// Holdings whose activities and valuations the scope needs.
    pub fn holding_ids(&self, graph: &EntityGraph) -> Vec<String> {
        match self {
            SnapshotScope::Company => graph.holdings().map(|h| h.id.clone()).collect(),
            SnapshotScope::Client(client_id) => graph
                .products_of_client(client_id)
                .into_iter()
                .flat_map(|p| graph.holding_ids_of_product(&p.id))
                .collect(),
            SnapshotScope::Portfolio(product_id) => graph.holding_ids_of_product(product_id),
            SnapshotScope::Holding(holding_id) => graph
                .holding(holding_id)
                .map(|h| vec![h.id.clone()])
                .unwrap_or_default(),
        }
    }

    /// Only company-wide reports read fee configuration.
    pub fn needs_fees(&self) -> bool {
        matches!(self, SnapshotScope::Company)
    }
}

/// Inputs read in a single transaction.
///
/// The entity graph is always complete so switch counterparties can be
/// checked; activities, valuations and fees cover the requested scope only.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSnapshot {
    pub as_of: NaiveDate,
    pub graph: EntityGraph,
    pub activities: Vec<ActivityEvent>,
    pub valuations: Vec<Valuation>,
    pub fee_configurations: HashMap<String, FeeConfiguration>,
    pub loaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityStatus;
    use crate::test_fixtures::*;

    #[test]
    fn test_scope_holdings() {
        let graph = EntityGraph::new(
            vec![client("c1", EntityStatus::Active)],
            vec![
                product("p1", "c1", None, EntityStatus::Active),
                product("p2", "c1", None, EntityStatus::Inactive),
            ],
            vec![
                holding("h1", "p1", "f1", EntityStatus::Active),
                holding("h2", "p2", "f1", EntityStatus::Active),
            ],
        );

        assert_eq!(
            SnapshotScope::Client("c1".into()).holding_ids(&graph),
            vec!["h1".to_string(), "h2".to_string()]
        );
        assert_eq!(
            SnapshotScope::Portfolio("p2".into()).holding_ids(&graph),
            vec!["h2".to_string()]
        );
        assert!(SnapshotScope::Holding("nope".into())
            .holding_ids(&graph)
            .is_empty());
        assert_eq!(SnapshotScope::Company.holding_ids(&graph).len(), 2);
    }

    #[test]
    fn test_scope_for_key() {
        let key = AnalyticsKey::new(ReportKind::PortfolioIrr, "p1", date(2025, 1, 1));
        assert_eq!(SnapshotScope::for_key(&key), SnapshotScope::Portfolio("p1".into()));
        let company = AnalyticsKey::company(ReportKind::CompanyRevenue, date(2025, 1, 1));
        assert!(SnapshotScope::for_key(&company).needs_fees());
    }
}
