//! Merges a debounced batch of events into at most one event per kind.

use std::collections::BTreeSet;

use advisory_core::events::DomainEvent;

fn merge(target: &mut BTreeSet<String>, ids: &[String]) {
    target.extend(ids.iter().cloned());
}

/// Unions the ids of events of the same kind. Empty results are dropped.
pub fn coalesce_events(events: &[DomainEvent]) -> Vec<DomainEvent> {
    let mut activity_holdings = BTreeSet::new();
    let mut valuation_holdings = BTreeSet::new();
    let mut fee_products = BTreeSet::new();
    let mut status_clients = BTreeSet::new();
    let mut status_products = BTreeSet::new();
    let mut status_holdings = BTreeSet::new();

    for event in events {
        match event {
            DomainEvent::ActivitiesRecorded { holding_ids } => {
                merge(&mut activity_holdings, holding_ids)
            }
            DomainEvent::ValuationsRecorded { holding_ids } => {
                merge(&mut valuation_holdings, holding_ids)
            }
            DomainEvent::FeeConfigurationChanged { product_ids } => {
                merge(&mut fee_products, product_ids)
            }
            DomainEvent::EntityStatusChanged {
                client_ids,
                product_ids,
                holding_ids,
            } => {
                merge(&mut status_clients, client_ids);
                merge(&mut status_products, product_ids);
                merge(&mut status_holdings, holding_ids);
            }
        }
    }

    [
        DomainEvent::activities_recorded(activity_holdings.into_iter().collect()),
        DomainEvent::valuations_recorded(valuation_holdings.into_iter().collect()),
        DomainEvent::fee_configuration_changed(fee_products.into_iter().collect()),
        DomainEvent::entity_status_changed(
            status_clients.into_iter().collect(),
            status_products.into_iter().collect(),
            status_holdings.into_iter().collect(),
        ),
    ]
    .into_iter()
    .filter(|event| !event.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_same_kind_events_are_merged() {
        let events = vec![
            DomainEvent::activities_recorded(ids(&["h2", "h1"])),
            DomainEvent::activities_recorded(ids(&["h1", "h3"])),
            DomainEvent::fee_configuration_changed(ids(&["p1"])),
        ];

        assert_eq!(
            coalesce_events(&events),
            vec![
                DomainEvent::activities_recorded(ids(&["h1", "h2", "h3"])),
                DomainEvent::fee_configuration_changed(ids(&["p1"])),
            ]
        );
    }

    #[test]
    fn test_status_changes_keep_their_levels() {
        let events = vec![
            DomainEvent::entity_status_changed(ids(&["c1"]), vec![], vec![]),
            DomainEvent::entity_status_changed(vec![], ids(&["p1"]), vec![]),
        ];

        assert_eq!(
            coalesce_events(&events),
            vec![DomainEvent::entity_status_changed(ids(&["c1"]), ids(&["p1"]), vec![])]
        );
    }

    #[test]
    fn test_empty_batch_plans_nothing() {
        assert!(coalesce_events(&[DomainEvent::valuations_recorded(vec![])]).is_empty());
    }
}
