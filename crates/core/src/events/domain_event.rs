//! Domain event types.

use serde::{Deserialize, Serialize};

/// Change notifications about the read-only inputs of the analytics engine.
///
/// Writers of the ledger, valuation series, fee configuration and entity
/// graph emit these after a successful commit. The analytics runtime turns
/// them into targeted cache invalidation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Activity events were recorded (including reversals) for holdings.
    ActivitiesRecorded { holding_ids: Vec<String> },

    /// New valuations were recorded for holdings.
    ValuationsRecorded { holding_ids: Vec<String> },

    /// Fee configuration of products changed.
    FeeConfigurationChanged { product_ids: Vec<String> },

    /// Status of clients, products or holdings changed
    /// (active / inactive / dormant).
    EntityStatusChanged {
        #[serde(default)]
        client_ids: Vec<String>,
        #[serde(default)]
        product_ids: Vec<String>,
        #[serde(default)]
        holding_ids: Vec<String>,
    },
}

impl DomainEvent {
    /// Creates an ActivitiesRecorded event.
    pub fn activities_recorded(holding_ids: Vec<String>) -> Self {
        Self::ActivitiesRecorded { holding_ids }
    }

    /// Creates a ValuationsRecorded event.
    pub fn valuations_recorded(holding_ids: Vec<String>) -> Self {
        Self::ValuationsRecorded { holding_ids }
    }

    /// Creates a FeeConfigurationChanged event.
    pub fn fee_configuration_changed(product_ids: Vec<String>) -> Self {
        Self::FeeConfigurationChanged { product_ids }
    }

    /// Creates an EntityStatusChanged event.
    pub fn entity_status_changed(
        client_ids: Vec<String>,
        product_ids: Vec<String>,
        holding_ids: Vec<String>,
    ) -> Self {
        Self::EntityStatusChanged {
            client_ids,
            product_ids,
            holding_ids,
        }
    }

    /// True when the event carries no ids at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::ActivitiesRecorded { holding_ids } | Self::ValuationsRecorded { holding_ids } => {
                holding_ids.is_empty()
            }
            Self::FeeConfigurationChanged { product_ids } => product_ids.is_empty(),
            Self::EntityStatusChanged {
                client_ids,
                product_ids,
                holding_ids,
            } => client_ids.is_empty() && product_ids.is_empty() && holding_ids.is_empty(),
        }
    }
}
