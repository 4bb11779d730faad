//! Flow classification for IRR calculation.
//!
//! This module classifies ledger events as external or internal flows for a
//! given level of the entity graph. Only external flows (money crossing the
//! entity boundary) enter the IRR cash-flow series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::CashFlow;
use crate::activities::ActivityEvent;
use crate::entities::EntityGraph;
use crate::errors::ClassificationError;

/// Flow type for IRR calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// External flow - money crossing the entity boundary
    External,

    /// Internal flow - money moving between holdings of the entity
    Internal,
}

/// Level at which flows are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowScope {
    /// Single holding: switches are external (money leaves or enters the fund)
    Fund,

    /// Portfolio, client or company: switches between holdings of the same
    /// portfolio are internal
    Portfolio,
}

/// Inclusive date range of events that enter a cash-flow series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowWindow {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

impl FlowWindow {
    /// Every event from inception up to and including `as_of`.
    pub fn since_inception(as_of: NaiveDate) -> Self {
        Self {
            start: None,
            end: as_of,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date <= self.end && self.start.map_or(true, |start| date >= start)
    }
}

/// Checks that a switch event points at another holding of its portfolio.
fn validate_switch(event: &ActivityEvent, graph: &EntityGraph) -> Result<(), ClassificationError> {
    let Some(related) = event.related_fund_id.as_deref() else {
        return Err(ClassificationError::MissingRelatedFund {
            event_id: event.id.clone(),
            holding_id: event.holding_id.clone(),
        });
    };

    if related == event.holding_id {
        return Err(ClassificationError::SelfReferencingSwitch {
            event_id: event.id.clone(),
            holding_id: event.holding_id.clone(),
        });
    }

    if !graph.same_portfolio(&event.holding_id, related) {
        return Err(ClassificationError::RelatedFundOutsidePortfolio {
            event_id: event.id.clone(),
            holding_id: event.holding_id.clone(),
            related_fund_id: related.to_string(),
        });
    }

    Ok(())
}

/// Classify one event for a scope.
///
/// Contributions, withdrawals, tax uplifts and fees are external at every
/// level. Switches are external for the fund they touch and internal above
/// it. A switch without a valid counterparty is an error at every level so
/// that it can never silently become a zero flow.
pub fn classify_flow(
    event: &ActivityEvent,
    scope: FlowScope,
    graph: &EntityGraph,
) -> Result<FlowType, ClassificationError> {
    if graph.holding(&event.holding_id).is_none() {
        return Err(ClassificationError::UnknownHolding {
            event_id: event.id.clone(),
            holding_id: event.holding_id.clone(),
        });
    }

    if !event.activity_type.is_switch() {
        return Ok(FlowType::External);
    }

    validate_switch(event, graph)?;

    Ok(match scope {
        FlowScope::Fund => FlowType::External,
        FlowScope::Portfolio => FlowType::Internal,
    })
}

/// Check if an event is an external flow for the scope
pub fn is_external_flow(
    event: &ActivityEvent,
    scope: FlowScope,
    graph: &EntityGraph,
) -> Result<bool, ClassificationError> {
    Ok(classify_flow(event, scope, graph)? == FlowType::External)
}

/// Builds the dated external flow series of a set of events.
///
/// Events outside the window are ignored. Flows on the same date are netted,
/// and dates that net to zero are dropped. The result is ordered by date.
pub fn external_cash_flows<'a, I>(
    events: I,
    scope: FlowScope,
    graph: &EntityGraph,
    window: FlowWindow,
) -> Result<Vec<CashFlow>, ClassificationError>
where
    I: IntoIterator<Item = &'a ActivityEvent>,
{
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

    for event in events {
        if !window.contains(event.event_date) {
            continue;
        }
        if classify_flow(event, scope, graph)? == FlowType::Internal {
            continue;
        }
        *by_date.entry(event.event_date).or_insert(Decimal::ZERO) += event.signed_amount()?;
    }

    Ok(by_date
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(date, amount)| CashFlow { date, amount })
        .collect())
}
