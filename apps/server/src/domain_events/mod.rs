//! Domain events runtime bridge for the web server.
//!
//! Change notifications arrive through [`WebDomainEventSink`], are debounced
//! and merged per kind, then handed to the analytics query service, which
//! marks the affected cache entries stale.

mod planner;
mod queue_worker;
mod sink;

pub use planner::coalesce_events;
pub use sink::WebDomainEventSink;
