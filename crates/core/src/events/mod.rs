//! Domain events module.
//!
//! Change notifications for analytics inputs and the sink they are emitted
//! through.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
