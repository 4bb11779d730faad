//! Activities module - ledger event models and the read-only ledger trait.

mod activities_constants;
mod activities_model;
mod activities_traits;

pub use activities_constants::*;
pub use activities_model::{ActivityEvent, ActivityType};
pub use activities_traits::ActivityLedgerReaderTrait;
