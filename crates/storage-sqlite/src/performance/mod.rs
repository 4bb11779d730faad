//! SQLite storage for computed IRR results.

mod model;
mod repository;

pub use model::IrrResultDB;
pub use repository::IrrResultRepository;
