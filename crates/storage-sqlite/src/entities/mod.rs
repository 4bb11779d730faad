//! SQLite storage for clients, products and portfolio funds.

mod model;
mod repository;

pub use model::{ClientDB, PortfolioFundDB, ProductDB};
pub use repository::{read_entity_graph, read_entity_changes, EntityChanges, EntityRepository};
