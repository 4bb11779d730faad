//! Entities module - clients, products, holdings and the entity graph.

mod entities_model;

pub use entities_model::{
    Client, EntityGraph, EntityStatus, HoldingLineage, PortfolioFund, Product, StatusFilter,
};
