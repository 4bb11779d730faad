use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::model::{ClientDB, PortfolioFundDB, ProductDB};
use crate::db::{get_connection, DbPool};
use crate::errors::StorageResult;
use crate::schema::{client_products, clients, portfolio_funds};
use crate::utils::{format_timestamp, parse_timestamp};
use advisory_core::entities::{Client, EntityGraph, PortfolioFund, Product};
use advisory_core::{Error, Result};

/// Reads the whole client → product → fund graph.
pub fn read_entity_graph(conn: &mut SqliteConnection) -> StorageResult<EntityGraph> {
    let clients = clients::table
        .select(ClientDB::as_select())
        .order(clients::id)
        .load::<ClientDB>(conn)?
        .into_iter()
        .map(Client::try_from)
        .collect::<StorageResult<Vec<_>>>()?;

    let products = client_products::table
        .select(ProductDB::as_select())
        .order(client_products::id)
        .load::<ProductDB>(conn)?
        .into_iter()
        .map(Product::try_from)
        .collect::<StorageResult<Vec<_>>>()?;

    let holdings = portfolio_funds::table
        .select(PortfolioFundDB::as_select())
        .order(portfolio_funds::id)
        .load::<PortfolioFundDB>(conn)?
        .into_iter()
        .map(PortfolioFund::try_from)
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(EntityGraph::new(clients, products, holdings))
}

/// Entity rows touched after a watermark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityChanges {
    pub client_ids: Vec<String>,
    pub product_ids: Vec<String>,
    pub holding_ids: Vec<String>,
    pub latest: Option<DateTime<Utc>>,
}

impl EntityChanges {
    pub fn is_empty(&self) -> bool {
        self.client_ids.is_empty() && self.product_ids.is_empty() && self.holding_ids.is_empty()
    }
}

pub fn read_entity_changes(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StorageResult<EntityChanges> {
    let since = format_timestamp(since);

    let client_rows = clients::table
        .filter(clients::updated_at.gt(since.as_str()))
        .select((clients::id, clients::updated_at))
        .load::<(String, String)>(conn)?;
    let product_rows = client_products::table
        .filter(client_products::updated_at.gt(since.as_str()))
        .select((client_products::id, client_products::updated_at))
        .load::<(String, String)>(conn)?;
    let holding_rows = portfolio_funds::table
        .filter(portfolio_funds::updated_at.gt(since.as_str()))
        .select((portfolio_funds::id, portfolio_funds::updated_at))
        .load::<(String, String)>(conn)?;

    let mut latest: Option<DateTime<Utc>> = None;
    for (_, updated_at) in client_rows.iter().chain(&product_rows).chain(&holding_rows) {
        let ts = parse_timestamp(updated_at)?;
        latest = Some(latest.map_or(ts, |l| l.max(ts)));
    }

    Ok(EntityChanges {
        client_ids: client_rows.into_iter().map(|(id, _)| id).collect(),
        product_ids: product_rows.into_iter().map(|(id, _)| id).collect(),
        holding_ids: holding_rows.into_iter().map(|(id, _)| id).collect(),
        latest,
    })
}

/// Read access to the entity graph.
pub struct EntityRepository {
    pool: Arc<DbPool>,
}

impl EntityRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn load_entity_graph(&self) -> Result<EntityGraph> {
        let mut conn = get_connection(&self.pool)?;
        read_entity_graph(&mut conn).map_err(Error::from)
    }
}
