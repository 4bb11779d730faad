//! Database models for the entity graph.

use std::str::FromStr;

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::format_timestamp;
use advisory_core::entities::{Client, EntityStatus, PortfolioFund, Product};

fn parse_status(raw: &str, table: &str, id: &str) -> Result<EntityStatus, StorageError> {
    EntityStatus::from_str(raw)
        .map_err(|e| StorageError::Decode(format!("{} {}: {}", table, id, e)))
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::clients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClientDB {
    pub id: String,
    pub name: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ClientDB> for Client {
    type Error = StorageError;

    fn try_from(db: ClientDB) -> Result<Self, Self::Error> {
        let status = parse_status(&db.status, "client", &db.id)?;
        Ok(Client {
            id: db.id,
            name: db.name,
            status,
        })
    }
}

impl From<&Client> for ClientDB {
    fn from(client: &Client) -> Self {
        let now = format_timestamp(chrono::Utc::now());
        Self {
            id: client.id.clone(),
            name: client.name.clone(),
            status: client.status.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::client_products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductDB {
    pub id: String,
    pub client_id: String,
    pub product_name: String,
    pub provider_id: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ProductDB> for Product {
    type Error = StorageError;

    fn try_from(db: ProductDB) -> Result<Self, Self::Error> {
        let status = parse_status(&db.status, "product", &db.id)?;
        Ok(Product {
            id: db.id,
            client_id: db.client_id,
            product_name: db.product_name,
            provider_id: db.provider_id.filter(|p| !p.trim().is_empty()),
            status,
        })
    }
}

impl From<&Product> for ProductDB {
    fn from(product: &Product) -> Self {
        let now = format_timestamp(chrono::Utc::now());
        Self {
            id: product.id.clone(),
            client_id: product.client_id.clone(),
            product_name: product.product_name.clone(),
            provider_id: product.provider_id.clone(),
            status: product.status.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolio_funds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PortfolioFundDB {
    pub id: String,
    pub product_id: String,
    pub fund_id: String,
    pub fund_name: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<PortfolioFundDB> for PortfolioFund {
    type Error = StorageError;

    fn try_from(db: PortfolioFundDB) -> Result<Self, Self::Error> {
        let status = parse_status(&db.status, "portfolio fund", &db.id)?;
        Ok(PortfolioFund {
            id: db.id,
            product_id: db.product_id,
            fund_id: db.fund_id,
            fund_name: db.fund_name,
            status,
        })
    }
}

impl From<&PortfolioFund> for PortfolioFundDB {
    fn from(holding: &PortfolioFund) -> Self {
        let now = format_timestamp(chrono::Utc::now());
        Self {
            id: holding.id.clone(),
            product_id: holding.product_id.clone(),
            fund_id: holding.fund_id.clone(),
            fund_name: holding.fund_name.clone(),
            status: holding.status.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_parsed_leniently() {
        let db = ClientDB {
            id: "c1".to_string(),
            name: "Alice".to_string(),
            status: " Dormant ".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(Client::try_from(db).unwrap().status, EntityStatus::Dormant);
    }

    #[test]
    fn test_unknown_status_is_a_decode_error() {
        let db = ProductDB {
            id: "p1".to_string(),
            client_id: "c1".to_string(),
            product_name: "ISA".to_string(),
            provider_id: Some("  ".to_string()),
            status: "closed".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(matches!(Product::try_from(db), Err(StorageError::Decode(_))));
    }
}
