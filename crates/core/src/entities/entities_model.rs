//! Client, product and holding records and the graph they form.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by clients, products and holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
    /// No longer actively managed but still holding money.
    Dormant,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "active",
            EntityStatus::Inactive => "inactive",
            EntityStatus::Dormant => "dormant",
        }
    }
}

impl FromStr for EntityStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(EntityStatus::Active),
            "inactive" => Ok(EntityStatus::Inactive),
            "dormant" => Ok(EntityStatus::Dormant),
            other => Err(format!("Unknown entity status: {}", other)),
        }
    }
}

/// Which statuses count towards totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    ActiveOnly,
    /// Used only by the company revenue report.
    ActiveAndDormant,
}

impl StatusFilter {
    pub fn includes(&self, status: EntityStatus) -> bool {
        match self {
            StatusFilter::ActiveOnly => status == EntityStatus::Active,
            StatusFilter::ActiveAndDormant => {
                matches!(status, EntityStatus::Active | EntityStatus::Dormant)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub status: EntityStatus,
}

/// A client product. Each product wraps exactly one portfolio, so the
/// product id doubles as the portfolio id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub client_id: String,
    pub product_name: String,
    pub provider_id: Option<String>,
    pub status: EntityStatus,
}

/// A holding of a catalogue fund inside a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioFund {
    pub id: String,
    pub product_id: String,
    pub fund_id: String,
    pub fund_name: String,
    pub status: EntityStatus,
}

/// Owning portfolio and client of a holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingLineage<'a> {
    pub holding_id: &'a str,
    pub product_id: &'a str,
    pub client_id: &'a str,
}

/// The fund → portfolio → client DAG.
///
/// Orphans (a product whose client is missing, a holding whose product is
/// missing) are kept in the lookup maps but never reached from a parent.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    clients: BTreeMap<String, Client>,
    products: BTreeMap<String, Product>,
    holdings: BTreeMap<String, PortfolioFund>,
    products_by_client: HashMap<String, Vec<String>>,
    holdings_by_product: HashMap<String, Vec<String>>,
}

impl EntityGraph {
    pub fn new(clients: Vec<Client>, products: Vec<Product>, holdings: Vec<PortfolioFund>) -> Self {
        let mut products_by_client: HashMap<String, Vec<String>> = HashMap::new();
        for product in &products {
            products_by_client
                .entry(product.client_id.clone())
                .or_default()
                .push(product.id.clone());
        }

        let mut holdings_by_product: HashMap<String, Vec<String>> = HashMap::new();
        for holding in &holdings {
            holdings_by_product
                .entry(holding.product_id.clone())
                .or_default()
                .push(holding.id.clone());
        }

        for ids in products_by_client
            .values_mut()
            .chain(holdings_by_product.values_mut())
        {
            ids.sort();
        }

        Self {
            clients: clients.into_iter().map(|c| (c.id.clone(), c)).collect(),
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            holdings: holdings.into_iter().map(|h| (h.id.clone(), h)).collect(),
            products_by_client,
            holdings_by_product,
        }
    }

    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn holding(&self, holding_id: &str) -> Option<&PortfolioFund> {
        self.holdings.get(holding_id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn holdings(&self) -> impl Iterator<Item = &PortfolioFund> {
        self.holdings.values()
    }

    pub fn products_of_client(&self, client_id: &str) -> Vec<&Product> {
        self.products_by_client
            .get(client_id)
            .map(|ids| ids.iter().filter_map(|id| self.products.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn holdings_of_product(&self, product_id: &str) -> Vec<&PortfolioFund> {
        self.holdings_by_product
            .get(product_id)
            .map(|ids| ids.iter().filter_map(|id| self.holdings.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn holding_ids_of_product(&self, product_id: &str) -> Vec<String> {
        self.holdings_by_product
            .get(product_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn lineage(&self, holding_id: &str) -> Option<HoldingLineage<'_>> {
        let holding = self.holdings.get(holding_id)?;
        let product = self.products.get(&holding.product_id)?;
        Some(HoldingLineage {
            holding_id: &holding.id,
            product_id: &product.id,
            client_id: &product.client_id,
        })
    }

    /// True when both holdings exist and sit in the same portfolio.
    pub fn same_portfolio(&self, holding_a: &str, holding_b: &str) -> bool {
        match (self.holdings.get(holding_a), self.holdings.get(holding_b)) {
            (Some(a), Some(b)) => a.product_id == b.product_id,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.products.is_empty() && self.holdings.is_empty()
    }
}
