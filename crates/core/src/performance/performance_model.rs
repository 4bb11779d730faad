use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Level of the entity graph an IRR is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    Fund,
    Portfolio,
    Client,
    Company,
}

impl EntityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLevel::Fund => "fund",
            EntityLevel::Portfolio => "portfolio",
            EntityLevel::Client => "client",
            EntityLevel::Company => "company",
        }
    }
}

impl FromStr for EntityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fund" => Ok(EntityLevel::Fund),
            "portfolio" => Ok(EntityLevel::Portfolio),
            "client" => Ok(EntityLevel::Client),
            "company" => Ok(EntityLevel::Company),
            _ => Err(format!("Unknown entity level: {}", s)),
        }
    }
}

impl std::fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IrrMethod {
    Newton,
    Bisection,
    /// Every flow was effectively zero; the rate is 0%.
    Flat,
    /// No rate was produced.
    #[default]
    #[serde(rename = "none")]
    Unsolved,
}

impl IrrMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrrMethod::Newton => "newton",
            IrrMethod::Bisection => "bisection",
            IrrMethod::Flat => "flat",
            IrrMethod::Unsolved => "none",
        }
    }
}

impl FromStr for IrrMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "newton" => Ok(IrrMethod::Newton),
            "bisection" => Ok(IrrMethod::Bisection),
            "flat" => Ok(IrrMethod::Flat),
            "none" => Ok(IrrMethod::Unsolved),
            _ => Err(format!("Unknown IRR method: {}", s)),
        }
    }
}

/// One dated external flow, signed as net capital into the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Money-weighted annual return of one entity as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrResult {
    pub id: String,
    pub entity_id: String,
    pub entity_level: EntityLevel,
    /// Annual rate as a fraction (0.1 = 10%). `None` when not converged.
    pub rate: Option<Decimal>,
    pub as_of_date: NaiveDate,
    pub converged: bool,
    pub cash_flow_count: u32,
    pub iterations: u32,
    pub method: IrrMethod,
    /// Why no rate was produced, when `converged` is false.
    pub failure_reason: Option<String>,
    pub computed_at: DateTime<Utc>,
}

/// An entity left out of an aggregate because its own inputs are unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedEntity {
    pub entity_id: String,
    pub entity_level: EntityLevel,
    pub reason: String,
}

/// IRR of an entity together with the inputs it was solved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityIrr {
    pub result: IrrResult,
    pub terminal_value: Decimal,
    pub net_contributions: Decimal,
    pub cash_flows: Vec<CashFlow>,
    pub excluded_entities: Vec<ExcludedEntity>,
}
