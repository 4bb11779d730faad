//! Builders shared by unit tests across modules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::activities::{ActivityEvent, ActivityType};
use crate::analytics::{AnalyticsComputer, AnalyticsKey, AnalyticsPayload, DistributionReport};
use crate::entities::{Client, EntityStatus, PortfolioFund, Product};
use crate::errors::{Error, Result};
use crate::valuations::Valuation;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn client(id: &str, status: EntityStatus) -> Client {
    Client {
        id: id.to_string(),
        name: format!("Client {}", id),
        status,
    }
}

pub fn product(id: &str, client_id: &str, provider_id: Option<&str>, status: EntityStatus) -> Product {
    Product {
        id: id.to_string(),
        client_id: client_id.to_string(),
        product_name: format!("Product {}", id),
        provider_id: provider_id.map(str::to_string),
        status,
    }
}

pub fn holding(id: &str, product_id: &str, fund_id: &str, status: EntityStatus) -> PortfolioFund {
    PortfolioFund {
        id: id.to_string(),
        product_id: product_id.to_string(),
        fund_id: fund_id.to_string(),
        fund_name: format!("Fund {}", fund_id),
        status,
    }
}

pub fn valuation(holding_id: &str, on: NaiveDate, value: Decimal) -> Valuation {
    Valuation {
        holding_id: holding_id.to_string(),
        valuation_date: on,
        value,
        recorded_at: Utc.from_utc_datetime(&on.and_hms_opt(18, 0, 0).unwrap()),
    }
}

pub fn activity(
    id: &str,
    holding_id: &str,
    activity_type: ActivityType,
    amount: Decimal,
    on: NaiveDate,
) -> ActivityEvent {
    ActivityEvent {
        id: id.to_string(),
        holding_id: holding_id.to_string(),
        activity_type,
        amount,
        event_date: on,
        related_fund_id: None,
        reversal_of: None,
        recorded_at: Utc.from_utc_datetime(&on.and_hms_opt(12, 0, 0).unwrap()),
    }
}

pub fn switch(
    id: &str,
    holding_id: &str,
    activity_type: ActivityType,
    amount: Decimal,
    on: NaiveDate,
    related_fund_id: &str,
) -> ActivityEvent {
    let mut event = activity(id, holding_id, activity_type, amount, on);
    event.related_fund_id = Some(related_fund_id.to_string());
    event
}

/// Computer that counts calls and can be told to fail or panic.
pub struct CountingComputer {
    calls: AtomicUsize,
    fail_from_call: AtomicUsize,
    panics: bool,
    delay: Duration,
}

impl CountingComputer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_from_call: AtomicUsize::new(usize::MAX),
            panics: false,
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::new(0)
        }
    }

    /// Every call from the next one on fails.
    pub fn fail_from_now(&self) {
        let next = self.calls() + 1;
        self.fail_from_call.store(next, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Payload whose total value is the call number that produced it.
pub fn versioned_payload(version: usize) -> AnalyticsPayload {
    AnalyticsPayload::FundDistribution(DistributionReport {
        as_of: date(2025, 3, 31),
        total_value: Decimal::from(version as u64),
        buckets: Vec::new(),
    })
}

#[async_trait]
impl AnalyticsComputer for CountingComputer {
    async fn compute(&self, _key: &AnalyticsKey) -> Result<AnalyticsPayload> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("computer panicked on call {}", call);
        }
        if call >= self.fail_from_call.load(Ordering::SeqCst) {
            return Err(Error::Unexpected("source unavailable".to_string()));
        }
        Ok(versioned_payload(call))
    }
}
