use crate::config::CONFIG;
use crate::core::errors::SplitbookError;
use crate::money::{Currency, round_half_up};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

/// External rate source. Returns units of quote currency per one unit of the
/// base currency; the base itself does not need to appear in the map.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: &Currency) -> Result<HashMap<Currency, Decimal>, SplitbookError>;
}

#[derive(Clone, Debug)]
pub struct RateTable {
    pub base: Currency,
    pub rates: HashMap<Currency, Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl RateTable {
    fn rate(&self, code: &Currency) -> Option<Decimal> {
        if *code == self.base {
            return Some(Decimal::ONE);
        }
        self.rates.get(code).copied()
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now() - self.fetched_at;
        age.to_std().map(|age| age > ttl).unwrap_or(true)
    }
}

/// Currency conversion pivoted through a base currency, backed by a
/// process-wide rate cache with a TTL.
///
/// Conversion never fails: when the provider is unreachable the previous
/// table is reused past staleness, and with no table at all amounts pass
/// through unconverted.
pub struct CurrencyConverter<P> {
    provider: P,
    base: Currency,
    ttl: Duration,
    fetch_timeout: Duration,
    cache: RwLock<Option<RateTable>>,
}

impl<P: RateProvider> CurrencyConverter<P> {
    pub fn new(provider: P, base: Currency) -> Self {
        Self::with_limits(
            provider,
            base,
            Duration::from_secs(CONFIG.rate_ttl_secs),
            Duration::from_millis(CONFIG.rate_fetch_timeout_ms),
        )
    }

    pub fn with_limits(provider: P, base: Currency, ttl: Duration, fetch_timeout: Duration) -> Self {
        CurrencyConverter {
            provider,
            base,
            ttl,
            fetch_timeout,
            cache: RwLock::new(None),
        }
    }

    /// Convert `amount` from one currency to another, rounded to two decimal
    /// places half-up. Same-currency calls are identity.
    pub async fn convert(&self, amount: Decimal, from: &Currency, to: &Currency) -> Decimal {
        if from == to {
            return amount;
        }
        match self.table().await {
            Some(table) => Self::apply(&table, amount, from, to),
            None => amount,
        }
    }

    /// Convert N amounts into `to` with at most one rate-table fetch.
    pub async fn convert_batch(&self, amounts: &[(Decimal, Currency)], to: &Currency) -> Vec<Decimal> {
        let table = self.table().await;
        amounts
            .iter()
            .map(|(amount, from)| {
                if from == to {
                    return *amount;
                }
                match &table {
                    Some(table) => Self::apply(table, *amount, from, to),
                    None => *amount,
                }
            })
            .collect()
    }

    fn apply(table: &RateTable, amount: Decimal, from: &Currency, to: &Currency) -> Decimal {
        match (table.rate(from), table.rate(to)) {
            (Some(from_rate), Some(to_rate)) if !from_rate.is_zero() => {
                round_half_up(amount / from_rate * to_rate)
            }
            _ => {
                warn!("no rate for {} -> {}, returning amount unconverted", from, to);
                amount
            }
        }
    }

    /// Current rate table: fresh cache if available, otherwise a bounded
    /// refresh. The fetch runs outside the lock, so concurrent refreshers
    /// race last-writer-wins, which is acceptable for advisory rates.
    async fn table(&self) -> Option<RateTable> {
        {
            let cache = self.cache.read().await;
            if let Some(table) = cache.as_ref() {
                if !table.is_stale(self.ttl) {
                    return Some(table.clone());
                }
            }
        }

        match tokio::time::timeout(self.fetch_timeout, self.provider.fetch_rates(&self.base)).await {
            Ok(Ok(rates)) => {
                let table = RateTable {
                    base: self.base.clone(),
                    rates,
                    fetched_at: Utc::now(),
                };
                let mut cache = self.cache.write().await;
                *cache = Some(table.clone());
                Some(table)
            }
            Ok(Err(err)) => {
                warn!("rate fetch failed, falling back to cached table: {}", err);
                self.cache.read().await.clone()
            }
            Err(_) => {
                warn!("rate fetch timed out, falling back to cached table");
                self.cache.read().await.clone()
            }
        }
    }
}
