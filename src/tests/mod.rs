mod group_tests;
mod settlement_tests;
mod summary_tests;

use crate::core::errors::SplitbookError;
use crate::core::models::expense::{PaidBy, ShareWith};
use crate::core::services::{ExpenseDraft, SplitbookService};
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::notify::in_memory::InMemoryNotifier;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use crate::money::Currency;
use crate::money::convert::{CurrencyConverter, RateProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub type TestService =
    SplitbookService<InMemoryLogging, InMemoryStorage, InMemoryNotifier, FixedRateProvider>;

#[derive(Clone, Default)]
pub struct FixedRateProvider {
    rates: HashMap<Currency, Decimal>,
}

impl FixedRateProvider {
    pub fn with_rates(rates: &[(&str, &str)]) -> Self {
        FixedRateProvider {
            rates: rates
                .iter()
                .map(|(code, rate)| (Currency::new(code), amt(rate)))
                .collect(),
        }
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn fetch_rates(
        &self,
        _base: &Currency,
    ) -> Result<HashMap<Currency, Decimal>, SplitbookError> {
        Ok(self.rates.clone())
    }
}

pub fn amt(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn usd() -> Currency {
    Currency::new("USD")
}

pub fn test_converter(provider: FixedRateProvider) -> CurrencyConverter<FixedRateProvider> {
    CurrencyConverter::with_limits(
        provider,
        usd(),
        Duration::from_secs(3600),
        Duration::from_millis(200),
    )
}

pub fn create_test_service() -> TestService {
    let (service, _) = create_test_service_with_notifier();
    service
}

pub fn create_test_service_with_notifier() -> (TestService, InMemoryNotifier) {
    let notifier = InMemoryNotifier::new();
    let service = SplitbookService::new(
        InMemoryStorage::new(),
        InMemoryLogging::new(),
        notifier.clone(),
        test_converter(FixedRateProvider::default()),
    );
    (service, notifier)
}

pub fn create_test_service_with_provider(provider: FixedRateProvider) -> TestService {
    SplitbookService::new(
        InMemoryStorage::new(),
        InMemoryLogging::new(),
        InMemoryNotifier::new(),
        test_converter(provider),
    )
}

/// Creates a group owned by `members[0]` with the rest as plain members.
pub async fn seed_group(service: &TestService, members: &[&str]) -> crate::core::models::Group {
    service
        .create_group(
            "Trip".to_string(),
            usd(),
            members[1..].iter().map(|m| m.to_string()).collect(),
            members[0],
        )
        .await
        .unwrap()
}

pub fn equal_expense(amount: &str, payer: &str, members: &[&str]) -> ExpenseDraft {
    ExpenseDraft {
        description: "Dinner".to_string(),
        amount: amt(amount),
        currency: usd(),
        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        category: None,
        note: None,
        paid_by: PaidBy::Individual {
            email: payer.to_string(),
        },
        share_with: ShareWith::Equal {
            members: members.iter().map(|m| m.to_string()).collect(),
        },
    }
}
