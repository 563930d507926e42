pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;
pub mod money;
pub mod telemetry;

pub use crate::core::balance::BalanceSheet;
pub use crate::core::errors::{ErrorKind, SplitbookError};
pub use crate::core::services::SplitbookService;
pub use crate::infrastructure::logging::in_memory::InMemoryLogging;
pub use crate::infrastructure::notify::in_memory::InMemoryNotifier;
pub use crate::infrastructure::storage::in_memory::InMemoryStorage;
pub use crate::money::convert::{CurrencyConverter, RateProvider};

#[cfg(test)]
mod tests;
