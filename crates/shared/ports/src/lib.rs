//! Sextant Ports
//!
//! Port definitions (traits) for the Sextant paper-trading engine.
//! These define the boundaries between the decision pipeline and its
//! external collaborators: signal providers, market data, the trading
//! calendar, the clock, and the durable trade store.

mod calendar;
mod clock;
mod error;
mod market;
mod store;

pub use calendar::{MarketCalendar, WeekdayCalendar};
pub use clock::Clock;
pub use error::{ProviderError, ProviderResult, StoreError, StoreResult};
pub use market::{MarketDataProvider, SignalProvider};
pub use store::TradeStore;
