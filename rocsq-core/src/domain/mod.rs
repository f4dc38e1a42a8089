//! Domain types for RocSq

pub mod equity;
pub mod params;
pub mod price;
pub mod trade;

pub use equity::{curve_values, EquityPoint};
pub use params::ParameterCombination;
pub use price::{PricePoint, PriceSeries};
pub use trade::TradeEvent;
