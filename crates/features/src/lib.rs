//! Feature computation for the options-flow forecast system.
//!
//! This crate handles:
//! - Signed net premium per option type
//! - Call/put premium ratio and ask/bid aggressiveness
//! - Premium-by-strike ranking and Herfindahl concentration
//! - Delta notional and implied-volatility skew proxies

pub mod engine;
pub mod strikes;

pub use engine::{compute_features, FeatureEngine};
pub use strikes::StrikeAggregator;
