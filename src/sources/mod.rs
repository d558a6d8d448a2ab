//! Market data source implementations

pub mod coincap;

pub use coincap::CoinCapSource;
