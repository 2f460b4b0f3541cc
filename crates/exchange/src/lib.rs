//! Bybit exchange adapter.
//!
//! REST integration with the v5 unified API: instrument discovery and
//! kline history.

pub mod client;
pub mod protocol;

pub use client::{BybitClient, BybitConfig, MAINNET_URL, TESTNET_URL};
