//! A multi-exchange, multi-market Level-2 order book ingestion core.
//!
//! For each configured [`MarketDescriptor`] the core runs one [`session::Session`]: it owns a
//! venue WebSocket connection, drives a per-venue [`translate::Translator`] over the inbound
//! frames, and applies the resulting instructions to a [`book::OrderBook`] mirror. Persistence,
//! analytics, and the market registry itself live outside this crate; see [`sink`] for the
//! narrow interfaces the core talks to them through.

pub mod book;
pub mod market;
pub mod session;
pub mod sink;
pub mod translate;

pub use book::OrderBook;
pub use market::MarketDescriptor;
pub use session::Session;
pub use translate::{Instruction, Translator};
