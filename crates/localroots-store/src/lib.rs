//! # localroots-store
//!
//! The local reactive data-store layer for the Local Roots marketplace.
//!
//! Each domain (products, cart, orders, chat, wallet) lives in a named slot
//! of a durable key-value backing as a JSON-encoded collection.  All writes
//! go through a single mutation gateway that read-modify-writes the slot
//! under optimistic concurrency and then notifies subscribers on an
//! in-process change bus.  A second [`Store`] opened on the same backing
//! observes those writes through [`Store::refresh`], so both transports feed
//! the same subscription API.
//!
//! Reads favour availability: a missing or corrupt slot decodes to an empty
//! collection instead of an error, so the UI layer is always renderable.

pub mod backing;
pub mod bus;
pub mod cart;
pub mod chat;
pub mod facade;
pub mod models;
pub mod orders;
pub mod products;
pub mod store;
pub mod wallet;

mod error;

pub use backing::{KvBacking, MemoryBacking, SlotValue, SqliteBacking};
pub use bus::{ChangeBus, Domain, Subscription};
pub use error::{MutationError, Result, StoreError, WalletError};
pub use models::*;
pub use store::{spawn_refresh, Store, StoreConfig};
pub use wallet::WithdrawMethod;
