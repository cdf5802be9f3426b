//! Wallet Gateway - accounts, sessions and atomic wallet transfers
//!
//! # Modules
//!
//! - [`core_types`] - Identifier types (UserId, WalletId, TransferId)
//! - [`money`] - Fixed-point minor-unit amounts
//! - [`models`] - User, Wallet and LedgerEntry records
//! - [`store`] - Storage ports with PostgreSQL and in-memory backends
//! - [`db`] - PostgreSQL pool and migrations
//! - [`transfer`] - Transfer engine
//! - [`user_auth`] - Registration, login, bearer tokens and sliding sessions
//! - [`gateway`] - HTTP API (axum)
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod money;
pub mod models;

// Storage
pub mod db;
pub mod store;

// Services
pub mod transfer;
pub mod user_auth;

// HTTP
pub mod gateway;

// Ambient
pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{TransferId, UserId, WalletId};
pub use money::Money;
pub use store::{MemoryStore, PgStore, Store, StoreError};
pub use transfer::{TransferCommand, TransferError, TransferOutcome, TransferService};
pub use user_auth::{AuthError, SessionGate, UserAuthService};
