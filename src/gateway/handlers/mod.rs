pub mod health;
pub mod wallet;

pub use health::{HealthResponse, health_check};
pub use wallet::{IDEMPOTENCY_KEY_HEADER, get_wallet, transfer};
