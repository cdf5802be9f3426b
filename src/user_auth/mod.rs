//! User registration, login and the session gate.
//!
//! - [`service::UserAuthService`]: register (user + wallet), login, logout
//! - [`jwt::TokenManager`]: stateless bearer credential
//! - [`session::SessionStore`]: `session:<token>` records with sliding expiry
//! - [`gate::SessionGate`]: both checks, used by the axum middleware

pub mod error;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod service;
pub mod session;

pub use error::AuthError;
pub use gate::{CallerIdentity, SessionGate, bearer_token};
pub use jwt::{Claims, TokenManager};
pub use service::{RegistrationPolicy, UserAuthService};
pub use session::{MemorySessionStore, RedisSessionStore, SessionError, SessionStore};
