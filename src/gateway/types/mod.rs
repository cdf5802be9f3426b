//! Gateway types module
//!
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: handler error type
//! - [`error_codes`]: numeric codes carried in `ApiResponse::code`
//! - [`ApiJson`] / [`ValidatedJson`]: body extractors rejecting with `ApiError`

pub mod extract;
pub mod response;

pub use extract::{ApiJson, ValidatedJson};
pub use response::{ApiError, ApiResponse, error_codes};
