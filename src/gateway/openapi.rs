//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;
use crate::models::{EntryType, LedgerEntry, UserSummary, Wallet};
use crate::transfer::{TransferRequest, TransferResponse, WalletOverview};
use crate::user_auth::handlers::MeResponse;
use crate::user_auth::service::{AuthResponse, LoginRequest, RegisterRequest, RegisterResponse};

/// Bearer JWT + live session
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token from POST /auth/login. Also requires a live session; \
                             sessions expire after the configured idle timeout.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wallet Gateway API",
        version = "1.0.0",
        description = "Account registration, sessions and atomic wallet-to-wallet transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::logout,
        crate::user_auth::handlers::me,
        crate::gateway::handlers::wallet::get_wallet,
        crate::gateway::handlers::wallet::transfer,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            AuthResponse,
            MeResponse,
            UserSummary,
            Wallet,
            LedgerEntry,
            EntryType,
            WalletOverview,
            TransferRequest,
            TransferResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and logout"),
        (name = "User", description = "Caller identity (auth required)"),
        (name = "Wallet", description = "Balance, history and transfers (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
