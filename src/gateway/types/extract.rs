//! Request body extractors
//!
//! Body problems are answered inside the handlers' own envelope: a body that
//! fails to parse or validate is `400 INVALID_PARAMETER`, never axum's
//! plain-text 415/422.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::response::ApiError;

/// JSON body whose rejection is an [`ApiError`]
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(Self(value))
    }
}

/// JSON body that has also passed its `validator` rules
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!(status = %rejection.status(), "Request body rejected");
    ApiError::bad_request(format!("Invalid JSON: {}", rejection.body_text()))
}
