//! Request extractors

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppError;

/// JSON body that must deserialize into `T` and pass `T::validate`.
///
/// Both failures are reported as `AppError::ValidationError`, so callers see
/// the same `{"error": ...}` shape as every other failure.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        Ok(Self(value))
    }
}

/// Query string counterpart of [`ValidatedJson`].
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        Ok(Self(value))
    }
}
