//! JSON body extractor that runs `validator` checks.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use sophub_core::error::AppError;

use crate::error::ApiError;

/// JSON body that was deserialized and validated.
///
/// Malformed bodies and failed validations both surface as
/// `VALIDATION_ERROR` responses in the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        data.validate().map_err(validation_error)?;
        Ok(Self(data))
    }
}

/// Flatten field errors into one message, sorted by field.
fn validation_error(errors: ValidationErrors) -> AppError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| match &error.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: failed {} check", error.code),
            })
        })
        .collect();
    messages.sort();

    tracing::debug!(errors = ?errors.field_errors(), "Request validation failed");
    if messages.is_empty() {
        AppError::validation("Validation failed")
    } else {
        AppError::validation(messages.join("; "))
    }
}
