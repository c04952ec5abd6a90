use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Request body sent either as JSON or as an urlencoded form.
///
/// An empty body yields `T::default()`, so controls that post nothing still
/// reach their operation and get its fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&request) {
            let Form(value) = Form::<T>::from_request(request, state)
                .await
                .map_err(|e| AppError::InvalidInput(e.body_text()))?;
            return Ok(Payload(value));
        }

        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload(T::default()));
        }

        let Json(value) =
            Json::<T>::from_bytes(&bytes).map_err(|e| AppError::InvalidInput(e.body_text()))?;
        Ok(Payload(value))
    }
}
