use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};
use crate::types::{ApiEnvelope, ApiErrorBody};

/// Decode an envelope, turning non-2xx answers into `ClientError::Api` with
/// the server's own message
pub async fn read_envelope<T: DeserializeOwned>(response: Response) -> ClientResult<ApiEnvelope<T>> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        return Err(ClientError::api(status.as_u16(), message));
    }

    if text.trim().is_empty() {
        return Ok(ApiEnvelope {
            status: None,
            message: None,
            data: None,
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| ClientError::invalid_response(format!("{} ({})", e, status)))
}

/// Envelope payload, failing when the server sent none
pub fn require_data<T>(envelope: ApiEnvelope<T>, what: &str) -> ClientResult<T> {
    envelope
        .data
        .ok_or_else(|| ClientError::invalid_response(format!("Missing {} in response", what)))
}
