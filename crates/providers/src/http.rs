//! HTTP plumbing shared by the providers.

use std::time::Duration;

use ragpilot_core::error::ProviderError;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a transport failure onto the provider taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Turn a non-success HTTP status into a `ProviderError`.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response),
        429 => Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        }),
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        404 => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::ModelNotFound(body))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status, body = %body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status,
                message: body,
            })
        }
    }
}

/// Decode a JSON body, reporting failures as malformed responses.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))
}

/// Arguments as a JSON object, for backends that want objects on the wire.
pub(crate) fn arguments_as_object(raw: &serde_json::Value) -> serde_json::Value {
    match raw {
        serde_json::Value::Object(_) => raw.clone(),
        serde_json::Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
            Ok(parsed @ serde_json::Value::Object(_)) => parsed,
            _ => serde_json::json!({}),
        },
        _ => serde_json::json!({}),
    }
}

/// Arguments as serialized JSON text, for backends that want strings.
pub(crate) fn arguments_as_string(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "{}".into(),
        other => other.to_string(),
    }
}
