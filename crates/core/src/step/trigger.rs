use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Request};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::StepOutcome;
use crate::timeline::{Step, TriggerMeta};
use crate::{LedlineError, Result};

/// Client timeout for outbound trigger calls.
pub const TRIGGER_TIMEOUT: Duration = Duration::from_secs(10);

/// Splits `"Key:Value"` on the first colon. The value keeps any further
/// colons.
pub fn split_header(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once(':')?;
    Some((name.trim(), value.trim()))
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let invalid = || LedlineError::InvalidHeader(raw.to_owned());
    let (name, value) = split_header(raw).ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((name, value))
}

fn method(verb: &str) -> Result<Method> {
    let verb = verb.trim();
    if verb.is_empty() {
        return Ok(Method::POST);
    }
    Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
        .map_err(|_| LedlineError::InvalidMethod(verb.to_owned()))
}

fn body(value: Option<&Value>) -> Result<Vec<u8>> {
    Ok(match value {
        None => Vec::new(),
        Some(Value::String(raw)) => raw.clone().into_bytes(),
        Some(other) => serde_json::to_vec(other)?,
    })
}

/// Builds the outbound request without sending it. Headers that cannot be
/// parsed are logged and left out.
pub fn build_request(client: &Client, meta: &TriggerMeta) -> Result<Request> {
    let method = method(&meta.verb)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for raw in &meta.headers {
        match parse_header(raw) {
            Ok((name, value)) => {
                headers.insert(name, value);
            }
            Err(err) => tracing::warn!(error = %err, "skipping trigger header"),
        }
    }

    let request = client
        .request(method, meta.url.as_str())
        .headers(headers)
        .body(body(meta.body.as_ref())?)
        .build()?;
    Ok(request)
}

pub(super) async fn process(
    step: &Step,
    meta: &TriggerMeta,
    cancel: &CancellationToken,
) -> StepOutcome {
    tracing::debug!(step_id = %step.id, url = %meta.url, verb = %meta.verb, "processing trigger");

    let client = match Client::builder().timeout(TRIGGER_TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(step_id = %step.id, error = %err, "cannot build trigger client");
            return StepOutcome::Continue;
        }
    };
    let request = match build_request(&client, meta) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(step_id = %step.id, error = %err, "cannot build trigger request");
            return StepOutcome::Continue;
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => StepOutcome::Canceled,
        result = client.execute(request) => {
            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(step_id = %step.id, status = %response.status(), "trigger sent");
                }
                Ok(response) => {
                    tracing::warn!(
                        step_id = %step.id,
                        url = %meta.url,
                        status = %response.status(),
                        "trigger failed"
                    );
                }
                Err(err) => {
                    tracing::warn!(step_id = %step.id, url = %meta.url, error = %err, "trigger failed");
                }
            }
            StepOutcome::Continue
        }
    }
}
