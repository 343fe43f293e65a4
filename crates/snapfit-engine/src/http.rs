use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response as HttpResponse};
use serde_json::Value;

use crate::error::{IdentifyError, TransportKind};

pub(crate) fn http_client(service: &'static str, timeout: Duration) -> Result<HttpClient, IdentifyError> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| transport_error(service, &err))
}

pub(crate) fn send_json(service: &'static str, request: RequestBuilder) -> Result<Value, IdentifyError> {
    let response = request
        .send()
        .map_err(|err| transport_error(service, &err))?;
    response_json_or_error(service, response)
}

fn response_json_or_error(service: &'static str, response: HttpResponse) -> Result<Value, IdentifyError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| transport_error(service, &err))?;
    if !status.is_success() {
        return Err(IdentifyError::Transport {
            service,
            kind: TransportKind::Status(status.as_u16()),
            message: truncate_text(&body, 512),
        });
    }
    serde_json::from_str(&body).map_err(|err| IdentifyError::Transport {
        service,
        kind: TransportKind::Body,
        message: format!("invalid JSON payload: {err}"),
    })
}

pub(crate) fn transport_error(service: &'static str, err: &reqwest::Error) -> IdentifyError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportKind::Body
    } else {
        TransportKind::Other
    };
    IdentifyError::Transport {
        service,
        kind,
        message: error_chain_text(err, 512),
    }
}

fn error_chain_text(err: &reqwest::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut cause = Some(err as &dyn std::error::Error);
    while let Some(current) = cause {
        let text = current.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        cause = std::error::Error::source(current);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
