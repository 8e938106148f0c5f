//! # HIE Wire
//!
//! Generic request/response execution for the protocol clients. Every
//! outbound call in the workspace goes through [`WireClient`]: templated
//! SOAP posts, FHIR-style JSON GETs and the persistence-API exchanges.
//!
//! Calls are synchronous request/response with an explicit per-call timeout;
//! a call that exceeds its timeout fails with [`WireError::Transport`]. No
//! retry happens at this layer.

pub mod template;

pub use template::render;

use std::time::Duration;

/// Default timeout for identity and persistence calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by wire execution.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

pub type WireResult<T> = Result<T, WireError>;

/// A templated SOAP request.
#[derive(Clone, Debug)]
pub struct SoapRequest {
    pub url: String,
    /// `SOAPAction` header value; `None` omits the header (broker acks).
    pub action: Option<String>,
    pub body: String,
    pub timeout: Duration,
}

/// The raw outcome of a wire call. Parsing stays with the protocol client
/// that knows the dialect.
#[derive(Clone, Debug)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

/// Shared HTTP executor wrapping a connection-pooling [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct WireClient {
    http: reqwest::Client,
}

impl WireClient {
    pub fn new() -> WireResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(WireError::Client)?;
        Ok(Self { http })
    }

    /// POST a SOAP envelope. Content type is always `application/soap+xml`.
    pub async fn soap(&self, req: &SoapRequest) -> WireResult<WireResponse> {
        tracing::debug!(url = %req.url, action = ?req.action, "sending SOAP request");
        let mut builder = self
            .http
            .post(&req.url)
            .header("Content-Type", "application/soap+xml")
            .header("Accept", "*/*")
            .timeout(req.timeout)
            .body(req.body.clone());
        if let Some(action) = &req.action {
            builder = builder.header("SOAPAction", action.as_str());
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        tracing::debug!(status, "SOAP response received");
        Ok(WireResponse { status, body })
    }

    /// GET a JSON resource (the PIXm identity query path).
    pub async fn get_json(&self, url: &str, timeout: Duration) -> WireResult<WireResponse> {
        tracing::debug!(%url, "sending GET request");
        let resp = self
            .http
            .get(url)
            .header("Content-Type", "application/json")
            .header("Accept", "*/*")
            .timeout(timeout)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        tracing::debug!(status, "GET response received");
        Ok(WireResponse { status, body })
    }

    /// Exchange a JSON body with the persistence API. `select` travels as
    /// GET (with body), every mutating action as POST; non-2xx responses
    /// fail with [`WireError::Status`].
    pub async fn api_exchange(
        &self,
        url: &str,
        method: reqwest::Method,
        body: String,
        timeout: Duration,
    ) -> WireResult<WireResponse> {
        tracing::debug!(%url, %method, "sending persistence API request");
        let resp = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json; charset=utf-8")
            .timeout(timeout)
            .body(body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(WireError::Status {
                status,
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        Ok(WireResponse { status, body })
    }
}
