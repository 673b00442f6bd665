use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::RequestError;
use crate::wire::{
    CloseOrderRequest, MessageResponse, OpenOrderRequest, OpenOrderResponse, SignupRequest,
};

/// Absolute endpoint URLs derived once from the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub signup: String,
    pub open: String,
    pub close: String,
}

impl Endpoints {
    pub fn new(base_url: &Url) -> Self {
        let root = base_url.as_str().trim_end_matches('/');
        Self {
            signup: format!("{}/signup", root),
            open: format!("{}/order/open", root),
            close: format!("{}/order/close", root),
        }
    }
}

/// A response body decoded leniently: a malformed body yields `T::default()`
/// with `well_formed == false` instead of failing the call.
#[derive(Debug)]
pub struct Decoded<T> {
    pub body: T,
    pub well_formed: bool,
}

impl<T: DeserializeOwned + Default> Decoded<T> {
    fn from_bytes(bytes: &[u8]) -> Self {
        match sonic_rs::from_slice(bytes) {
            Ok(body) => Self {
                body,
                well_formed: true,
            },
            Err(e) => {
                debug!("Failed to decode response body: {}", e);
                Self {
                    body: T::default(),
                    well_formed: false,
                }
            }
        }
    }
}

/// Per-bot HTTP transport. Each bot builds its own; instances are never shared.
#[derive(Debug)]
pub struct TradingClient {
    http: reqwest::Client,
    endpoints: Arc<Endpoints>,
}

impl TradingClient {
    pub fn new(endpoints: Arc<Endpoints>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build reqwest client")?;
        Ok(Self { http, endpoints })
    }

    pub async fn signup(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Decoded<MessageResponse>, RequestError> {
        let body = SignupRequest { username, password };
        let bytes = self.post(&self.endpoints.signup, None, &body).await?;
        Ok(Decoded::from_bytes(&bytes))
    }

    pub async fn open_position(
        &self,
        credential: &str,
        order: &OpenOrderRequest<'_>,
    ) -> Result<Decoded<OpenOrderResponse>, RequestError> {
        let bytes = self.post(&self.endpoints.open, Some(credential), order).await?;
        Ok(Decoded::from_bytes(&bytes))
    }

    /// The close response body carries nothing the harness uses.
    pub async fn close_position(&self, credential: &str, order_id: &str) -> Result<(), RequestError> {
        let body = CloseOrderRequest { order_id };
        self.post(&self.endpoints.close, Some(credential), &body)
            .await
            .map(|_| ())
    }

    async fn post<B: Serialize>(
        &self,
        url: &str,
        credential: Option<&str>,
        body: &B,
    ) -> Result<Vec<u8>, RequestError> {
        let json = sonic_rs::to_string(body)?;

        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(json);
        if let Some(token) = credential {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(RequestError::Rejected { status });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
