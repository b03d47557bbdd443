//! Catalog and cart service client.
//!
//! The dispatcher talks to the store through the [`Catalog`] and
//! [`CartService`] traits; [`StoreClient`] implements both over HTTP.

use crate::models::{
    Cart, CartLine, CartbotError, CatalogConfig, CatalogProduct, CatalogQuery, Result, truncate,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Read-only product queries.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search products. Text search is case-insensitive across several fields.
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogProduct>>;

    /// Fetch one product; `None` when it does not exist.
    async fn get_by_id(&self, id: u64) -> Result<Option<CatalogProduct>>;
}

/// Cart commands.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Create a cart. Rejected when a product is missing or stock is short.
    async fn create(&self, items: &[CartLine]) -> Result<Cart>;

    /// Merge lines into a cart; qty 0 removes a line.
    async fn update(&self, cart_id: u64, items: &[CartLine]) -> Result<Cart>;

    /// Fetch a cart; `None` when it does not exist.
    async fn get(&self, cart_id: u64) -> Result<Option<Cart>>;
}

/// Error body returned by the store (`{"error": "..."}`).
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: String,
}

#[derive(Debug, serde::Serialize)]
struct CartRequest<'a> {
    items: &'a [CartLine],
}

/// HTTP client for the catalog/cart service.
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CartbotError::Network)?;

        Ok(Self {
            client,
            base_url: config.resolved_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a success body, or turn a failure status into an error.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            CartbotError::InvalidResponse(format!("{e}: {}", truncate(&body, 200)))
        })
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| truncate(body, 200))
}

fn api_error(status: StatusCode, body: &str) -> CartbotError {
    CartbotError::Api {
        status: status.as_u16(),
        message: error_message(body),
    }
}

/// Cart writes report stock and missing-product problems as 400/404.
fn cart_write_error(status: StatusCode, body: &str) -> CartbotError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            CartbotError::CartRejected(error_message(body))
        }
        _ => api_error(status, body),
    }
}

#[async_trait]
impl Catalog for StoreClient {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogProduct>> {
        debug!(filters = query.len(), "Searching catalog");
        let response = self
            .client
            .get(self.url("/products"))
            .query(&query.to_query_pairs())
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<CatalogProduct>> {
        let response = self
            .client
            .get(self.url(&format!("/products/{id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }
}

#[async_trait]
impl CartService for StoreClient {
    async fn create(&self, items: &[CartLine]) -> Result<Cart> {
        let response = self
            .client
            .post(self.url("/carts"))
            .json(&CartRequest { items })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await?;
            return Err(cart_write_error(status, &body));
        }
        Self::decode(response).await
    }

    async fn update(&self, cart_id: u64, items: &[CartLine]) -> Result<Cart> {
        let response = self
            .client
            .patch(self.url(&format!("/carts/{cart_id}")))
            .json(&CartRequest { items })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await?;
            return Err(cart_write_error(status, &body));
        }
        Self::decode(response).await
    }

    async fn get(&self, cart_id: u64) -> Result<Option<Cart>> {
        let response = self
            .client
            .get(self.url(&format!("/carts/{cart_id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }
}
