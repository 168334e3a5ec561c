//! HTTP storefront adapter.
//!
//! Thin JSON transport against a storefront REST gateway:
//! - `GET  {base}/api/session`       -> `{"authenticated": bool}`
//! - `GET  {base}/api/items/{sku}`   -> item detail (any 2xx)
//! - `GET  {base}/api/stock`         -> `{"in_stock": bool}`
//! - `POST {base}/api/orders`        -> `{"success": bool, "message": string?}`
//!
//! Authentication is an opaque cookie string sent on every request.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use restock_core::{AreaId, SkuId};

use crate::error::{SessionError, SessionResult};
use crate::storefront::{BoxFuture, Storefront};

/// Default timeout for storefront requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("restock/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`HttpStorefront`].
#[derive(Debug, Clone)]
pub struct HttpStorefrontConfig {
    /// Gateway base URL, without trailing slash.
    pub base_url: String,
    /// Session cookie string.
    pub cookie: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent header.
    pub user_agent: String,
}

impl HttpStorefrontConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            cookie: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    authenticated: bool,
}

#[derive(Debug, Deserialize)]
struct StockResponse {
    in_stock: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest<'a> {
    sku_id: &'a str,
    num: u32,
    area_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Storefront session over HTTP.
///
/// `reqwest::Client` is internally reference counted and safe to share, so
/// one instance serves every worker.
pub struct HttpStorefront {
    client: Client,
    base_url: String,
}

impl HttpStorefront {
    /// Create a storefront client.
    ///
    /// # Errors
    /// Returns `SessionError::HttpClient` if the cookie is not a valid header
    /// value or the client cannot be built.
    pub fn new(config: HttpStorefrontConfig) -> SessionResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| SessionError::HttpClient(format!("Invalid user agent: {e}")))?,
        );
        if let Some(cookie) = config.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            let mut value = HeaderValue::from_str(cookie.trim())
                .map_err(|e| SessionError::HttpClient(format!("Invalid cookie: {e}")))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SessionError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a gateway path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Item detail URL. The SKU is percent-encoded as a single path segment.
    ///
    /// # Errors
    /// Returns `SessionError::HttpClient` if the base URL is not a valid
    /// hierarchical URL.
    pub fn item_url(&self, sku: &SkuId) -> SessionResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SessionError::HttpClient(format!("Invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                SessionError::HttpClient(format!("Base URL cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "items", sku.as_str()]);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> SessionResult<T> {
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SessionError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| SessionError::Parse(format!("Failed to parse response: {e}")))
    }
}

impl Storefront for HttpStorefront {
    fn is_authenticated(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let result = match self.client.get(self.endpoint("api/session")).send().await {
                Ok(response) => Self::read_json::<SessionResponse>(response).await,
                Err(e) => Err(SessionError::HttpClient(format!("HTTP request failed: {e}"))),
            };
            match result {
                Ok(body) => body.authenticated,
                Err(e) => {
                    warn!(error = %e, "Session check failed");
                    false
                }
            }
        })
    }

    fn prepare_item<'a>(&'a self, sku: &'a SkuId) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            let url = self.item_url(sku)?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| SessionError::HttpClient(format!("HTTP request failed: {e}")))?;

            if response.status().as_u16() == 404 {
                return Err(SessionError::ItemNotFound(sku.to_string()));
            }
            let detail: serde_json::Value = Self::read_json(response).await?;
            info!(%sku, name = detail.get("name").and_then(|v| v.as_str()).unwrap_or(""), "Item detail loaded");
            Ok(())
        })
    }

    fn check_stock<'a>(
        &'a self,
        sku: &'a SkuId,
        quantity: u32,
        area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>> {
        Box::pin(async move {
            let quantity = quantity.to_string();
            let response = self
                .client
                .get(self.endpoint("api/stock"))
                .query(&[
                    ("skuId", sku.as_str()),
                    ("num", quantity.as_str()),
                    ("areaId", area.as_str()),
                ])
                .send()
                .await
                .map_err(|e| SessionError::HttpClient(format!("HTTP request failed: {e}")))?;

            let body: StockResponse = Self::read_json(response).await?;
            debug!(%sku, in_stock = body.in_stock, "Stock response");
            Ok(body.in_stock)
        })
    }

    fn submit_order<'a>(
        &'a self,
        sku: &'a SkuId,
        quantity: u32,
        area: &'a AreaId,
    ) -> BoxFuture<'a, SessionResult<bool>> {
        Box::pin(async move {
            let request = OrderRequest {
                sku_id: sku.as_str(),
                num: quantity,
                area_id: area.as_str(),
            };
            let response = self
                .client
                .post(self.endpoint("api/orders"))
                .json(&request)
                .send()
                .await
                .map_err(|e| SessionError::HttpClient(format!("HTTP request failed: {e}")))?;

            let body: OrderResponse = Self::read_json(response).await?;
            if !body.success {
                debug!(%sku, message = body.message.as_deref().unwrap_or(""), "Order rejected");
            }
            Ok(body.success)
        })
    }
}
