//! HTTP client for the Admin GraphQL API.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use tracing::instrument;

use super::{GraphQLError, ShopifyError, queries};

/// Credentials for one shop's Admin API access.
#[derive(Clone)]
pub struct ShopCredentials {
    /// Shop domain, e.g. `mystore.myshopify.com`.
    pub domain: String,
    /// Offline access token for that shop.
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopCredentials")
            .field("domain", &self.domain)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// One page of a paginated connection, with untyped nodes.
#[derive(Debug, Clone)]
pub struct Page {
    pub nodes: Vec<Value>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Shopify Admin API GraphQL client.
///
/// Cheap to clone; the underlying HTTP client and API version are shared.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    http: reqwest::Client,
    api_version: String,
}

impl AdminClient {
    /// Create a new Admin API client for the given API version.
    #[must_use]
    pub fn new(api_version: &str) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                http: reqwest::Client::new(),
                api_version: api_version.to_string(),
            }),
        }
    }

    /// Execute a GraphQL document against a shop's Admin API.
    ///
    /// Variables with a `null` value are stripped before sending, so callers
    /// can build variable maps unconditionally and rely on the API defaults
    /// for absent values (e.g. `after` on the first page).
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::RateLimited` on HTTP 429,
    /// `ShopifyError::Unauthorized` on HTTP 401/403,
    /// `ShopifyError::GraphQL` when the response carries GraphQL errors,
    /// `ShopifyError::Http` on transport failures.
    pub async fn execute(
        &self,
        creds: &ShopCredentials,
        document: &str,
        mut variables: Map<String, Value>,
    ) -> Result<Value, ShopifyError> {
        variables.retain(|_, v| !v.is_null());

        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            creds.domain, self.inner.api_version
        );

        let response = self
            .inner
            .http
            .post(&endpoint)
            .header("X-Shopify-Access-Token", creds.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let body: Value = response.json().await?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let converted: Vec<GraphQLError> = errors
                .iter()
                .map(|e| GraphQLError {
                    message: e
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown GraphQL error")
                        .to_string(),
                    path: e
                        .get("path")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default(),
                })
                .collect();
            return Err(ShopifyError::GraphQL(converted));
        }

        body.get("data").cloned().ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                path: vec![],
            }])
        })
    }

    /// Fetch a full discount node by GID.
    ///
    /// Used to enrich sparse REST webhook payloads before normalization.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if the node does not exist, or any
    /// error from [`Self::execute`].
    #[instrument(skip(self, creds), fields(shop = %creds.domain))]
    pub async fn fetch_discount_node(
        &self,
        creds: &ShopCredentials,
        gid: &str,
    ) -> Result<Value, ShopifyError> {
        let mut variables = Map::new();
        variables.insert("id".to_string(), json!(gid));

        let data = self
            .execute(creds, &queries::discount_node(), variables)
            .await?;

        match data.get("node") {
            Some(node) if !node.is_null() => Ok(node.clone()),
            _ => Err(ShopifyError::NotFound(gid.to_string())),
        }
    }

    /// Fetch a full order node by GID.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if the node does not exist or is not
    /// an order, or any error from [`Self::execute`].
    #[instrument(skip(self, creds), fields(shop = %creds.domain))]
    pub async fn fetch_order_node(
        &self,
        creds: &ShopCredentials,
        gid: &str,
    ) -> Result<Value, ShopifyError> {
        let mut variables = Map::new();
        variables.insert("id".to_string(), json!(gid));

        let data = self.execute(creds, queries::ORDER_NODE, variables).await?;

        match data.get("node") {
            Some(node)
                if node.get("__typename").and_then(Value::as_str) == Some("Order") =>
            {
                Ok(node.clone())
            }
            _ => Err(ShopifyError::NotFound(gid.to_string())),
        }
    }

    /// Fetch one page of historical orders.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::execute`].
    #[instrument(skip(self, creds), fields(shop = %creds.domain))]
    pub async fn orders_page(
        &self,
        creds: &ShopCredentials,
        first: u32,
        after: Option<&str>,
        query: Option<&str>,
    ) -> Result<Page, ShopifyError> {
        let data = self
            .execute(creds, queries::ORDERS_PAGE, page_variables(first, after, query))
            .await?;
        Ok(extract_page(&data, "orders"))
    }

    /// Fetch one page of code discounts.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::execute`].
    #[instrument(skip(self, creds), fields(shop = %creds.domain))]
    pub async fn code_discounts_page(
        &self,
        creds: &ShopCredentials,
        first: u32,
        after: Option<&str>,
        query: Option<&str>,
    ) -> Result<Page, ShopifyError> {
        let data = self
            .execute(
                creds,
                &queries::code_discounts_page(),
                page_variables(first, after, query),
            )
            .await?;
        Ok(extract_page(&data, "codeDiscountNodes"))
    }

    /// Fetch one page of automatic discounts.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::execute`].
    #[instrument(skip(self, creds), fields(shop = %creds.domain))]
    pub async fn automatic_discounts_page(
        &self,
        creds: &ShopCredentials,
        first: u32,
        after: Option<&str>,
        query: Option<&str>,
    ) -> Result<Page, ShopifyError> {
        let data = self
            .execute(
                creds,
                &queries::automatic_discounts_page(),
                page_variables(first, after, query),
            )
            .await?;
        Ok(extract_page(&data, "automaticDiscountNodes"))
    }
}

fn page_variables(first: u32, after: Option<&str>, query: Option<&str>) -> Map<String, Value> {
    let mut variables = Map::new();
    variables.insert("first".to_string(), json!(first));
    variables.insert("after".to_string(), json!(after));
    variables.insert("query".to_string(), json!(query));
    variables
}

/// Pull `nodes` and `pageInfo` out of a connection field.
///
/// A missing or malformed connection yields an empty final page rather than
/// an error - sync treats it as "nothing more to fetch".
fn extract_page(data: &Value, connection: &str) -> Page {
    let conn = &data[connection];
    let nodes = conn
        .get("nodes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let page_info = &conn["pageInfo"];

    Page {
        nodes,
        has_next_page: page_info
            .get("hasNextPage")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        end_cursor: page_info
            .get("endCursor")
            .and_then(Value::as_str)
            .map(String::from),
    }
}
