//! DAS (Digital Asset Standard) JSON-RPC client.
//!
//! Speaks the two read methods the reconciler needs:
//!
//! - `getAssetsByGroup` for paginated collection membership
//! - `getAsset` for single-member lookups while waiting out propagation
//!
//! Both ask for unverified collection links too
//! (`showUnverifiedCollections`), otherwise unverified members would vanish
//! from the very audit meant to find them.
//!
//! ## Usage
//!
//! ```ignore
//! let client = DasClient::new("https://devnet.helius-rpc.com/?api-key=...");
//! let page = client.fetch_group_page(&GroupQuery::collection("BgfA..."), 1)?;
//! let member = client.fetch_asset(&MemberId::new("2wmp..."))?;
//! ```

use async_trait::async_trait;
use reconcile_types::{env_var_or, Member, MemberId, COLLECTION_GROUP_KEY};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::index::{GroupPage, GroupQuery, IndexClient, IndexUnavailable};
use crate::normalize::member_from_das;

/// JSON-RPC client for a DAS-capable index endpoint.
#[derive(Clone)]
pub struct DasClient {
    endpoint: String,
    group_key: String,
    agent: ureq::Agent,
}

impl DasClient {
    /// Default request timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds (can be overridden by env).
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    fn default_timeouts() -> (Duration, Duration) {
        (
            Duration::from_secs(env_var_or(
                "RECONCILE_INDEX_TIMEOUT_SECS",
                Self::DEFAULT_TIMEOUT_SECS,
            )),
            Duration::from_secs(env_var_or(
                "RECONCILE_INDEX_CONNECT_TIMEOUT_SECS",
                Self::DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        )
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    /// Create a client with timeouts taken from the environment.
    pub fn new(endpoint: &str) -> Self {
        let (timeout, connect_timeout) = Self::default_timeouts();
        Self::with_timeouts(endpoint, timeout, connect_timeout)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(endpoint: &str, timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            group_key: COLLECTION_GROUP_KEY.to_string(),
            agent: Self::build_agent(timeout, connect_timeout),
        }
    }

    /// Group key used when normalizing single-asset lookups.
    pub fn with_group_key(mut self, group_key: &str) -> Self {
        self.group_key = group_key.to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute one JSON-RPC call and return its `result` payload.
    ///
    /// A response without `result` (an `error` object, or `null`) is reported
    /// with the raw response body so the operator sees what the index said.
    fn rpc(&self, id: &str, method: &str, params: Value) -> Result<Value, IndexUnavailable> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: Value = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(&body)
        {
            Ok(resp) => resp.into_json().map_err(|e| {
                IndexUnavailable::new(format!("{} response is not JSON: {}", method, e))
            })?,
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                return Err(IndexUnavailable::new(format!(
                    "{} returned HTTP {}: {}",
                    method,
                    code,
                    text.trim()
                )));
            }
            Err(e) => {
                return Err(IndexUnavailable::new(format!(
                    "{} request failed: {}",
                    method, e
                )))
            }
        };

        match response.get("result") {
            Some(result) if !result.is_null() => Ok(result.clone()),
            _ => Err(IndexUnavailable::new(format!(
                "{} returned no result: {}",
                method, response
            ))),
        }
    }

    /// Fetch one page of group members (blocking).
    pub fn fetch_group_page(
        &self,
        query: &GroupQuery,
        page: u32,
    ) -> Result<GroupPage, IndexUnavailable> {
        let params = json!({
            "groupKey": query.group_key,
            "groupValue": query.group_value,
            "page": page,
            "limit": query.page_size,
            "sortBy": { "sortBy": "created", "sortDirection": "asc" },
            "displayOptions": { "showUnverifiedCollections": true },
        });
        let result = self.rpc("reconcile-group", "getAssetsByGroup", params)?;

        let raw_items = result
            .get("items")
            .and_then(|i| i.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let items: Vec<Member> = raw_items
            .iter()
            .filter_map(|raw| member_from_das(raw, &query.group_key))
            .collect();
        if items.len() < raw_items.len() {
            debug!(
                page = page,
                dropped = raw_items.len() - items.len(),
                "dropped index records without an id"
            );
        }

        Ok(GroupPage {
            received: raw_items.len(),
            items,
            cursor: result
                .get("cursor")
                .and_then(|c| c.as_str())
                .map(String::from),
        })
    }

    /// Fetch a single asset (blocking).
    pub fn fetch_asset(&self, id: &MemberId) -> Result<Member, IndexUnavailable> {
        let params = json!({
            "id": id.as_str(),
            "displayOptions": { "showUnverifiedCollections": true },
        });
        let result = self.rpc("reconcile-asset", "getAsset", params)?;
        member_from_das(&result, &self.group_key)
            .ok_or_else(|| IndexUnavailable::new(format!("asset {} has no id in response", id)))
    }
}

#[async_trait]
impl IndexClient for DasClient {
    async fn query_group_page(
        &self,
        query: &GroupQuery,
        page: u32,
    ) -> Result<GroupPage, IndexUnavailable> {
        let client = self.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || client.fetch_group_page(&query, page))
            .await
            .map_err(|e| IndexUnavailable::new(format!("index task failed: {}", e)))?
    }

    async fn query_asset(&self, id: &MemberId) -> Result<Member, IndexUnavailable> {
        let client = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || client.fetch_asset(&id))
            .await
            .map_err(|e| IndexUnavailable::new(format!("index task failed: {}", e)))?
    }
}
