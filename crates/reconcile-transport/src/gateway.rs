//! Metadata reachability checks before a URI rewrite.
//!
//! A retarget points every member at `{base}/{cid}/{n}.json`. If the template
//! is wrong, every member ends up pointing at nothing. Before submitting a
//! rewrite the new URI is fetched: it must serve JSON with a non-empty
//! `image` string. The image itself is requested with `HEAD` (then `GET`) on a
//! best-effort basis; gateways are often slow to serve fresh pins.
//!
//! `ipfs://` URIs are read through an HTTP gateway.

use async_trait::async_trait;
use reconcile_types::{env_non_empty, env_var_or};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Gateway used for `ipfs://` URIs when none is configured.
pub const DEFAULT_IPFS_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs";

/// Environment variable overriding [`DEFAULT_IPFS_GATEWAY`].
pub const IPFS_GATEWAY_ENV: &str = "RECONCILE_IPFS_GATEWAY";

/// What a successful check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataCheck {
    pub image: String,
    /// False when the image did not answer; not fatal.
    pub image_reachable: bool,
}

/// The metadata behind a URI is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriCheckError {
    pub uri: String,
    pub detail: String,
}

impl UriCheckError {
    fn new(uri: &str, detail: impl Into<String>) -> Self {
        Self {
            uri: uri.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for UriCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.uri, self.detail)
    }
}

impl std::error::Error for UriCheckError {}

/// Confirms a metadata URI is worth pointing members at.
#[async_trait]
pub trait MetadataChecker: Send + Sync {
    async fn check_metadata(&self, uri: &str) -> Result<MetadataCheck, UriCheckError>;
}

#[async_trait]
impl<T: MetadataChecker + ?Sized> MetadataChecker for std::sync::Arc<T> {
    async fn check_metadata(&self, uri: &str) -> Result<MetadataCheck, UriCheckError> {
        (**self).check_metadata(uri).await
    }
}

/// HTTP metadata checker.
#[derive(Clone)]
pub struct GatewayClient {
    gateway: String,
    agent: ureq::Agent,
}

impl GatewayClient {
    const DEFAULT_TIMEOUT_SECS: u64 = 20;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Create a checker reading `ipfs://` URIs through `gateway`.
    pub fn new(gateway: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(env_var_or(
                "RECONCILE_GATEWAY_TIMEOUT_SECS",
                Self::DEFAULT_TIMEOUT_SECS,
            )))
            .timeout_connect(Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS))
            .build();
        Self {
            gateway: gateway.trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// Gateway from the flag, then [`IPFS_GATEWAY_ENV`], then the default.
    pub fn resolve(explicit: Option<&str>) -> Self {
        let gateway = explicit
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .or_else(|| env_non_empty(IPFS_GATEWAY_ENV))
            .unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string());
        Self::new(&gateway)
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// HTTP form of `uri`.
    pub fn to_http(&self, uri: &str) -> String {
        match uri.strip_prefix("ipfs://") {
            Some(rest) => format!("{}/{}", self.gateway, rest.trim_start_matches('/')),
            None => uri.to_string(),
        }
    }

    fn answers(&self, url: &str) -> bool {
        self.agent.head(url).call().is_ok() || self.agent.get(url).call().is_ok()
    }

    /// Fetch and validate the metadata behind `uri` (blocking).
    pub fn fetch_metadata(&self, uri: &str) -> Result<MetadataCheck, UriCheckError> {
        let url = self.to_http(uri);
        let metadata: Value = match self.agent.get(&url).call() {
            Ok(resp) => resp
                .into_json()
                .map_err(|e| UriCheckError::new(uri, format!("metadata is not JSON: {}", e)))?,
            Err(ureq::Error::Status(code, _)) => {
                return Err(UriCheckError::new(uri, format!("HTTP {} at {}", code, url)))
            }
            Err(e) => return Err(UriCheckError::new(uri, format!("fetch failed: {}", e))),
        };

        let image = metadata
            .get("image")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| UriCheckError::new(uri, "metadata has no image field"))?
            .to_string();

        let image_reachable = self.answers(&self.to_http(&image));
        debug!(uri = %uri, image = %image, image_reachable, "metadata checked");
        Ok(MetadataCheck {
            image,
            image_reachable,
        })
    }
}

#[async_trait]
impl MetadataChecker for GatewayClient {
    async fn check_metadata(&self, uri: &str) -> Result<MetadataCheck, UriCheckError> {
        let client = self.clone();
        let uri = uri.to_string();
        let fallback = uri.clone();
        tokio::task::spawn_blocking(move || client.fetch_metadata(&uri))
            .await
            .map_err(|e| UriCheckError::new(&fallback, format!("check task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipfs_uris_go_through_gateway() {
        let client = GatewayClient::new("https://gw.example/ipfs/");
        assert_eq!(client.gateway(), "https://gw.example/ipfs");
        assert_eq!(
            client.to_http("ipfs://bafyNEW/3.json"),
            "https://gw.example/ipfs/bafyNEW/3.json"
        );
        assert_eq!(
            client.to_http("https://other.example/1.json"),
            "https://other.example/1.json"
        );
    }

    #[test]
    fn test_explicit_gateway_wins() {
        let client = GatewayClient::resolve(Some(" http://127.0.0.1:8080/ipfs "));
        assert_eq!(client.gateway(), "http://127.0.0.1:8080/ipfs");
    }

    #[test]
    fn test_unreachable_metadata_is_an_error() {
        let client = GatewayClient::new("http://127.0.0.1:9");
        let err = client.fetch_metadata("ipfs://bafyNEW/1.json").unwrap_err();
        assert_eq!(err.uri, "ipfs://bafyNEW/1.json");
        assert!(err.detail.contains("fetch failed"), "{}", err.detail);
    }
}
