use reconcile_types::{env_first, ConfigError};

const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";
const TESTNET_RPC: &str = "https://api.testnet.solana.com";
const DEVNET_RPC: &str = "https://api.devnet.solana.com";

/// Environment variables consulted for the index endpoint, in order.
pub const INDEX_URL_ENV: &[&str] = &["RECONCILE_INDEX_URL", "HELIUS_DAS", "SOLANA_RPC"];

pub fn default_index_endpoint(network: &str) -> String {
    match network {
        "mainnet" | "mainnet-beta" => MAINNET_RPC.to_string(),
        "testnet" => TESTNET_RPC.to_string(),
        _ => DEVNET_RPC.to_string(),
    }
}

/// Pick the index endpoint: explicit flag, then environment, then the
/// network default.
///
/// Endpoints still carrying a `YOUR_KEY` placeholder are rejected up front;
/// otherwise every request would fail and the audit would read as partial.
pub fn resolve_index_endpoint(
    explicit: Option<&str>,
    network: &str,
) -> Result<String, ConfigError> {
    let endpoint = explicit
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| env_first(INDEX_URL_ENV))
        .unwrap_or_else(|| default_index_endpoint(network));

    if endpoint.contains("YOUR_KEY") {
        return Err(ConfigError::Invalid {
            field: "index endpoint",
            reason: "endpoint still contains the YOUR_KEY placeholder".to_string(),
        });
    }
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            field: "index endpoint",
            reason: format!("not an http(s) URL: {}", endpoint),
        });
    }
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        assert_eq!(default_index_endpoint("mainnet-beta"), MAINNET_RPC);
        assert_eq!(default_index_endpoint("testnet"), TESTNET_RPC);
        assert_eq!(default_index_endpoint("localnet"), DEVNET_RPC);
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let url = resolve_index_endpoint(Some(" http://127.0.0.1:9000 "), "mainnet").unwrap();
        assert_eq!(url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_placeholder_rejected() {
        let err = resolve_index_endpoint(
            Some("https://devnet.helius-rpc.com/?api-key=YOUR_KEY"),
            "devnet",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "index endpoint", .. }));
    }

    #[test]
    fn test_non_http_rejected() {
        assert!(resolve_index_endpoint(Some("ftp://x"), "devnet").is_err());
    }
}
