//! Test utilities for DAS records.
//!
//! Provides a builder for raw `getAsset`/`getAssetsByGroup` item JSON so
//! tests and fake index servers do not hand-write nested records.

use serde_json::{json, Value};

/// Builder for creating raw DAS asset fixtures.
///
/// # Example
///
/// ```ignore
/// let raw = DasAssetBuilder::new("Mint1")
///     .collection("Col", true)
///     .name("Mini #1")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct DasAssetBuilder {
    id: String,
    interface: Option<String>,
    token_standard: Option<String>,
    collection: Option<(String, bool)>,
    name: Option<String>,
    symbol: Option<String>,
    royalty_bps: Option<u64>,
    creators: Vec<(String, bool, u8)>,
    json_uri: Option<String>,
    image: Option<String>,
}

impl DasAssetBuilder {
    /// Create a builder with only an id.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            interface: None,
            token_standard: None,
            collection: None,
            name: None,
            symbol: None,
            royalty_bps: None,
            creators: Vec::new(),
            json_uri: None,
            image: None,
        }
    }

    /// A record that satisfies a contract of
    /// `{symbol: MNFT, prefix: "Mini #", royalty: 500, cid: bafyXYZ, creator: Creator1}`.
    pub fn consistent(id: &str, collection: &str, index: u64) -> Self {
        Self::new(id)
            .interface("V1_NFT")
            .token_standard("NonFungible")
            .collection(collection, true)
            .name(&format!("Mini #{}", index))
            .symbol("MNFT")
            .royalty_bps(500)
            .creator("Creator1", true, 100)
            .json_uri(&format!("ipfs://bafyXYZ/{}.json", index))
    }

    pub fn interface(mut self, i: &str) -> Self {
        self.interface = Some(i.to_string());
        self
    }

    pub fn token_standard(mut self, t: &str) -> Self {
        self.token_standard = Some(t.to_string());
        self
    }

    pub fn collection(mut self, value: &str, verified: bool) -> Self {
        self.collection = Some((value.to_string(), verified));
        self
    }

    pub fn name(mut self, n: &str) -> Self {
        self.name = Some(n.to_string());
        self
    }

    pub fn symbol(mut self, s: &str) -> Self {
        self.symbol = Some(s.to_string());
        self
    }

    pub fn royalty_bps(mut self, bps: u64) -> Self {
        self.royalty_bps = Some(bps);
        self
    }

    pub fn creator(mut self, address: &str, verified: bool, share: u8) -> Self {
        self.creators.push((address.to_string(), verified, share));
        self
    }

    pub fn json_uri(mut self, uri: &str) -> Self {
        self.json_uri = Some(uri.to_string());
        self
    }

    pub fn image(mut self, uri: &str) -> Self {
        self.image = Some(uri.to_string());
        self
    }

    pub fn build(self) -> Value {
        let grouping: Vec<Value> = self
            .collection
            .into_iter()
            .map(|(value, verified)| {
                json!({ "group_key": "collection", "group_value": value, "verified": verified })
            })
            .collect();
        let creators: Vec<Value> = self
            .creators
            .into_iter()
            .map(|(address, verified, share)| {
                json!({ "address": address, "verified": verified, "share": share })
            })
            .collect();

        let mut metadata = serde_json::Map::new();
        if let Some(name) = self.name {
            metadata.insert("name".to_string(), Value::String(name));
        }
        if let Some(symbol) = self.symbol {
            metadata.insert("symbol".to_string(), Value::String(symbol));
        }
        let mut links = serde_json::Map::new();
        if let Some(image) = self.image {
            links.insert("image".to_string(), Value::String(image));
        }

        let mut asset = json!({
            "id": self.id,
            "grouping": grouping,
            "royalty": { "basis_points": self.royalty_bps, "creators": creators },
            "content": {
                "json_uri": self.json_uri,
                "metadata": metadata,
                "links": links,
            },
        });
        if let Some(interface) = self.interface {
            asset["interface"] = Value::String(interface);
        }
        if let Some(standard) = self.token_standard {
            asset["token_info"] = json!({ "token_standard": standard });
        }
        asset
    }
}

/// Wrap items in a successful `getAssetsByGroup` JSON-RPC response.
pub fn group_page_response(page: u32, items: Vec<Value>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "reconcile-group",
        "result": { "total": items.len(), "limit": 1000, "page": page, "items": items },
    })
}

/// A JSON-RPC error response (no `result`).
pub fn error_response(code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "reconcile",
        "error": { "code": code, "message": message },
    })
}
