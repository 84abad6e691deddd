//! Projection of raw DAS asset records into [`Member`].
//!
//! DAS responses expose the same fact under several optional paths depending
//! on the asset standard and the indexer version. Each field below is read
//! from an ordered list of candidate paths; the first present value wins.
//!
//! | Field | Paths, in precedence order |
//! |-------|----------------------------|
//! | id | `id`, `asset_id` |
//! | membership | `grouping[group_key == key].verified` |
//! | token kind | `token_info.token_standard`, `interface` |
//! | symbol | `content.metadata.symbol`, `content.json.symbol` |
//! | name | `content.metadata.name`, `content.json.name` |
//! | royalty | `royalty.basis_points`, `content.metadata.seller_fee_basis_points` |
//! | creators | `royalty.creators`, `content.metadata.creators`, `creators` |
//! | metadata uri | `content.json_uri` |
//! | image uri | `content.links.image` |

use reconcile_types::{Creator, Member, MemberId};
use serde_json::Value;

/// Follow a dotted path of object keys.
fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

/// First non-null value among candidate paths.
fn first<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|p| at(value, p))
        .find(|v| !v.is_null())
}

fn first_str(value: &Value, paths: &[&[&str]]) -> Option<String> {
    first(value, paths)
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Numbers arrive as JSON numbers or, from some indexers, as strings.
fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_creator(raw: &Value) -> Option<Creator> {
    let address = raw
        .get("address")
        .and_then(|a| a.as_str())
        .or_else(|| {
            raw.get("addresses")
                .and_then(|a| a.get(0))
                .and_then(|a| a.as_str())
        })?
        .to_string();
    let verified = raw
        .get("verified")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let share = raw
        .get("share")
        .and_then(as_u64)
        .and_then(|s| u8::try_from(s).ok())
        .unwrap_or(0);
    Some(Creator {
        address,
        verified,
        share,
    })
}

/// Project one DAS asset into a [`Member`].
///
/// Total over any JSON value: returns `None` only when the record carries no
/// identifier at all, since such a record cannot be reported or repaired.
pub fn member_from_das(raw: &Value, group_key: &str) -> Option<Member> {
    let id = first_str(raw, &[&["id"], &["asset_id"]])?;
    if id.trim().is_empty() {
        return None;
    }

    let group = raw
        .get("grouping")
        .and_then(|g| g.as_array())
        .and_then(|groups| {
            groups
                .iter()
                .find(|g| g.get("group_key").and_then(|k| k.as_str()) == Some(group_key))
        });
    let membership_verified = group
        .and_then(|g| g.get("verified"))
        .and_then(|v| v.as_bool())
        == Some(true);
    let group_value = group
        .and_then(|g| g.get("group_value"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let token_kind = first(raw, &[&["token_info", "token_standard"], &["interface"]]).and_then(
        |v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        },
    );

    let royalty_bps = first(
        raw,
        &[
            &["royalty", "basis_points"],
            &["content", "metadata", "seller_fee_basis_points"],
        ],
    )
    .and_then(as_u64)
    .and_then(|bps| u16::try_from(bps).ok());

    let creators = first(
        raw,
        &[
            &["royalty", "creators"],
            &["content", "metadata", "creators"],
            &["creators"],
        ],
    )
    .and_then(|c| c.as_array())
    .map(|arr| arr.iter().filter_map(parse_creator).collect())
    .unwrap_or_default();

    Some(Member {
        id: MemberId::new(id),
        display_name: first_str(
            raw,
            &[&["content", "metadata", "name"], &["content", "json", "name"]],
        ),
        symbol: first_str(
            raw,
            &[
                &["content", "metadata", "symbol"],
                &["content", "json", "symbol"],
            ],
        ),
        royalty_bps,
        creators,
        metadata_uri: first_str(raw, &[&["content", "json_uri"]]).filter(|u| !u.is_empty()),
        image_uri: first_str(raw, &[&["content", "links", "image"]]).filter(|u| !u.is_empty()),
        membership_verified,
        group_key: group_key.to_string(),
        group_value,
        token_kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_paths() {
        let raw = json!({
            "id": "Mint1",
            "interface": "V1_NFT",
            "token_info": { "token_standard": "NonFungible" },
            "grouping": [
                { "group_key": "other", "group_value": "X", "verified": false },
                { "group_key": "collection", "group_value": "Col", "verified": true }
            ],
            "royalty": {
                "basis_points": 500,
                "creators": [{ "address": "Creator1", "share": 100, "verified": true }]
            },
            "content": {
                "json_uri": "ipfs://bafyXYZ/3.json",
                "metadata": { "name": "Mini #3", "symbol": "MNFT" },
                "links": { "image": "ipfs://bafyXYZ/3.png" }
            }
        });
        let m = member_from_das(&raw, "collection").unwrap();
        assert_eq!(m.id.as_str(), "Mint1");
        assert!(m.membership_verified);
        assert_eq!(m.group_value.as_deref(), Some("Col"));
        assert_eq!(m.token_kind.as_deref(), Some("NonFungible"));
        assert_eq!(m.display_name.as_deref(), Some("Mini #3"));
        assert_eq!(m.symbol.as_deref(), Some("MNFT"));
        assert_eq!(m.royalty_bps, Some(500));
        assert_eq!(m.creators, vec![Creator::new("Creator1", true, 100)]);
        assert_eq!(m.metadata_uri.as_deref(), Some("ipfs://bafyXYZ/3.json"));
        assert_eq!(m.image_uri.as_deref(), Some("ipfs://bafyXYZ/3.png"));
    }

    #[test]
    fn test_fallback_paths() {
        let raw = json!({
            "asset_id": "Mint2",
            "interface": "V1_NFT",
            "content": {
                "json": { "name": "Mini #4", "symbol": "MNFT" },
                "metadata": {
                    "seller_fee_basis_points": "250",
                    "creators": [{ "addresses": ["Creator1"], "share": 100 }]
                }
            }
        });
        let m = member_from_das(&raw, "collection").unwrap();
        assert_eq!(m.id.as_str(), "Mint2");
        assert!(!m.membership_verified);
        assert_eq!(m.group_value, None);
        assert_eq!(m.token_kind.as_deref(), Some("V1_NFT"));
        assert_eq!(m.display_name.as_deref(), Some("Mini #4"));
        assert_eq!(m.royalty_bps, Some(250));
        assert_eq!(m.creators, vec![Creator::new("Creator1", false, 100)]);
        assert_eq!(m.metadata_uri, None);
        assert_eq!(m.image_uri, None);
    }

    #[test]
    fn test_metadata_fields_take_precedence_over_json() {
        let raw = json!({
            "id": "Mint3",
            "content": {
                "metadata": { "name": "On-chain", "symbol": "A" },
                "json": { "name": "Off-chain", "symbol": "B" }
            }
        });
        let m = member_from_das(&raw, "collection").unwrap();
        assert_eq!(m.display_name.as_deref(), Some("On-chain"));
        assert_eq!(m.symbol.as_deref(), Some("A"));
    }

    #[test]
    fn test_top_level_creators_fallback() {
        let raw = json!({
            "id": "Mint4",
            "creators": [{ "address": "C", "share": 60, "verified": true }, { "share": 40 }]
        });
        let m = member_from_das(&raw, "collection").unwrap();
        assert_eq!(m.creators, vec![Creator::new("C", true, 60)]);
    }

    #[test]
    fn test_total_over_garbage() {
        assert!(member_from_das(&json!(null), "collection").is_none());
        assert!(member_from_das(&json!([1, 2]), "collection").is_none());
        assert!(member_from_das(&json!({ "id": "" }), "collection").is_none());

        let m = member_from_das(
            &json!({ "id": "X", "grouping": "nope", "royalty": { "basis_points": 99999 } }),
            "collection",
        )
        .unwrap();
        assert!(!m.membership_verified);
        assert_eq!(m.royalty_bps, None);
    }

    #[test]
    fn test_unverified_group_reads_false() {
        let raw = json!({
            "id": "X",
            "grouping": [{ "group_key": "collection", "group_value": "Col" }]
        });
        let m = member_from_das(&raw, "collection").unwrap();
        assert!(!m.membership_verified);
        assert!(m.is_linked_to("Col"));
    }
}
