//! Query strings in the JSON form accepted by Appwrite 1.5+, sent as repeated
//! `queries[]` parameters.

use serde_json::json;

pub(crate) const QUERY_PARAM: &str = "queries[]";

pub(crate) fn equal(attribute: &str, value: &str) -> String {
    json!({
        "method": "equal",
        "attribute": attribute,
        "values": [value],
    })
    .to_string()
}

pub(crate) fn order_desc(attribute: &str) -> String {
    json!({
        "method": "orderDesc",
        "attribute": attribute,
    })
    .to_string()
}

pub(crate) fn limit(limit: usize) -> String {
    json!({
        "method": "limit",
        "values": [limit],
    })
    .to_string()
}
