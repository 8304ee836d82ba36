//! Encoding of bulk request bodies and decoding of bulk responses.

use serde_json::{json, Value};

use crate::errors::SearchError;
use crate::types::{BulkItem, BulkItemOutcome, BulkResponse};

/// Build the NDJSON lines of a bulk request: one action line and one
/// document line per item.
pub(crate) fn build_bulk_body(items: &[BulkItem]) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() * 2);
    for item in items {
        let mut action = serde_json::Map::new();
        action.insert(
            item.action.as_str().to_string(),
            json!({
                "_index": item.index,
                "_id": item.document_id,
            }),
        );
        lines.push(Value::Object(action).to_string());
        lines.push(item.body.clone());
    }
    lines
}

/// Parse the JSON body of a bulk response.
pub(crate) fn parse_bulk_response(body: &Value) -> Result<BulkResponse, SearchError> {
    let items = body
        .get("items")
        .and_then(|items| items.as_array())
        .ok_or_else(|| SearchError::parse("Bulk response is missing the items array"))?;

    let items = items
        .iter()
        .map(parse_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BulkResponse {
        took: body.get("took").and_then(|t| t.as_u64()).unwrap_or(0),
        errors: body.get("errors").and_then(|e| e.as_bool()).unwrap_or(false),
        items,
    })
}

/// Each item is an object keyed by its action name.
fn parse_item(item: &Value) -> Result<BulkItemOutcome, SearchError> {
    let result = item
        .as_object()
        .and_then(|object| object.values().next())
        .ok_or_else(|| SearchError::parse(format!("Unexpected bulk item: {}", item)))?;

    let status = result
        .get("status")
        .and_then(|s| s.as_u64())
        .ok_or_else(|| SearchError::parse(format!("Bulk item without status: {}", item)))?;
    let status = u16::try_from(status)
        .map_err(|_| SearchError::parse(format!("Bulk item status out of range: {}", item)))?;

    let error = result.get("error").map(|error| match error {
        Value::String(reason) => reason.clone(),
        other => other
            .get("reason")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    });

    Ok(BulkItemOutcome {
        index: string_field(result, "_index"),
        document_id: string_field(result, "_id"),
        status,
        error,
    })
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
