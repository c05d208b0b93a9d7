//! Pulls named values out of a JSON response body by dot-path.

use crate::models::{Context, ContextValue};
use serde_json::{Map, Value};

/// Runs every `name -> path` pair of `spec` against `body`.
///
/// A path that does not resolve is left out of the result without affecting
/// the other pairs. A spec or body that is not JSON yields an empty context.
pub fn extract(spec: &str, body: &str) -> Context {
    let Ok(spec) = serde_json::from_str::<Map<String, Value>>(spec) else {
        tracing::debug!("Extraction spec is not a JSON object, skipping extraction");
        return Context::empty();
    };
    let Ok(document) = serde_json::from_str::<Value>(body) else {
        tracing::debug!("Response body is not JSON, skipping extraction");
        return Context::empty();
    };

    spec.into_iter()
        .filter_map(|(name, path)| {
            let path = path.as_str()?;
            let leaf = lookup(&document, path)?;
            Some((name, ContextValue::from_json(leaf.clone())))
        })
        .collect()
}

/// Walks `path` through `document`. All-digit segments index arrays, every
/// other segment names an object field.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |node, segment| {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            let index: usize = segment.parse().ok()?;
            node.as_array()?.get(index)
        } else {
            node.as_object()?.get(segment)
        }
    })
}
