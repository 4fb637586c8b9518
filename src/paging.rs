//! Generic pagination over Platform API list endpoints
//!
//! Two interchangeable strategies, selected per resource:
//!
//! - **Bounded**: page-number/page-count responses (`entities[]` +
//!   `pageCount`). The loop trusts the page count reported by the most recent
//!   page, so a count of 0 or 1 still costs exactly one fetch.
//! - **Cursor**: opaque-continuation responses (a named array field plus an
//!   optional `cursor` string). Iteration ends when the `cursor` field is
//!   entirely absent; an empty string still continues.
//!
//! Both produce a lazy, finite stream of record batches; a fresh call starts
//! a fresh stream. Built with `stream::unfold` so the only suspension points
//! are the network calls themselves.

use futures_util::stream::{self, Stream};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use crate::config::MAX_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::validate::{self, FieldKind, FieldSpec};

/// One page worth of records
pub type Batch = Vec<Value>;

/// Lazy sequence of record batches
pub type BatchStream = Pin<Box<dyn Stream<Item = Result<Batch>> + Send>>;

const PAGE_SPECS: &[FieldSpec] = &[
    FieldSpec::new("entities", FieldKind::Array),
    FieldSpec::new("pageCount", FieldKind::Number),
];

const CURSOR_SPEC: FieldSpec = FieldSpec::new("cursor", FieldKind::String);

/// Reject page sizes the platform would refuse.
pub(crate) fn ensure_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(Error::PageSizeOutOfBounds {
            got: page_size,
            max: MAX_PAGE_SIZE,
        });
    }
    Ok(())
}

/// Bounded (page-number/page-count) pagination.
///
/// `fetch` receives `(page_number, page_size)` with page numbers starting
/// at 1 and must return the raw response body.
pub(crate) fn page_stream<F, Fut>(page_size: u32, fetch: F) -> Result<BatchStream>
where
    F: Fn(u32, u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    ensure_page_size(page_size)?;

    // (last fetched page, page count reported by that page, done)
    let stream = stream::unfold(
        (0u32, 0u32, false),
        move |(current_page, page_count, done)| {
            let fut = if done || (current_page > 0 && current_page >= page_count) {
                None
            } else {
                Some(fetch(current_page + 1, page_size))
            };

            async move {
                let body = match fut?.await {
                    Ok(body) => body,
                    Err(e) => return Some((Err(e), (current_page, page_count, true))),
                };

                if let Err(e) = validate::require(&body, PAGE_SPECS) {
                    return Some((Err(e), (current_page, page_count, true)));
                }

                let entities = match validate::array_at(&body, "entities") {
                    Ok(entities) => entities,
                    Err(e) => return Some((Err(e), (current_page, page_count, true))),
                };
                let reported = body["pageCount"].as_u64().unwrap_or(0) as u32;

                let page = current_page + 1;
                debug!(
                    "fetched page {} of {} ({} records)",
                    page,
                    reported,
                    entities.len()
                );
                Some((Ok(entities), (page, reported, false)))
            }
        },
    );

    Ok(Box::pin(stream))
}

/// Cursor-continuation pagination.
///
/// `fetch` receives `(cursor, page_size)`; `array_field` names the record
/// array in the response, which some resources legitimately omit on empty
/// pages (the batch then defaults to empty).
pub(crate) fn cursor_stream<F, Fut>(
    array_field: &'static str,
    page_size: u32,
    fetch: F,
) -> Result<BatchStream>
where
    F: Fn(Option<String>, u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    ensure_page_size(page_size)?;

    // (continuation cursor, fetched at least once, done)
    let stream = stream::unfold(
        (None::<String>, false, false),
        move |(cursor, started, done)| {
            let fut = if done || (started && cursor.is_none()) {
                None
            } else {
                Some(fetch(cursor, page_size))
            };

            async move {
                let body = match fut?.await {
                    Ok(body) => body,
                    Err(e) => return Some((Err(e), (None, true, true))),
                };

                let batch = match cursor_batch(&body, array_field) {
                    Ok(batch) => batch,
                    Err(e) => return Some((Err(e), (None, true, true))),
                };
                let next_cursor = match validate::optional(&body, &CURSOR_SPEC) {
                    Ok(value) => value.and_then(Value::as_str).map(str::to_string),
                    Err(e) => return Some((Err(e), (None, true, true))),
                };

                debug!(
                    "fetched cursor page ({} records, continuation: {})",
                    batch.len(),
                    next_cursor.is_some()
                );
                Some((Ok(batch), (next_cursor, true, false)))
            }
        },
    );

    Ok(Box::pin(stream))
}

/// Extract the record array of a cursor response, tolerating its absence.
pub(crate) fn cursor_batch(body: &Value, array_field: &'static str) -> Result<Batch> {
    match validate::optional(body, &FieldSpec::new(array_field, FieldKind::Array))? {
        Some(value) => Ok(value.as_array().cloned().unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_page_size_bounds() {
        assert!(ensure_page_size(1).is_ok());
        assert!(ensure_page_size(MAX_PAGE_SIZE).is_ok());
        assert!(matches!(
            ensure_page_size(0),
            Err(Error::PageSizeOutOfBounds { got: 0, .. })
        ));
        assert!(ensure_page_size(MAX_PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn test_cursor_batch_defaults_to_empty() {
        let body = serde_json::json!({ "cursor": "abc" });
        assert!(cursor_batch(&body, "conversations").unwrap().is_empty());

        let body = serde_json::json!({ "conversations": [1, 2, 3] });
        assert_eq!(cursor_batch(&body, "conversations").unwrap().len(), 3);

        // Present with the wrong type is an error, not an empty batch
        let body = serde_json::json!({ "conversations": "nope" });
        assert!(cursor_batch(&body, "conversations").is_err());
    }
}
