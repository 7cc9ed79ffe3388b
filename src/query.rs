//! Query string serialization
//!
//! Turns `{pageIndex, pageSize, filter}` into the query string sent with every
//! page request. The rules the backend expects:
//!
//! - a scalar becomes `key=value`, the value escaped like `encodeURIComponent`
//! - an array becomes one `key[]=item` segment per element
//! - a nested object is flattened into sibling segments, no key-path prefix
//! - falsy scalars (`""`, `0`, `false`, `null`) are dropped entirely

use crate::error::{Result, SearchError};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Field name → value mapping sent alongside the paging parameters
pub type Filter = Map<String, Value>;

/// Characters `encodeURIComponent` leaves untouched
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escape a value the way `encodeURIComponent` does
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Serialize the request for one page.
///
/// Paging parameters always come first, followed by the filter fields.
pub fn page_query(page_index: u32, page_size: u32, filter: &Filter) -> String {
    let mut segments = vec![
        format!("pageIndex={}", page_index),
        format!("pageSize={}", page_size),
    ];
    push_object(filter, &mut segments);
    segments.join("&")
}

/// Serialize an arbitrary object with the same rules
pub fn to_query_string(object: &Filter) -> String {
    let mut segments = Vec::new();
    push_object(object, &mut segments);
    segments.join("&")
}

fn push_object(object: &Filter, segments: &mut Vec<String>) {
    for (key, value) in object {
        push_value(key, value, segments);
    }
}

fn push_value(key: &str, value: &Value, segments: &mut Vec<String>) {
    match value {
        Value::Object(inner) => push_object(inner, segments),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Null => {}
                    Value::Object(inner) => push_object(inner, segments),
                    Value::Array(_) => push_value(key, item, segments),
                    scalar => {
                        if let Some(text) = scalar_text(scalar) {
                            segments.push(format!("{}[]={}", key, encode_component(&text)));
                        }
                    }
                }
            }
        }
        scalar => {
            if is_falsy(scalar) {
                return;
            }
            if let Some(text) = scalar_text(scalar) {
                segments.push(format!("{}={}", key, encode_component(&text)));
            }
        }
    }
}

/// Scalars the serializer omits
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a `key=value` command-line filter into `filter`.
///
/// `key[]=value` appends to an array under `key`; repeating it builds the list.
pub fn insert_filter_arg(filter: &mut Filter, arg: &str) -> Result<()> {
    let (key, value) = arg
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| SearchError::FilterArgument(arg.to_string()))?;

    if let Some(key) = key.strip_suffix("[]") {
        if key.is_empty() {
            return Err(SearchError::FilterArgument(arg.to_string()));
        }
        let slot = filter
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(Value::String(value.to_string())),
            other => *other = Value::Array(vec![Value::String(value.to_string())]),
        }
    } else {
        filter.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(value: Value) -> Filter {
        match value {
            Value::Object(map) => map,
            _ => panic!("filter must be an object"),
        }
    }

    #[test]
    fn empty_filter_yields_only_paging() {
        assert_eq!(page_query(1, 20, &Filter::new()), "pageIndex=1&pageSize=20");
    }

    #[test]
    fn arrays_expand_into_repeated_keys() {
        let f = filter(json!({ "ids": [1, 2] }));
        assert_eq!(to_query_string(&f), "ids[]=1&ids[]=2");
        assert_eq!(
            page_query(1, 20, &f),
            "pageIndex=1&pageSize=20&ids[]=1&ids[]=2"
        );
    }

    #[test]
    fn falsy_scalars_are_dropped() {
        let f = filter(json!({ "keyword": "", "count": 0, "active": false, "zone": null }));
        let query = page_query(1, 20, &f);
        assert!(!query.contains("keyword="));
        assert_eq!(query, "pageIndex=1&pageSize=20");
    }

    #[test]
    fn nested_objects_flatten_as_siblings() {
        let f = filter(json!({ "range": { "from": "2024-01-01", "to": "2024-02-01" } }));
        assert_eq!(to_query_string(&f), "from=2024-01-01&to=2024-02-01");
    }

    #[test]
    fn values_are_component_encoded() {
        let f = filter(json!({ "keyword": "fish & chips/50%" }));
        assert_eq!(to_query_string(&f), "keyword=fish%20%26%20chips%2F50%25");
        assert_eq!(encode_component("it's (ok)!*~"), "it's%20(ok)!*~");
        assert_eq!(encode_component("ñ"), "%C3%B1");
    }

    #[test]
    fn truthy_scalars_keep_their_text() {
        let f = filter(json!({ "active": true, "rate": 1.5, "zone": 7 }));
        assert_eq!(to_query_string(&f), "active=true&rate=1.5&zone=7");
    }

    #[test]
    fn null_array_elements_are_skipped() {
        let f = filter(json!({ "tags": ["a", null, "b"] }));
        assert_eq!(to_query_string(&f), "tags[]=a&tags[]=b");
    }

    #[test]
    fn filter_args_build_scalars_and_lists() {
        let mut f = Filter::new();
        insert_filter_arg(&mut f, "status=active").unwrap();
        insert_filter_arg(&mut f, "ids[]=1").unwrap();
        insert_filter_arg(&mut f, "ids[]=2").unwrap();
        assert_eq!(f["status"], json!("active"));
        assert_eq!(f["ids"], json!(["1", "2"]));

        assert!(insert_filter_arg(&mut f, "novalue").is_err());
        assert!(insert_filter_arg(&mut f, "=x").is_err());
        assert!(insert_filter_arg(&mut f, "[]=x").is_err());
    }

    #[test]
    fn filter_arg_value_may_contain_equals() {
        let mut f = Filter::new();
        insert_filter_arg(&mut f, "expr=a=b").unwrap();
        assert_eq!(f["expr"], json!("a=b"));
    }
}
