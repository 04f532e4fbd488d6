//! Query-string mapping for filter state.
//!
//! | query      | field               |
//! |------------|---------------------|
//! | `search`   | `search_query`      |
//! | `category` | `selected_category` |
//! | `price`    | `selected_price`    |
//! | `sort`     | `sort_by`, omitted when it is the default |
//! | `keywords` | `selected_keywords`, one pair per keyword |

use serde_json::Value;
use url::form_urlencoded;

use crate::cache::{encode_query, Params};
use crate::filters::{FilterPatch, FilterState, DEFAULT_SORT};

/// Builds request params from the active filters.
pub fn to_query_params(filters: &FilterState) -> Params {
    let mut params = Params::new();
    let mut put = |name: &str, value: &str| {
        if !value.is_empty() {
            params.insert(name.to_string(), Value::String(value.to_string()));
        }
    };

    put("search", &filters.search_query);
    put("category", &filters.selected_category);
    put("price", &filters.selected_price);
    if filters.sort_by != DEFAULT_SORT {
        put("sort", &filters.sort_by);
    }
    if !filters.selected_keywords.is_empty() {
        params.insert(
            "keywords".to_string(),
            Value::Array(
                filters
                    .selected_keywords
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
    }
    params
}

pub fn to_query_string(filters: &FilterState) -> String {
    encode_query(&to_query_params(filters))
}

// == Parsing ==
/// Reads a patch from decoded query pairs.
///
/// Unknown names and empty values are ignored. A single `keywords` value
/// becomes a one-element selection; repeated ones are collected in order.
pub fn patch_from_query<I, K, V>(pairs: I) -> FilterPatch
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut patch = FilterPatch::default();
    let mut keywords: Vec<String> = Vec::new();

    for (name, value) in pairs {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        let slot = match name.as_ref() {
            "search" => &mut patch.search_query,
            "category" => &mut patch.selected_category,
            "price" => &mut patch.selected_price,
            "sort" => &mut patch.sort_by,
            "keywords" => {
                keywords.push(value.to_string());
                continue;
            }
            _ => continue,
        };
        slot.get_or_insert_with(|| value.to_string());
    }

    if !keywords.is_empty() {
        patch.selected_keywords = Some(keywords);
    }
    patch
}

/// Parses a raw `a=b&c=d` query string, with or without a leading `?`.
pub fn patch_from_query_string(query: &str) -> FilterPatch {
    let query = query.strip_prefix('?').unwrap_or(query);
    patch_from_query(form_urlencoded::parse(query.as_bytes()))
}
