//! Common test utilities and fixtures
#![allow(dead_code)]

use gmail_filter_templates::element::FilterElement;
use gmail_filter_templates::models::{FilterAction, FilterCriteria, GmailFilter};
use gmail_filter_templates::parser::parse;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Parse a batch of `(id, query)` pairs
pub fn parse_batch(filters: &[(&str, &str)]) -> BTreeMap<String, FilterElement> {
    filters
        .iter()
        .map(|(id, query)| {
            let tree = parse(query).unwrap_or_else(|e| panic!("{:?}: {}", query, e));
            (id.to_string(), tree)
        })
        .collect()
}

/// Render every tree of a batch back to its query
pub fn render_batch(trees: &BTreeMap<String, FilterElement>) -> BTreeMap<String, String> {
    trees
        .iter()
        .map(|(id, tree)| (id.clone(), tree.render()))
        .collect()
}

pub fn expected_batch(filters: &[(&str, &str)]) -> BTreeMap<String, String> {
    filters
        .iter()
        .map(|(id, query)| (id.to_string(), query.to_string()))
        .collect()
}

/// Filter with only a query and a label action
pub fn create_query_filter(id: &str, query: &str) -> GmailFilter {
    GmailFilter {
        id: id.to_string(),
        criteria: FilterCriteria {
            query: Some(query.to_string()),
            ..Default::default()
        },
        action: FilterAction {
            add_label_ids: vec![format!("Label_{}", id)],
            ..Default::default()
        },
    }
}

/// Write filters as a settings list response (`{"filter": [...]}`)
pub fn write_filter_export(dir: &Path, filters: &[GmailFilter]) -> PathBuf {
    let path = dir.join("filters.json");
    let body = serde_json::json!({ "filter": filters });
    std::fs::write(&path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    path
}

pub fn read_filter_export(path: &Path) -> Vec<GmailFilter> {
    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    serde_json::from_value(body["filter"].clone()).unwrap()
}

/// Query text with no template markers
pub fn plain_word() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        "(from|to|subject|label):[a-z@.]{1,8}",
        "-[a-z]{1,4}",
        "é[a-z]{0,2}",
    ]
}

/// Balanced criteria strings: words, quoted text and nested groups with
/// arbitrary ASCII whitespace between them
pub fn balanced_query() -> impl Strategy<Value = String> {
    let ws = "[ \t]{0,2}";
    let leaf = prop_oneof![
        plain_word(),
        "\"[a-z (){}]{0,6}\"",
    ];
    let token = leaf.prop_recursive(4, 32, 4, move |inner| {
        prop_oneof![
            (prop::collection::vec((inner.clone(), ws), 0..4), ws).prop_map(|(items, lead)| {
                let body: String = items.into_iter().map(|(t, w)| t + &w).collect();
                format!("({}{})", lead, body)
            }),
            (prop::collection::vec((inner, ws), 0..4), ws).prop_map(|(items, lead)| {
                let body: String = items.into_iter().map(|(t, w)| t + &w).collect();
                format!("{{{}{}}}", lead, body)
            }),
        ]
    });
    (ws, prop::collection::vec((token, ws), 0..5)).prop_map(|(lead, items)| {
        let body: String = items.into_iter().map(|(t, w)| t + &w).collect();
        lead + &body
    })
}
