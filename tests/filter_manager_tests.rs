//! Filter manager workflows against a filter export on disk

mod common;

use common::{create_query_filter, read_filter_export, write_filter_export};
use gmail_filter_templates::display::FilterPrinter;
use gmail_filter_templates::error::GmailError;
use gmail_filter_templates::filter_manager::FilterManager;
use gmail_filter_templates::filter_store::JsonFilterStore;
use gmail_filter_templates::models::CriteriaField;
use regex::Regex;
use tempfile::TempDir;

fn manager_for(path: &std::path::Path) -> FilterManager {
    FilterManager::new(Box::new(JsonFilterStore::load(path).unwrap()))
}

#[test]
fn test_template_update_commits_to_export() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_filter_export(
        temp_dir.path(),
        &[
            create_query_filter("p", "{(M3TAP receipts) subject:(receipt OR invoice)}"),
            create_query_filter("f1", "from:shop.example.com {(M3TA receipts) subject:receipt}"),
            create_query_filter("f2", "from:bank.example.com {(M3TA receipts) old}"),
            create_query_filter("other", "label:misc"),
        ],
    );

    let mut manager = manager_for(&path);
    let updates = manager.plan_template_updates().unwrap();
    let ids: Vec<&str> = updates.iter().map(|u| u.id()).collect();
    assert_eq!(ids, vec!["f1", "f2"]);

    assert_eq!(manager.apply_updates(&updates).unwrap(), 2);

    let written = read_filter_export(&path);
    assert_eq!(written.len(), 4);
    assert_eq!(
        written[1].criteria.query.as_deref(),
        Some("from:shop.example.com {(M3TA receipts) subject:(receipt OR invoice)}")
    );
    assert_eq!(
        written[2].criteria.query.as_deref(),
        Some("from:bank.example.com {(M3TA receipts) subject:(receipt OR invoice)}")
    );
    // Actions are carried over untouched
    assert_eq!(written[2].action.add_label_ids, vec!["Label_f2"]);

    // Nothing left to do
    let manager = manager_for(&path);
    assert!(manager.plan_template_updates().unwrap().is_empty());
}

#[test]
fn test_template_error_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_filter_export(
        temp_dir.path(),
        &[
            create_query_filter("p", "{(M3TAP a) new}"),
            create_query_filter("f", "{(M3TA a) old} {(M3TA b) old}"),
        ],
    );
    let before = std::fs::read_to_string(&path).unwrap();

    let manager = manager_for(&path);
    let err = manager.plan_template_updates().unwrap_err();
    assert!(err.is_filter_content_error());
    assert!(err.to_string().contains("[b]"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_unparseable_query_names_filter() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_filter_export(
        temp_dir.path(),
        &[create_query_filter("broken", "subject:(a OR b")],
    );

    let manager = manager_for(&path);
    match manager.plan_template_updates() {
        Err(GmailError::QueryParse { filter_id, source }) => {
            assert_eq!(filter_id, "broken");
            assert_eq!(source.index(), 8);
        }
        other => panic!("expected QueryParse, got {:?}", other),
    }
}

#[test]
fn test_replace_and_list() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_filter_export(
        temp_dir.path(),
        &[
            create_query_filter("1", "from:(alice@old.example.com)"),
            create_query_filter("2", "from:(bob@new.example.com)"),
        ],
    );

    let mut manager = manager_for(&path);
    let pattern = Regex::new(r"@old\.example\.com").unwrap();
    let updates = manager
        .plan_replacements(CriteriaField::Query, &pattern, "@new.example.com")
        .unwrap();
    assert_eq!(updates.len(), 1);

    let diff = FilterPrinter::new(false).format_update(&updates[0]);
    assert_eq!(
        diff,
        [
            "Filter 1",
            "-  query: from:(alice@old.example.com)",
            "+  query: from:(alice@new.example.com)",
            "  -> AddLabelIds: Label_1",
        ]
        .join("\n")
    );

    manager.apply_updates(&updates).unwrap();

    let manager = manager_for(&path);
    let pattern = Regex::new("new\\.example").unwrap();
    assert_eq!(manager.list_filters(Some(&pattern)).unwrap().len(), 2);
}
