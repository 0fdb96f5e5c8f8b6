//! Terminal rendering of filters and planned filter changes
use crate::filter_manager::FilterUpdate;
use crate::models::{CriteriaField, FilterAction, FilterCriteria, GmailFilter};
use std::collections::HashMap;

mod colors {
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

const CRITERIA_ORDER: [&str; 9] = [
    "from",
    "to",
    "subject",
    "query",
    "negatedQuery",
    "hasAttachment",
    "excludeChats",
    "size",
    "sizeComparison",
];

const MISSING_VALUE: &str = "<None>";

/// Formats filters, optionally with ANSI colors
#[derive(Debug, Clone, Copy)]
pub struct FilterPrinter {
    color: bool,
}

impl FilterPrinter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, colors::RESET)
        } else {
            text.to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint(colors::BOLD, text)
    }

    /// Filter header, one line per set criterion, then its actions
    pub fn format_filter(&self, filter: &GmailFilter) -> String {
        let mut lines = vec![format!("Filter {}", filter.id)];
        for (name, value) in filter.criteria.entries() {
            lines.push(format!("  {}: {}", name, value));
        }
        lines.extend(action_lines(&filter.action));
        lines.join("\n")
    }

    /// Like [`FilterPrinter::format_filter`], with changed criteria shown as
    /// removed and added lines
    pub fn format_update(&self, update: &FilterUpdate) -> String {
        let old = criteria_map(&update.original.criteria);
        let new = criteria_map(&update.updated.criteria);
        let changed: Vec<&str> = update
            .changed_fields()
            .into_iter()
            .map(CriteriaField::as_str)
            .collect();

        let mut lines = vec![format!("Filter {}", update.original.id)];
        for name in CRITERIA_ORDER {
            if !old.contains_key(name) && !new.contains_key(name) {
                continue;
            }
            let old_value = old.get(name).map(String::as_str).unwrap_or(MISSING_VALUE);
            let new_value = new.get(name).map(String::as_str).unwrap_or(MISSING_VALUE);
            if !changed.contains(&name) {
                lines.push(format!("  {}: {}", name, old_value));
            } else {
                lines.push(self.paint(colors::RED, &format!("-  {}: {}", name, old_value)));
                lines.push(self.paint(colors::GREEN, &format!("+  {}: {}", name, new_value)));
            }
        }
        lines.extend(action_lines(&update.original.action));
        lines.join("\n")
    }
}

fn criteria_map(criteria: &FilterCriteria) -> HashMap<&'static str, String> {
    criteria.entries().into_iter().collect()
}

fn action_lines(action: &FilterAction) -> Vec<String> {
    let mut lines = Vec::new();
    if !action.add_label_ids.is_empty() {
        lines.push(format!("  -> AddLabelIds: {}", action.add_label_ids.join(", ")));
    }
    if !action.remove_label_ids.is_empty() {
        lines.push(format!(
            "  -> RemoveLabelIds: {}",
            action.remove_label_ids.join(", ")
        ));
    }
    if let Some(forward) = &action.forward {
        lines.push(format!("  -> Forward: {}", forward));
    }
    lines
}
