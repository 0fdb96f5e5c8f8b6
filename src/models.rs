use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Gmail filter resource as exported from the settings API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmailFilter {
    pub id: String,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub action: FilterAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negated_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_attachment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_chats: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_comparison: Option<String>,
}

impl FilterCriteria {
    /// Every set criterion as a `(name, value)` pair, in API field order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        let mut push_str = |name: &'static str, value: &Option<String>| {
            if let Some(value) = value {
                entries.push((name, value.clone()));
            }
        };
        push_str("from", &self.from);
        push_str("to", &self.to);
        push_str("subject", &self.subject);
        push_str("query", &self.query);
        push_str("negatedQuery", &self.negated_query);
        if let Some(value) = self.has_attachment {
            entries.push(("hasAttachment", value.to_string()));
        }
        if let Some(value) = self.exclude_chats {
            entries.push(("excludeChats", value.to_string()));
        }
        if let Some(value) = self.size {
            entries.push(("size", value.to_string()));
        }
        if let Some(value) = &self.size_comparison {
            entries.push(("sizeComparison", value.clone()));
        }
        entries
    }

    /// One `name: value` line per set criterion, used for pattern matching
    pub fn summary(&self) -> String {
        self.entries()
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<String>,
}

/// The string-valued criteria fields a filter can be edited through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriteriaField {
    From,
    To,
    Subject,
    Query,
    NegatedQuery,
    SizeComparison,
}

impl CriteriaField {
    pub const ALL: [CriteriaField; 6] = [
        CriteriaField::From,
        CriteriaField::To,
        CriteriaField::Subject,
        CriteriaField::Query,
        CriteriaField::NegatedQuery,
        CriteriaField::SizeComparison,
    ];

    /// Name used in the exported JSON
    pub fn as_str(self) -> &'static str {
        match self {
            CriteriaField::From => "from",
            CriteriaField::To => "to",
            CriteriaField::Subject => "subject",
            CriteriaField::Query => "query",
            CriteriaField::NegatedQuery => "negatedQuery",
            CriteriaField::SizeComparison => "sizeComparison",
        }
    }

    pub fn get(self, criteria: &FilterCriteria) -> Option<&str> {
        let value = match self {
            CriteriaField::From => &criteria.from,
            CriteriaField::To => &criteria.to,
            CriteriaField::Subject => &criteria.subject,
            CriteriaField::Query => &criteria.query,
            CriteriaField::NegatedQuery => &criteria.negated_query,
            CriteriaField::SizeComparison => &criteria.size_comparison,
        };
        value.as_deref()
    }

    /// Set the field, clearing it when `value` is empty
    pub fn set(self, criteria: &mut FilterCriteria, value: String) {
        let slot = match self {
            CriteriaField::From => &mut criteria.from,
            CriteriaField::To => &mut criteria.to,
            CriteriaField::Subject => &mut criteria.subject,
            CriteriaField::Query => &mut criteria.query,
            CriteriaField::NegatedQuery => &mut criteria.negated_query,
            CriteriaField::SizeComparison => &mut criteria.size_comparison,
        };
        *slot = if value.is_empty() { None } else { Some(value) };
    }
}

impl fmt::Display for CriteriaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriteriaField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "from" => Ok(CriteriaField::From),
            "to" => Ok(CriteriaField::To),
            "subject" => Ok(CriteriaField::Subject),
            "query" => Ok(CriteriaField::Query),
            "negatedquery" => Ok(CriteriaField::NegatedQuery),
            "sizecomparison" => Ok(CriteriaField::SizeComparison),
            _ => Err(format!(
                "Unknown criteria field '{}' (expected one of: {})",
                s,
                CriteriaField::ALL
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}
