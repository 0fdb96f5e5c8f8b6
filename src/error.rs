use thiserror::Error;

use crate::meta_key::MetaKey;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Parse-time errors. Delimiter imbalance is the only way a parse can fail.
pub type ParseError = DelimiterError;

/// Errors reported by a template propagation run.
pub type UpdateError = TemplateError;

/// Application-level errors for the filter tooling
#[derive(Error, Debug)]
pub enum GmailError {
    /// A filter criteria string could not be parsed
    #[error("Filter parse error: {0}")]
    Parse(#[from] DelimiterError),

    /// The query of a specific stored filter could not be parsed
    #[error("Failed to parse query of filter {filter_id}: {source}")]
    QueryParse {
        filter_id: String,
        #[source]
        source: DelimiterError,
    },

    /// Template propagation failed
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Filter-related errors
    #[error("Filter error: {0}")]
    FilterError(String),

    /// User cancelled operation
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// Invalid regular expression supplied on the command line
    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GmailError {
    /// True for errors caused by the filter contents rather than the environment.
    ///
    /// These are the errors a user fixes by editing filters, not by retrying.
    pub fn is_filter_content_error(&self) -> bool {
        matches!(
            self,
            GmailError::Parse(_) | GmailError::QueryParse { .. } | GmailError::Template(_)
        )
    }
}

/// Unbalanced or mismatched bracket or quote in a filter string.
///
/// `index` is the byte offset of the offending character in `filter`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelimiterError {
    #[error("Mismatched closing delimiter:\n{}", caret_display(.filter, .index))]
    MismatchedClose { filter: String, index: usize },

    #[error("Unmatched delimiter:\n{}", caret_display(.filter, .index))]
    UnmatchedOpen { filter: String, index: usize },

    #[error("Unmatched quote:\n{}", caret_display(.filter, .index))]
    UnmatchedQuote { filter: String, index: usize },
}

impl DelimiterError {
    pub fn index(&self) -> usize {
        match self {
            DelimiterError::MismatchedClose { index, .. }
            | DelimiterError::UnmatchedOpen { index, .. }
            | DelimiterError::UnmatchedQuote { index, .. } => *index,
        }
    }

    pub fn filter(&self) -> &str {
        match self {
            DelimiterError::MismatchedClose { filter, .. }
            | DelimiterError::UnmatchedOpen { filter, .. }
            | DelimiterError::UnmatchedQuote { filter, .. } => filter,
        }
    }
}

/// Render the filter text with a caret line pointing at `index`
fn caret_display(filter: &str, index: &usize) -> String {
    let column = filter
        .get(..*index)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(*index);
    format!("{}\n{}^", filter, " ".repeat(column))
}

/// Errors raised while locating or propagating template groups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A meta group carries a marker but no labels, e.g. `(M3TA)`
    #[error("Template meta group has no labels: {group}")]
    EmptyMetaGroup { group: String },

    /// One brace group holds more than one meta group
    #[error("Multiple sibling meta keys found in '{group}'")]
    MultipleSiblingKeys { group: String },

    /// Two filters define a primary for the same key
    #[error("Primary key collision for {key} between filters {first_id}, {second_id}")]
    PrimaryKeyCollision {
        key: MetaKey,
        first_id: String,
        second_id: String,
    },

    /// Followers reference keys that no filter defines
    #[error("Could not find definition for keys: {}", join_keys(.keys))]
    UndefinedKeys { keys: Vec<MetaKey> },

    /// Primary definitions include followers of each other
    #[error("Template definitions reference each other in a cycle: {}", join_keys(.keys))]
    CyclicTemplates { keys: Vec<MetaKey> },
}

fn join_keys(keys: &[MetaKey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_error_display_has_caret() {
        let error = DelimiterError::MismatchedClose {
            filter: "xx)".to_string(),
            index: 2,
        };
        let display = format!("{}", error);
        assert_eq!(display, "Mismatched closing delimiter:\nxx)\n  ^");
        assert_eq!(error.index(), 2);
        assert_eq!(error.filter(), "xx)");
    }

    #[test]
    fn test_caret_counts_characters_not_bytes() {
        let error = DelimiterError::UnmatchedOpen {
            filter: "é(".to_string(),
            index: 2,
        };
        assert!(format!("{}", error).ends_with("é(\n ^"));
    }

    #[test]
    fn test_template_error_display() {
        let error = TemplateError::PrimaryKeyCollision {
            key: MetaKey::new(["foo"]),
            first_id: "1".to_string(),
            second_id: "2".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("[foo]"));
        assert!(display.contains("between filters 1, 2"));

        let error = TemplateError::UndefinedKeys {
            keys: vec![MetaKey::new(["bar"]), MetaKey::new(["baz", "qux"])],
        };
        assert_eq!(
            format!("{}", error),
            "Could not find definition for keys: [bar], [baz qux]"
        );
    }

    #[test]
    fn test_filter_content_errors() {
        let parse: GmailError = DelimiterError::UnmatchedQuote {
            filter: "\"".to_string(),
            index: 0,
        }
        .into();
        assert!(parse.is_filter_content_error());

        let template: GmailError = TemplateError::EmptyMetaGroup {
            group: "(M3TA)".to_string(),
        }
        .into();
        assert!(template.is_filter_content_error());

        let config = GmailError::ConfigError("bad".to_string());
        assert!(!config.is_filter_content_error());
    }
}
