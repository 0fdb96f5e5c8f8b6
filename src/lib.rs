//! Gmail Filter Templates
//!
//! Parses Gmail filter criteria strings into lossless element trees and keeps
//! templated criteria in sync across many filters.
//!
//! # Overview
//!
//! - **Parsing**: Bracket and quote aware parsing of criteria strings into
//!   [`FilterElement`] trees that render back byte for byte
//! - **Templates**: A brace group tagged `(M3TAP key)` is the primary definition
//!   of a template; groups tagged `(M3TA key)` in other filters follow it
//! - **Propagation**: Copy every primary over its followers across a batch,
//!   all or nothing
//! - **Filter Management**: List, template-update and regex-rewrite the filters
//!   of a JSON filter export, with diffs and confirmation
//!
//! # Example Usage
//!
//! ```
//! use std::collections::BTreeMap;
//! use gmail_filter_templates::{parse, update_meta_groups};
//!
//! let mut filters = BTreeMap::new();
//! filters.insert("a", parse("{(M3TAP news) from:x@y.com}")?);
//! filters.insert("b", parse("label:inbox {(M3TA news) stale}")?);
//!
//! update_meta_groups(&mut filters)?;
//! assert_eq!(filters["b"].render(), "label:inbox {(M3TA news) from:x@y.com}");
//! # Ok::<(), gmail_filter_templates::GmailError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`element`] - Filter element tree and rendering
//! - [`parser`] - Delimiter checking and parsing
//! - [`meta_key`] - Template keys and key sets
//! - [`template`] - Meta group and template group locators
//! - [`propagation`] - Primary to follower template propagation
//! - [`models`] - Gmail filter resources
//! - [`filter_store`] - Filter storage seam and JSON export store
//! - [`filter_manager`] - Listing, planning and committing filter updates
//! - [`display`] - Filter listings and diffs for the terminal
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod display;
pub mod element;
pub mod error;
pub mod filter_manager;
pub mod filter_store;
pub mod meta_key;
pub mod models;
pub mod parser;
pub mod propagation;
pub mod template;

// Re-export commonly used types for convenience
pub use error::{DelimiterError, GmailError, ParseError, Result, TemplateError, UpdateError};

// Filter trees and parsing
pub use element::{Delimiters, ElementContent, FilterElement};
pub use parser::{check_delimiters, parse};

// Templates
pub use meta_key::{MetaKey, MetaKeySet};
pub use propagation::{plan_meta_group_updates, replace_meta_groups, update_meta_groups};
pub use template::{
    find_all_meta_group_keys, find_meta_group_key, find_primary_template_group,
    find_template_group_key, META_LABEL, META_PRIMARY_LABEL,
};

// Filters
pub use models::{CriteriaField, FilterAction, FilterCriteria, GmailFilter};
pub use filter_store::{FilterStore, JsonFilterStore};
pub use filter_manager::{FilterManager, FilterUpdate};

// Config types
pub use config::{Config, DisplayConfig, ExecutionConfig, FiltersConfig};
