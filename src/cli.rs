//! Command-line interface

use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::display::FilterPrinter;
use crate::error::{GmailError, Result};
use crate::filter_manager::{FilterManager, FilterUpdate};
use crate::models::CriteriaField;
use crate::parser::parse;
use crate::template::{find_all_meta_group_keys, locate_primary_template};

#[derive(Parser, Debug)]
#[command(name = "gmail-filters")]
#[command(version)]
#[command(about = "Parse Gmail filter queries and keep filter templates in sync", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Filter export to operate on (overrides filters.path from the config)
    #[arg(short, long)]
    pub filters: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a filter query and show its structure and template keys
    Parse {
        /// Filter query, e.g. 'from:a@b.com {(M3TA news) label:x}'
        query: String,

        /// Print the full element tree
        #[arg(long)]
        tree: bool,
    },

    /// List filters, optionally only those whose criteria match a regex
    #[command(alias = "ls")]
    List {
        /// Regex matched against each filter's criteria
        pattern: Option<String>,
    },

    /// Propagate primary templates (M3TAP) to their followers (M3TA)
    Update {
        /// Show the changes without committing them
        #[arg(long)]
        dry_run: bool,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Regex replace within one criteria field of every matching filter
    #[command(alias = "sub")]
    Replace {
        /// Regex to search for
        pattern: String,

        /// Replacement text; capture groups are available as $1, ${name}
        replacement: String,

        /// Criteria field to operate on
        #[arg(long, default_value = "query")]
        field: CriteriaField,

        /// Show the changes without committing them
        #[arg(long)]
        dry_run: bool,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// How planned updates are committed
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    pub dry_run: bool,
    pub assume_yes: bool,
}

/// Structure and template keys of a single query, as printed by `parse`
pub fn parse_report(query: &str, show_tree: bool) -> Result<String> {
    let tree = parse(query)?;

    let mut lines = Vec::new();
    if show_tree {
        lines.push(tree.tree_string());
    }

    let keys = find_all_meta_group_keys(&tree)?;
    if keys.is_empty() {
        lines.push("Template keys: none".to_string());
    } else {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        lines.push(format!("Template keys: {}", keys.join(", ")));
    }

    if let Some((key, _)) = locate_primary_template(&tree)? {
        lines.push(format!("Primary template: {}", key));
    }

    Ok(lines.join("\n"))
}

pub fn run_list(manager: &FilterManager, pattern: Option<&str>, printer: FilterPrinter) -> Result<()> {
    let pattern = pattern.map(Regex::new).transpose()?;
    let filters = manager.list_filters(pattern.as_ref())?;

    if filters.is_empty() {
        println!("No filters found");
        return Ok(());
    }
    for filter in &filters {
        println!("{}", printer.format_filter(filter));
    }
    Ok(())
}

pub fn run_update(
    manager: &mut FilterManager,
    options: CommitOptions,
    printer: FilterPrinter,
) -> Result<usize> {
    let updates = manager.plan_template_updates()?;
    print_updates("Updates to be done:", &updates, printer);
    commit_updates(manager, &updates, options)
}

pub fn run_replace(
    manager: &mut FilterManager,
    field: CriteriaField,
    pattern: &str,
    replacement: &str,
    options: CommitOptions,
    printer: FilterPrinter,
) -> Result<usize> {
    let pattern = Regex::new(pattern)?;
    let updates = manager.plan_replacements(field, &pattern, replacement)?;
    print_updates("Replacements to be done:", &updates, printer);
    commit_updates(manager, &updates, options)
}

fn print_updates(heading: &str, updates: &[FilterUpdate], printer: FilterPrinter) {
    if updates.is_empty() {
        return;
    }
    println!("{}", printer.heading(heading));
    for update in updates {
        println!("{}\n", printer.format_update(update));
    }
}

/// Apply planned updates unless this is a dry run or the user declines
fn commit_updates(
    manager: &mut FilterManager,
    updates: &[FilterUpdate],
    options: CommitOptions,
) -> Result<usize> {
    if updates.is_empty() {
        println!("No updates to be made");
        return Ok(0);
    }
    if options.dry_run {
        println!("Skipping committing changes (dry run)");
        return Ok(0);
    }
    if !options.assume_yes && !confirm_action("Make these changes?", updates.len() > 1)? {
        warn!("Changes declined, nothing was written");
        println!("No changes made");
        return Ok(0);
    }

    let applied = manager.apply_updates(updates)?;
    info!("Committed {} filter updates", applied);
    println!("Updated {} filters", applied);
    Ok(applied)
}

/// Prompt user for confirmation
fn confirm_action(prompt: &str, many_changes: bool) -> Result<bool> {
    let help = if many_changes {
        "Several filters will be rewritten"
    } else {
        "One filter will be rewritten"
    };
    inquire::Confirm::new(prompt)
        .with_default(false)
        .with_help_message(help)
        .prompt()
        .map_err(|e| GmailError::OperationCancelled(e.to_string()))
}
