use anyhow::Result;
use clap::Parser;
use gmail_filter_templates::cli::{self, Cli, CommitOptions, Commands, LogFormat};
use gmail_filter_templates::config::Config;
use gmail_filter_templates::display::FilterPrinter;
use gmail_filter_templates::error::GmailError;
use gmail_filter_templates::filter_manager::FilterManager;
use gmail_filter_templates::filter_store::JsonFilterStore;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Exit with proper code on error
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {}", cause);
        }
        if let Some(hint) = error_hint(&e) {
            eprintln!("\n{}", hint);
        }
        eprintln!("\nFor help, run: gmail-filters --help");
        process::exit(1);
    }
}

fn error_hint(error: &anyhow::Error) -> Option<&'static str> {
    let gmail_error = error.downcast_ref::<GmailError>()?;
    if gmail_error.is_filter_content_error() {
        return Some("Fix the filter criteria shown above and run again. No filters were changed.");
    }
    match gmail_error {
        GmailError::FilterError(message) if message.starts_with("Filter export not found") => Some(
            "Export your filters as JSON and point filters.path in the config (or --filters) at the file.",
        ),
        GmailError::PatternError(_) => Some("Patterns use Rust regex syntax."),
        _ => None,
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_filter_templates=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_filter_templates=info,warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    // Commands that need neither config nor filters
    match &cli.command {
        Commands::Parse { query, tree } => {
            println!("{}", cli::parse_report(query, *tree)?);
            return Ok(());
        }
        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            if output.exists() && !force {
                return Err(GmailError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(output)?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings to review:");
            println!("  - filters.path: JSON export of your Gmail filters");
            println!("  - execution.assume_yes: Commit changes without confirmation");
            println!("  - display.color: Colored diffs");
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(&cli.config)?;
    let filters_path = cli.filters.clone().unwrap_or_else(|| config.filters.path.clone());
    let printer = FilterPrinter::new(config.display.color && !cli.no_color);

    let store = JsonFilterStore::load(&filters_path)?;
    let mut manager = FilterManager::new(Box::new(store));

    match cli.command {
        Commands::List { pattern } => {
            cli::run_list(&manager, pattern.as_deref(), printer)?;
        }

        Commands::Update { dry_run, yes } => {
            let options = CommitOptions {
                dry_run: dry_run || config.execution.dry_run,
                assume_yes: yes || config.execution.assume_yes,
            };
            cli::run_update(&mut manager, options, printer)?;
        }

        Commands::Replace {
            pattern,
            replacement,
            field,
            dry_run,
            yes,
        } => {
            let options = CommitOptions {
                dry_run: dry_run || config.execution.dry_run,
                assume_yes: yes || config.execution.assume_yes,
            };
            cli::run_replace(&mut manager, field, &pattern, &replacement, options, printer)?;
        }

        Commands::Parse { .. } | Commands::InitConfig { .. } => {}
    }

    Ok(())
}
