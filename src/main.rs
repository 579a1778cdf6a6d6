//! rewrite-testing - Rewrite rule test runner
//!
//! Entry point for the `rewrite-testing` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rewrite_testing::cli::{self, ConfigCommand, OutputFormat, Overrides};

/// Replays sample request paths against a site's rewrite rules and reports
/// failures and rule coverage
#[derive(Parser)]
#[command(name = "rewrite-testing")]
#[command(version = rewrite_testing::VERSION)]
#[command(about = "Test a site's rewrite rules against known request paths", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "rewrite-testing.toml")]
    config: PathBuf,

    /// Site snapshot, overriding the configuration
    #[arg(long, global = true)]
    site: Option<PathBuf>,

    /// Extra test case file, overriding the configuration
    #[arg(long, global = true)]
    cases: Option<PathBuf>,

    /// Do not include the built-in test cases
    #[arg(long, global = true)]
    no_default_cases: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available test cases
    List {
        /// Limit the output to these groups
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,

        /// Limit the output to these fields
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Run the tests and show every result
    Run {
        /// Limit the output to these fields
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Summary of the last test run
    Summary {
        /// Limit the output to these fields
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print Passing or Failing
    Status,
    /// Exit successfully only when the tests pass
    Passing,
    /// Rule coverage report
    Coverage {
        /// Limit the output to these statuses (missed, tested)
        #[arg(long, value_delimiter = ',', default_value = "missed,tested")]
        status: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show the site's rewrite rules
    Rules {
        /// Limit the output to one rule source
        #[arg(long)]
        source: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Forget the stored test summary
    Flush,
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rewrite_testing={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("rewrite-testing v{}", rewrite_testing::VERSION);

    let overrides = Overrides {
        site: cli.site.clone(),
        cases: cli.cases.clone(),
        no_default_cases: cli.no_default_cases,
    };

    if let Commands::Config { command } = cli.command {
        return cli::handle_config_command(&cli.config, &overrides, command);
    }

    let config = cli::load_config(&cli.config, &overrides)?;
    let tester = cli::build_tester(&config)?;

    match cli.command {
        Commands::List {
            groups,
            fields,
            format,
        } => cli::list_tests(&tester, &groups, &fields, format)?,
        Commands::Run { fields, format } => cli::run_tests(&tester, &fields, format)?,
        Commands::Summary { fields, format } => cli::show_summary(&tester, &fields, format)?,
        Commands::Status => cli::show_status(&tester)?,
        Commands::Passing => cli::check_passing(&tester)?,
        Commands::Coverage { status, format } => cli::show_coverage(&tester, &status, format)?,
        Commands::Rules { source, format } => {
            cli::show_rules(&tester, source.as_deref(), format)?
        }
        Commands::Flush => cli::flush_summary(&tester, &config.cache)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
