use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::OsRng;
use readiness_core::{render_text, run_validations, wizard, ReadinessConfig, ReadinessReport, ValidationOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Check that a project is ready to deploy")]
struct Cli {
    /// Project root to inspect. Defaults to the current directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Check definitions. Defaults to readiness.toml under the root, if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check and exit 1 if any blocking check fails (the default).
    Check(CheckArgs),
    /// Re-render a saved JSON report and exit with its verdict.
    Report(ReportArgs),
    /// Interactively create the .env file.
    SetupEnv,
}

#[derive(Args, Default)]
struct CheckArgs {
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    #[arg(long)]
    id: Option<String>,
    /// Also write the JSON report here.
    #[arg(long)]
    report_out: Option<PathBuf>,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    input: PathBuf,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine the working directory")?,
    };
    match cli.command.unwrap_or(Commands::Check(CheckArgs::default())) {
        Commands::Check(args) => handle_check(&root, cli.config.as_deref(), args),
        Commands::Report(args) => {
            init_tracing(None);
            handle_report(args)
        }
        Commands::SetupEnv => {
            init_tracing(None);
            handle_setup(&root)
        }
    }
}

fn init_tracing(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

fn handle_check(root: &Path, config_path: Option<&Path>, args: CheckArgs) -> Result<ExitCode> {
    let config = ReadinessConfig::discover(root, config_path).context("failed to load config")?;
    init_tracing(config.trace_filter());

    let run_id = args
        .id
        .unwrap_or_else(|| format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let options = ValidationOptions::new(root.to_path_buf(), run_id);
    let report = run_validations(&config, &options)?;

    match args.format {
        Format::Text => print!("{}", render_text(&report.verdict)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    let targets = config
        .report
        .as_ref()
        .map(|cfg| root.join(&cfg.path))
        .into_iter()
        .chain(args.report_out);
    for path in targets {
        write_report(&report, &path)?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(ExitCode::from(report.verdict.overall.exit_code()))
}

fn write_report(report: &ReadinessReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory {}", parent.display()))?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<ExitCode> {
    let data = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let report: ReadinessReport = serde_json::from_str(&data)
        .with_context(|| format!("{} is not a readiness report", args.input.display()))?;
    println!("Report {} ({})", report.id, report.timestamp);
    print!("{}", render_text(&report.verdict));
    Ok(ExitCode::from(report.verdict.overall.exit_code()))
}

fn handle_setup(root: &Path) -> Result<ExitCode> {
    let stdin = io::stdin();
    let path = wizard::run_setup(root, stdin.lock(), io::stdout(), &mut OsRng)?;
    println!("\nNext steps:");
    println!("1. cd backend && npm install");
    println!("2. npm start");
    println!("3. Test: curl http://localhost:3000/health");
    println!("4. Run the readiness check again to confirm {} is picked up", path.display());
    Ok(ExitCode::SUCCESS)
}
