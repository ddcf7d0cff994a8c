use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use validate_html::config::{Configuration, IgnoreRule, find_config_file};
use validate_html::init::create_default_config;
use validate_html::{Error, ValidationRequest, Validator};

mod cli_types;

use cli_types::{CheckArgs, InitArgs};

/// Every document was valid
const SUCCESS: u8 = 0;
/// At least one document had diagnostics left after filtering
const INVALID_HTML_FOUND: u8 = 1;
/// Bad invocation, unreadable input or configuration, or a snapshot failure
const TOOL_ERROR: u8 = 2;

#[derive(Parser)]
#[command(author, version, about = "Check HTML documents for conformance problems", long_about = None)]
struct Cli {
    /// Configuration file path (default: nearest .validate-html.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ignore any configuration file
    #[arg(long, global = true, conflicts_with = "config")]
    no_config: bool,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate HTML files or standard input
    Check(CheckArgs),
    /// Create a default .validate-html.toml
    Init(InitArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Check(args) => run_check(&cli, args),
        Commands::Init(args) => run_init(args),
    };

    match result {
        Ok(true) => ExitCode::from(SUCCESS),
        Ok(false) => ExitCode::from(INVALID_HTML_FOUND),
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red().bold());
            ExitCode::from(TOOL_ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn load_configuration(cli: &Cli) -> anyhow::Result<Configuration> {
    if cli.no_config {
        return Ok(Configuration::default());
    }
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => find_config_file(&std::env::current_dir()?),
    };
    match path {
        Some(path) => {
            log::debug!("Using configuration from {}", path.display());
            Ok(Configuration::load(&path)?)
        }
        None => Ok(Configuration::default()),
    }
}

fn read_input(input: &str) -> anyhow::Result<(String, Vec<u8>)> {
    let mut body = Vec::new();
    if input == "-" {
        io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read from stdin")?;
        return Ok(("stdin".to_string(), body));
    }
    body = fs::read(input).with_context(|| format!("Failed to read {input}"))?;
    Ok((input.to_string(), body))
}

/// Validate every input and print the combined report. Returns whether all inputs were valid.
fn run_check(cli: &Cli, args: &CheckArgs) -> anyhow::Result<bool> {
    let mut config = load_configuration(cli)?;
    config.remember_messages = true;
    if let Some(dir) = &args.snapshot_path {
        config.set_snapshot_path(dir);
    }
    if !args.ignore_errors.is_empty() {
        let mut rules = config.ignored_errors().to_vec();
        for pattern in &args.ignore_errors {
            let rule = IgnoreRule::pattern(pattern).with_context(|| format!("Invalid --ignore-error pattern {pattern:?}"))?;
            rules.push(rule);
        }
        config.set_ignored_errors(rules);
    }

    let mut validator = Validator::new(config);
    let inputs: Vec<&str> = if args.paths.is_empty() {
        vec!["-"]
    } else {
        args.paths.iter().map(String::as_str).collect()
    };

    let mut checked = 0;
    let mut invalid = 0;
    for input in inputs {
        if input != "-" && validator.config().is_ignored_path(input) {
            log::debug!("Skipping ignored path {input}");
            continue;
        }
        let (name, body) = read_input(input)?;
        let mut request = ValidationRequest::new().name(&name).raise_on_invalid_html(true);
        request.content_type = args.content_type.as_deref();

        checked += 1;
        match validator.validate(&body, &request) {
            Ok(_) => {}
            Err(Error::InvalidHtml(_)) => invalid += 1,
            Err(e) => return Err(e.into()),
        }
    }

    match validator.raise_remembered_messages() {
        Ok(()) => {}
        Err(Error::InvalidHtml(report)) => print!("{report}"),
        Err(e) => return Err(e.into()),
    }

    if !args.quiet {
        if invalid == 0 {
            println!(
                "{} No invalid html found in {checked} document{}",
                "Success:".green().bold(),
                if checked == 1 { "" } else { "s" }
            );
        } else {
            println!(
                "\n{} Invalid html in {invalid} of {checked} document{}",
                "Failed:".red().bold(),
                if checked == 1 { "" } else { "s" }
            );
        }
    }

    Ok(invalid == 0)
}

fn run_init(args: &InitArgs) -> anyhow::Result<bool> {
    if create_default_config(&args.output)? {
        println!("Created default configuration file: {}", args.output.display());
    } else {
        eprintln!(
            "{}: Configuration file {} already exists",
            "Warning".yellow().bold(),
            args.output.display()
        );
    }
    Ok(true)
}
