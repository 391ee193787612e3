use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{ClassifierKind, Config};
use crate::executor::{Engine, EngineOptions, TerminalAsk};
use crate::parser::parse;
use crate::parser::semantic_validator::{validate_program, Severity};
use crate::types::Program;

#[derive(Parser)]
#[command(name = "flowtalk")]
#[command(about = "Flowtalk - run conversational flow scripts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a flow in the terminal
    Run {
        /// Flow source file
        file: PathBuf,

        /// Flow to run (overrides config)
        #[arg(long)]
        flow: Option<String>,

        /// Initial variable, repeatable
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,

        /// Store file to seed variables from
        #[arg(long)]
        context_file: Option<PathBuf>,

        /// Intent classifier used after answered questions
        #[arg(long, value_enum)]
        classifier: Option<ClassifierKind>,

        /// Transition ceiling for the whole run
        #[arg(long)]
        max_transitions: Option<usize>,
    },

    /// Parse and validate a flow file
    Check {
        /// Flow source file
        file: PathBuf,
    },

    /// Print the parsed program as JSON
    Dump {
        /// Flow source file
        file: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before any command so errors show up first
    let config = Config::load_with(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Commands::Run {
            file,
            flow,
            vars,
            context_file,
            classifier,
            max_transitions,
        } => {
            let mut options = EngineOptions::from(&config);
            if let Some(flow) = flow {
                options.flow = flow;
            }
            if let Some(limit) = max_transitions {
                options.max_transitions = limit;
            }

            let program = load_program(&file)?;
            let mut builder = Engine::builder(Arc::new(program))
                .options(options)
                .context(vars)
                .boxed_classifier(classifier.unwrap_or(config.classifier).build())
                .ask(TerminalAsk::stdio());
            if let Some(path) = context_file.or(config.context_file) {
                builder = builder.seed_from_store(path);
            }

            let mut engine = builder.build().context("Failed to start flow")?;
            for line in engine.run() {
                println!("{}", line?);
            }

            if let Some((var, _)) = engine.awaiting() {
                // stdin closed while a question was open
                println!();
                tracing::info!(var, "input closed, stopping");
            }
        }

        Commands::Check { file } => {
            let source = read_source(&file)?;
            let ok = check_source(&source, &mut io::stdout().lock())?;
            if !ok {
                std::process::exit(1);
            }
        }

        Commands::Dump { file } => {
            let program = load_program(&file)?;
            let json = serde_json::to_string_pretty(&program).context("Failed to serialize program")?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Install the stderr subscriber: `RUST_LOG` if set, else the configured filter.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    // A subscriber may already be installed by an embedding host
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_program(path: &Path) -> Result<Program> {
    let source = read_source(path)?;
    parse(&source).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Print parse errors or validation findings. Returns false if anything
/// would stop the flow from running.
fn check_source(source: &str, out: &mut impl Write) -> Result<bool> {
    let program = match parse(source) {
        Ok(program) => program,
        Err(e) => {
            writeln!(out, "error: {}", e)?;
            return Ok(false);
        }
    };

    let findings = validate_program(&program);
    for finding in &findings {
        writeln!(out, "{}", finding)?;
    }

    let errors = findings.iter().filter(|f| f.is_error()).count();
    let warnings = findings.iter().filter(|f| f.severity == Severity::Warning).count();
    writeln!(
        out,
        "{} flow(s) checked: {} error(s), {} warning(s)",
        program.flows.len(),
        errors,
        warnings
    )?;

    Ok(errors == 0)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
