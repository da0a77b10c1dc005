//! apicontract CLI - Contract tests for HTTP APIs, driven by OpenAPI examples

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use apicontract_core::Config;
use apicontract_runner::{HookHandler, HttpRunner, NoopHooks, RunnerError, ShellHooks, TestSuite};

#[derive(Parser)]
#[command(name = "apicontract")]
#[command(about = "Contract tests for HTTP APIs, driven by OpenAPI examples")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Disable colored reports
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every test case against the server
    Run {
        /// Config file (default: .apicontract.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// Override the OpenAPI document from the config
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Override the server base URL from the config
        #[arg(long)]
        base_url: Option<String>,

        /// Only run cases whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Stop after the first failing case
        #[arg(long)]
        stop_on_failure: bool,
    },

    /// List the test cases of a document without running them
    List {
        /// Config file (default: .apicontract.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// Override the OpenAPI document from the config
        #[arg(long)]
        spec: Option<PathBuf>,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the x-api-tests payload
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&str>, spec: Option<PathBuf>) -> Result<Config> {
    let mut cfg = match path {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::load_default()?,
    };
    if let Some(spec) = spec {
        cfg.spec = spec;
    }
    Ok(cfg)
}

fn load_suite(cfg: &Config) -> Result<TestSuite> {
    TestSuite::load_from_file(&cfg.spec, &cfg.suite_name, cfg.external_base_path.as_deref())
        .with_context(|| format!("loading {}", cfg.spec.display()))
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            spec,
            base_url,
            filter,
            stop_on_failure,
        } => {
            let mut cfg = load_config(config.as_deref(), spec)?;
            if let Some(base_url) = base_url {
                cfg.base_url = base_url;
            }

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  spec:     {}", cfg.spec.display());
                eprintln!("  base_url: {}", cfg.base_url);
                if !cfg.headers.is_empty() {
                    eprintln!("  headers:  {} configured", cfg.headers.len());
                }
                eprintln!();
            }

            let suite = load_suite(&cfg)?;
            if cli.output != OutputFormat::Silent {
                for warning in suite.warnings() {
                    eprintln!("Warning: {warning}");
                }
            }

            let selected: Vec<_> = suite
                .test_cases()
                .iter()
                .filter(|(name, _)| filter.as_deref().is_none_or(|f| name.contains(f)))
                .collect();

            // Safety check: nothing to run → tool error
            if selected.is_empty() {
                eprintln!("Error: No test cases to run. Check spec and x-api-tests entries.");
                return Ok(3);
            }

            let runner = HttpRunner::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?
                .with_headers(cfg.headers.clone());
            let mut hooks: Box<dyn HookHandler> = if cfg.run_hooks {
                Box::new(ShellHooks)
            } else {
                Box::new(NoopHooks)
            };
            let color = cfg.color && !cli.no_color && cli.output == OutputFormat::Terminal;

            if cli.output != OutputFormat::Silent {
                eprintln!("Running {} test cases...", selected.len());
            }

            let start = Instant::now();
            let mut outcomes = Vec::new();
            let mut errors = Vec::new();
            let mut run_count = 0usize;
            for (name, case) in selected {
                run_count += 1;
                let (outcome, error) = match runner.run_case(name, case, hooks.as_mut()) {
                    Ok(outcome) => (Some(outcome), None),
                    // the exchange still counts; only the cleanup failed
                    Err(RunnerError::TearDown { message, outcome }) => {
                        (Some(*outcome), Some(format!("tearDown hook failed: {message}")))
                    }
                    Err(e) => (None, Some(e.to_string())),
                };

                let mut failed = false;
                if let Some(outcome) = outcome {
                    failed = !outcome.result.is_valid();
                    if cli.output == OutputFormat::Terminal {
                        let icon = if failed { "FAIL" } else { "PASS" };
                        println!(
                            "{icon}: {name} ({}, {:.0}ms)",
                            outcome.status,
                            outcome.elapsed * 1000.0
                        );
                        if failed {
                            println!("{}", outcome.result.render_report(color)?);
                        }
                    }
                    outcomes.push(outcome);
                }
                if let Some(error) = error {
                    if cli.output != OutputFormat::Silent {
                        eprintln!("Error: {name}: {error}");
                    }
                    errors.push(format!("{name}: {error}"));
                    failed = true;
                }

                if failed && stop_on_failure {
                    eprintln!("Stopped early: failure detected (--stop-on-failure)");
                    break;
                }
            }
            let duration_secs = start.elapsed().as_secs_f64();

            let passed = outcomes.iter().filter(|o| o.result.is_valid()).count();
            let failed = outcomes.len() - passed;
            let exit_code = if !errors.is_empty() {
                3
            } else if failed > 0 {
                1
            } else {
                0
            };

            match cli.output {
                OutputFormat::Terminal => {
                    let icon = if exit_code == 0 { "PASS" } else { "FAIL" };
                    println!("\n{icon}: {}", suite.name());
                    println!(
                        "  Cases: {} run, {passed} passed, {failed} failed, {} errors ({duration_secs:.2}s)",
                        run_count,
                        errors.len()
                    );
                    println!("  Exit code: {exit_code}");
                }
                OutputFormat::Json => {
                    let cases: Vec<_> = outcomes
                        .iter()
                        .map(|o| {
                            serde_json::json!({
                                "name": o.name,
                                "status": o.status,
                                "elapsed": o.elapsed,
                                "report": o.result.create_report(),
                            })
                        })
                        .collect();
                    let json_output = serde_json::json!({
                        "suite": suite.name(),
                        "exit_code": exit_code,
                        "stats": {
                            "passed": passed,
                            "failed": failed,
                            "errors": errors.len(),
                            "duration_secs": duration_secs,
                        },
                        "warnings": suite.warnings(),
                        "cases": cases,
                        "errors": errors,
                    });
                    println!("{}", serde_json::to_string_pretty(&json_output)?);
                }
                OutputFormat::Silent => {}
            }

            Ok(exit_code)
        }

        Commands::List { config, spec } => {
            let cfg = load_config(config.as_deref(), spec)?;
            let suite = load_suite(&cfg)?;

            match cli.output {
                OutputFormat::Terminal => {
                    println!("{} ({} cases)", suite.name(), suite.len());
                    for name in suite.test_cases().keys() {
                        println!("  {name}");
                    }
                    for warning in suite.warnings() {
                        println!("  WARNING: {warning}");
                    }
                }
                OutputFormat::Json => {
                    let json_output = serde_json::json!({
                        "suite": suite.name(),
                        "cases": suite.test_cases().keys().collect::<Vec<_>>(),
                        "warnings": suite.warnings(),
                    });
                    println!("{}", serde_json::to_string_pretty(&json_output)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Init => {
            let config_path = ".apicontract.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - spec: OpenAPI document with x-api-tests extensions");
            println!("  - base_url: server to test");
            println!("  - headers: auth tokens, API keys");
            Ok(0)
        }

        Commands::Schema => {
            let schema = apicontract_core::testspec::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}
