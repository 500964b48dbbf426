//! Constitution CLI
//!
//! Answers a query with an LLM, critiques and revises the answer against a
//! set of principles, and prints the structured result as JSON.
//!
//! Logs go to stderr; stdout carries only JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use constitution_core::{library, PrincipleSet};
use constitution_runtime::{CompletionConfig, Pipeline, ProviderRegistry, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "constitution")]
#[command(version, about = "Constitutional self-critique for LLM answers", long_about = None)]
struct Cli {
    /// Log level or filter directive (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a query and print the structured result
    Run {
        /// The question to answer
        query: String,

        /// Built-in principle to apply (repeatable, in order)
        #[arg(long = "principle", value_name = "NAME")]
        principles: Vec<String>,

        /// YAML or JSON file of principles
        #[arg(long, value_name = "PATH", conflicts_with = "principles")]
        principles_file: Option<PathBuf>,

        /// YAML or JSON runtime config
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Provider type (openai, anthropic)
        #[arg(long, value_name = "TYPE")]
        provider: Option<String>,

        /// Model name
        #[arg(long, value_name = "NAME")]
        model: Option<String>,

        /// Print the whole run instead of only the result
        #[arg(long)]
        full: bool,
    },

    /// List the principles that would be applied
    Principles {
        /// YAML or JSON file of principles
        #[arg(long, value_name = "PATH")]
        principles_file: Option<PathBuf>,

        /// YAML or JSON runtime config
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// List the whole built-in library instead
        #[arg(long, conflicts_with_all = ["principles_file", "config"])]
        all: bool,
    },

    /// Validate configuration and credentials without sending a completion
    CheckConfig {
        /// YAML or JSON runtime config
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ConfigSummary<'a> {
    provider: &'a str,
    model: String,
    request_timeout: String,
    principles: Vec<&'a str>,
    healthy: bool,
    available_providers: BTreeMap<&'a str, &'static str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Run {
            query,
            principles,
            principles_file,
            config,
            provider,
            model,
            full,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(provider) = provider {
                config.provider = provider;
            }
            if let Some(model) = model {
                config.model = Some(model);
            }
            if !principles.is_empty() {
                config.principles = principles;
            }

            run(&query, config, principles_file.as_ref(), full).await?;
        }
        Commands::Principles {
            principles_file,
            config,
            all,
        } => {
            let set = if all {
                PrincipleSet::new(library::all())?
            } else {
                let config = load_config(config.as_ref())?;
                resolve_principles(&config, principles_file.as_ref())?
            };
            print_json(&set)?;
        }
        Commands::CheckConfig { config } => {
            check_config(load_config(config.as_ref())?).await?;
        }
    }

    Ok(())
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("Invalid log level: {}", directive))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig> {
    let config = match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    Ok(config.apply_env_overrides())
}

fn resolve_principles(config: &RuntimeConfig, file: Option<&PathBuf>) -> Result<PrincipleSet> {
    match file {
        Some(path) => PrincipleSet::from_file(path)
            .with_context(|| format!("Failed to load principles: {}", path.display())),
        None => config.principle_set().context("Invalid principle selection"),
    }
}

async fn run(
    query: &str,
    config: RuntimeConfig,
    principles_file: Option<&PathBuf>,
    full: bool,
) -> Result<()> {
    let principles = resolve_principles(&config, principles_file)?;

    let registry = ProviderRegistry::with_defaults();
    let model = Arc::new(
        config
            .provider_model(&registry)
            .context("Provider configuration failed")?,
    );

    let pipeline = Pipeline::builder()
        .model(model.clone())
        .principles(principles)
        .build()?;

    let run = pipeline.invoke(query).await.context("Pipeline run failed")?;

    let usage = model.usage();
    tracing::info!(
        llm_calls = usage.llm_calls,
        total_tokens = usage.total_tokens,
        cache_read_tokens = usage.cache_read_tokens,
        cache_creation_tokens = usage.cache_creation_tokens,
        estimated_cost = %format!("${:.4}", usage.estimated_cost),
        "LLM usage"
    );

    if full {
        print_json(&run)
    } else {
        print_json(&run.into_result())
    }
}

async fn check_config(config: RuntimeConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let registry = ProviderRegistry::with_defaults();
    let healthy = config
        .provider_healthy(&registry)
        .await
        .context("Provider configuration failed")?;

    let principles = config.principle_set()?;
    let default_model = registry
        .default_model(&config.provider)
        .unwrap_or(CompletionConfig::DEFAULT_MODEL);
    let completion = config.completion_config(default_model);

    print_json(&ConfigSummary {
        provider: &config.provider,
        model: completion.model,
        request_timeout: format!("{:?}", completion.timeout),
        principles: principles.names(),
        healthy,
        available_providers: registry.descriptions(),
    })?;

    anyhow::ensure!(healthy, "Provider '{}' is not ready to serve requests", config.provider);
    tracing::info!("Configuration OK");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
