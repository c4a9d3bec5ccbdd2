use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use enneabench::batch::{BatchLogger, BatchPlan, SubprocessRunner, run_batch};
use enneabench::engine::{Engine, Instrument};
use enneabench::llm::{
    ModelListFetcher, OllamaCliFetcher, OllamaClient, OllamaModelFetcher, discover_models,
};
use enneabench::questionnaire::Questionnaires;
use enneabench::report::{ReportInput, write_report};
use enneabench::RunnerConfig;

#[derive(Parser)]
#[command(
    name = "enneabench",
    version,
    about = "Run local LLMs through Enneagram questionnaires"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test one model under one variant and write a Markdown report.
    Run {
        /// Ollama model name, e.g. 'mistral', 'llama3', 'qwen2:7b'.
        #[arg(long)]
        model: String,

        /// Runner variant (built-in: labeled, unlabeled).
        #[arg(long, default_value = "unlabeled")]
        variant: String,

        /// Path to runner config TOML.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory containing enneagram_likert.json and enneagram_test.json.
        #[arg(long)]
        tests_dir: Option<PathBuf>,

        /// Directory to write reports into.
        #[arg(long, alias = "outdir")]
        results_dir: Option<PathBuf>,

        /// Override the variant's runs per test.
        #[arg(long)]
        runs_per_test: Option<usize>,

        /// Ollama base URL.
        #[arg(long)]
        ollama_url: Option<String>,

        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Test every available model under every variant.
    Batch {
        /// Path to runner config TOML (passed on to each run).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip a model; repeat for several.
        #[arg(long, alias = "omit", value_name = "MODEL")]
        exclude: Vec<String>,

        /// Only run these variants; repeat for several. Default: all configured.
        #[arg(long)]
        variant: Vec<String>,

        /// Directory for batch logs.
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Ceiling for one model/variant invocation, in seconds.
        #[arg(long)]
        model_timeout_secs: Option<u64>,
    },

    /// List the models Ollama can serve.
    Models {
        /// Path to runner config TOML.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ollama base URL.
        #[arg(long)]
        ollama_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("enneabench=info"));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }

    match cli.command {
        Commands::Run {
            model,
            variant,
            config: config_path,
            tests_dir,
            results_dir,
            runs_per_test,
            ollama_url,
            timeout_secs,
        } => {
            let mut config = RunnerConfig::load(config_path.as_deref())?;

            // Apply CLI overrides
            if let Some(dir) = tests_dir {
                config.tests_dir = dir;
            }
            if let Some(dir) = results_dir {
                config.results_dir = dir;
            }
            if let Some(url) = ollama_url {
                config.ollama_url = url;
            }
            if let Some(t) = timeout_secs {
                config.request_timeout = std::time::Duration::from_secs(t);
            }

            let mut variant = config.variant(&variant)?.clone();
            if let Some(n) = runs_per_test {
                variant.runs_per_test = n;
            }
            variant.validate()?;

            let questionnaires = Questionnaires::load(
                &config.tests_dir,
                variant.includes(Instrument::Likert),
                variant.includes(Instrument::Paired),
            )?;

            let client = OllamaClient::new(&config.ollama_url, config.request_timeout)?;
            tracing::info!(
                model = %model,
                variant = %variant.name,
                ollama = %client.base_url(),
                "Testing model"
            );

            let engine = Engine::new(Arc::new(client), variant);
            let outcome = engine.run(&model, &questionnaires).await?;

            let path = write_report(
                &config.results_dir,
                &ReportInput {
                    outcome: &outcome,
                    questionnaires: &questionnaires,
                    timestamp: chrono::Local::now().naive_local(),
                },
            )?;
            println!("Multi-run report written to: {}", path.display());
        }
        Commands::Batch {
            config: config_path,
            exclude,
            variant,
            log_dir,
            model_timeout_secs,
        } => {
            let mut config = RunnerConfig::load(config_path.as_deref())?;
            if let Some(dir) = log_dir {
                config.log_dir = dir;
            }
            if let Some(t) = model_timeout_secs {
                config.model_timeout = std::time::Duration::from_secs(t);
            }

            let variants = if variant.is_empty() {
                config
                    .variant_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                for name in &variant {
                    config.variant(name)?;
                }
                variant
            };

            let mut excluded = config.exclude.clone();
            excluded.extend(exclude);

            let plan = BatchPlan {
                variants,
                exclude: excluded,
                model_timeout: config.model_timeout,
            };

            let mut logger = BatchLogger::create(&config.log_dir, std::env::args().skip(1).collect())?;
            logger.log("Discovering available Ollama models...")?;

            let http = OllamaModelFetcher::new(&config.ollama_url);
            let cli_listing = OllamaCliFetcher::new();
            let sources: [&dyn ModelListFetcher; 2] = [&http, &cli_listing];
            let discovered = match discover_models(&sources).await {
                Ok(models) => models,
                Err(e) => {
                    tracing::error!("Model discovery failed: {e}");
                    Vec::new()
                }
            };

            let runner = SubprocessRunner::current_exe(config_path)?;
            let summary = run_batch(discovered, &plan, &runner, &mut logger).await?;
            std::process::exit(summary.exit_code());
        }
        Commands::Models {
            config: config_path,
            ollama_url,
        } => {
            let mut config = RunnerConfig::load(config_path.as_deref())?;
            if let Some(url) = ollama_url {
                config.ollama_url = url;
            }

            let http = OllamaModelFetcher::new(&config.ollama_url);
            let cli_listing = OllamaCliFetcher::new();
            let sources: [&dyn ModelListFetcher; 2] = [&http, &cli_listing];
            let models = discover_models(&sources).await?;

            if models.is_empty() {
                println!("No models available.");
            }
            for model in models {
                println!("{model}");
            }
        }
    }

    Ok(())
}
