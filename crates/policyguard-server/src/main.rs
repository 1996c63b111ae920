//! `policyguard` binary: HTTP API server and one-shot CLI.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use policyguard_core::{ChunkerConfig, Practice};
use policyguard_pipeline::{
    AnalysisOrchestrator, Classifier, FetcherConfig, HttpClassifier, HttpClassifierConfig,
    HttpFetcher, PatternClassifier, PolicyStore, SqliteStore,
};

mod routes;

use routes::AppState;

#[derive(Parser)]
#[command(
    name = "policyguard",
    about = "Privacy policy analysis and risk evaluation",
    version
)]
struct Cli {
    /// SQLite database URL.
    #[arg(
        long,
        global = true,
        env = "POLICYGUARD_DATABASE_URL",
        default_value = "sqlite://policyguard.db"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server.
    Serve(ServeArgs),

    /// Analyze one policy URL and print the report.
    Analyze(AnalyzeArgs),

    /// Manage a user's rule set.
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Privacy policy URL to analyze.
    policy_url: String,

    /// User whose rules drive the evaluation.
    #[arg(long)]
    user: i64,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args)]
struct PipelineArgs {
    /// External classification service URL. The built-in pattern classifier
    /// is used when absent.
    #[arg(long, env = "POLICYGUARD_CLASSIFIER_URL")]
    classifier_url: Option<String>,

    /// Bearer token for the classification service.
    #[arg(long, env = "POLICYGUARD_CLASSIFIER_API_KEY", hide_env_values = true)]
    classifier_api_key: Option<String>,

    /// Policy fetch timeout.
    #[arg(long, default_value = "15s", value_parser = humantime::parse_duration)]
    fetch_timeout: Duration,

    /// Per-chunk classification timeout.
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    classify_timeout: Duration,
}

#[derive(Subcommand)]
enum RuleCommand {
    /// Create or overwrite the rule for one practice.
    Set {
        #[arg(long)]
        user: i64,

        /// Practice name (data_selling, third_party_sharing, advertising,
        /// retention, sensitive_data).
        #[arg(long)]
        practice: String,

        /// Permit the practice.
        #[arg(long, conflicts_with = "deny")]
        allow: bool,

        /// Disallow the practice.
        #[arg(long, conflicts_with = "allow")]
        deny: bool,

        /// Rule weight; 10 is the baseline.
        #[arg(long, default_value_t = 10)]
        priority: i64,
    },

    /// Print a user's rules as JSON.
    List {
        #[arg(long)]
        user: i64,
    },
}

impl PipelineArgs {
    fn classifier(&self) -> Arc<dyn Classifier> {
        match &self.classifier_url {
            Some(url) => {
                let mut config = HttpClassifierConfig::new(url.clone());
                config.timeout = self.classify_timeout;
                if let Some(key) = &self.classifier_api_key {
                    config = config.with_api_key(SecretString::from(key.clone()));
                }
                Arc::new(HttpClassifier::new(config))
            }
            None => Arc::new(PatternClassifier::new()),
        }
    }

    fn orchestrator(&self, store: Arc<SqliteStore>) -> anyhow::Result<AnalysisOrchestrator> {
        let fetcher = HttpFetcher::new(FetcherConfig {
            timeout: self.fetch_timeout,
            ..FetcherConfig::default()
        });

        let orchestrator = AnalysisOrchestrator::builder()
            .fetcher(Arc::new(fetcher))
            .classifier(self.classifier())
            .store(store)
            .chunker(ChunkerConfig::default())
            .build()?;

        Ok(orchestrator)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = Arc::new(
        SqliteStore::connect(&cli.database_url)
            .await
            .context("failed to open database")?,
    );

    match cli.command {
        Command::Serve(args) => serve(args, store).await,
        Command::Analyze(args) => analyze(args, store).await,
        Command::Rule { command } => rule(command, store).await,
    }
}

async fn serve(args: ServeArgs, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    let orchestrator = Arc::new(args.pipeline.orchestrator(store.clone())?);
    let state = AppState {
        orchestrator,
        store,
    };

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;

    tracing::info!(addr = %args.addr, "policyguard API listening");
    axum::serve(listener, routes::router(state)).await?;

    Ok(())
}

async fn analyze(args: AnalyzeArgs, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    let orchestrator = args.pipeline.orchestrator(store)?;
    let report = orchestrator.analyze(&args.policy_url, args.user).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn rule(command: RuleCommand, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    match command {
        RuleCommand::Set {
            user,
            practice,
            allow,
            deny,
            priority,
        } => {
            if allow == deny {
                bail!("specify exactly one of --allow or --deny");
            }
            if priority < 1 {
                bail!("priority must be a positive integer");
            }

            let practice: Practice = practice
                .parse()
                .with_context(|| format!("unknown practice '{practice}'"))?;

            let rule = store.upsert_rule(user, practice, allow, priority).await?;
            println!("{}", serde_json::to_string_pretty(&rule)?);
        }
        RuleCommand::List { user } => {
            let rules = store.rules_for_user(user).await?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }

    Ok(())
}
