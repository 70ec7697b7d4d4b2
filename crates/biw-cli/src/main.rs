use anyhow::Result;
use biw_client::{BiApiClient, PlatformClient, QueueClient, SyncJobClient};
use biw_config::{load_config, PlatformEnv};
use biw_core::{
    backend_for, select_job_runner, test_connection, test_credentials, Config, DbBackend, Driver,
    JobQueueApi, Orchestrator, SyncJobApi, SyncJobRunner, ValidationMode,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "biw")]
#[command(about = "BI warehouse writer", long_about = None)]
struct Cli {
    /// Path to the component configuration document
    #[arg(short, long, default_value = "config.json", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the BI connection and run the writer job
    Run,

    /// Reconcile the BI connection without writing any data
    Register,

    /// Probe warehouse connectivity through the writer's test action
    TestConnection,

    /// Verify the configured BI platform credentials
    TestCredentials,

    /// Validate the configuration document offline
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run => {
            config.validate(ValidationMode::Run)?;
            run(&config).await?;
        }

        Commands::Register => {
            config.validate(ValidationMode::Register)?;
            let env = PlatformEnv::from_env()?;
            let orchestrator = build_orchestrator(&config, &env)?;
            orchestrator.register().await?;
        }

        Commands::TestConnection => {
            config.validate(ValidationMode::TestConnection)?;
            let env = PlatformEnv::from_env()?;
            let backend = build_backend(&config, &env)?;
            let platform = Arc::new(PlatformClient::new(env.url()?, env.token()?)?);
            let jobs: Arc<dyn SyncJobApi> =
                Arc::new(SyncJobClient::new(platform, env.token()?, env.run_id())?);
            let runner = SyncJobRunner::new(jobs);

            let message = test_connection(backend.as_ref(), &runner).await?;
            info!("{message}");
        }

        Commands::TestCredentials => {
            config.validate(ValidationMode::TestCredentials)?;
            let bi = config.bi()?;
            let client = BiApiClient::new(&bi.host, &bi.credentials_id, &bi.token)?;
            test_credentials(&client).await?;
        }

        Commands::Validate => {
            validate(&config)?;
        }
    }

    Ok(())
}

/// Full pipeline: pick the job backend by account feature, then hand over to
/// the orchestrator.
async fn run(config: &Config) -> Result<()> {
    let env = PlatformEnv::from_env()?;
    let platform = Arc::new(PlatformClient::new(env.url()?, env.token()?)?);
    let sync: Arc<dyn SyncJobApi> = Arc::new(SyncJobClient::new(
        platform.clone(),
        env.token()?,
        env.run_id(),
    )?);
    let queue: Arc<dyn JobQueueApi> = Arc::new(QueueClient::new(platform.clone(), env.token()?)?);

    let features = platform.features().await?;
    let runner = select_job_runner(&features, sync, queue);

    let orchestrator = build_orchestrator(config, &env)?;
    orchestrator.run(runner.as_ref()).await?;
    Ok(())
}

fn build_orchestrator(config: &Config, env: &PlatformEnv) -> Result<Orchestrator> {
    let backend = build_backend(config, env)?;
    let bi = config.bi()?;
    let client = Arc::new(BiApiClient::new(&bi.host, &bi.credentials_id, &bi.token)?);
    Ok(Orchestrator::new(
        client.clone(),
        client,
        backend,
        config.connection_name(env.config_id()?)?,
        config.parameters.force_update_connection,
    ))
}

fn build_backend(config: &Config, env: &PlatformEnv) -> Result<Box<dyn DbBackend>> {
    Ok(backend_for(
        config,
        env.run_id(),
        env.staging_file_provider()?,
    )?)
}

fn validate(config: &Config) -> Result<()> {
    config.validate(ValidationMode::Run)?;

    println!("✓ Configuration is valid");
    let db = &config.parameters.db;
    match db.driver {
        Driver::Snowflake => println!(
            "  • driver: snowflake ({} / {})",
            db.host()?,
            db.database()?
        ),
        Driver::BigQuery => println!(
            "  • driver: bigquery ({} / {})",
            db.service_account()?.project_id,
            db.dataset()?
        ),
    }
    if config.parameters.db_cache.is_some() {
        println!("  • derived-table cache connection configured");
    }
    println!("  • tables: {}", config.parameters.tables.len());
    for table in &config.parameters.tables {
        println!("    • {} → {}", table.table_id, table.db_name);
    }

    Ok(())
}
