//! ens-attest command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ens_attest::chain::ChainClients;
use ens_attest::identity::{
    AgentFileFetcher, AttestationReport, AttestationResult, CancelToken, RecordLookup,
    RegistrationFile, ReqwestFetch, TextRecordUpdate, Verifier, build_key, extract_endpoint,
};
use ens_attest::{AttestConfig, Settings};

#[derive(Parser)]
#[command(name = "ens-attest", version, about = "Verify ENS ⇄ ERC-8004 agent attestations")]
struct Cli {
    /// Settings file (defaults to ~/.ens-attest/settings.json).
    #[arg(long, global = true, env = "ENS_ATTEST_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text-record key for an agent.
    Key {
        #[arg(long)]
        agent: String,
        /// Registry id (defaults to the configured one).
        #[arg(long)]
        registry: Option<String>,
    },
    /// Check both directions of the attestation loop.
    Verify {
        name: String,
        #[arg(long)]
        agent: String,
        #[arg(long)]
        registry: Option<String>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Prepare the resolver call that sets or clears the ENS-side record.
    Record {
        name: String,
        #[arg(long)]
        agent: String,
        #[arg(long)]
        registry: Option<String>,
        #[arg(long, conflicts_with = "clear")]
        value: Option<String>,
        #[arg(long)]
        clear: bool,
    },
    /// Fetch an agent file and show the ENS name it declares.
    Fetch { uri: String },
    /// Print a registration file that claims an ENS name.
    Card {
        /// Agent display name.
        name: String,
        #[arg(long)]
        ens: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Token id, recorded together with the registry id.
        #[arg(long)]
        agent: Option<u64>,
        #[arg(long)]
        registry: Option<String>,
    },
    /// Read or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a setting by dotted path (e.g. registry.chain_id).
    Get { path: String },
    /// Change a setting and save it.
    Set { path: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ens_attest=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&settings_path);
    let mut config = AttestConfig::resolve(&settings)?;

    match cli.command {
        Command::Key { agent, registry } => {
            let registry = registry_or_configured(registry, &config)?;
            println!("{}", build_key(&registry, &agent));
        }
        Command::Verify {
            name,
            agent,
            registry,
            json,
        } => {
            config.registry_id = Some(registry_or_configured(registry, &config)?);
            let clients = ChainClients::from_config(&config);
            let verifier = Verifier::from_config(&config, &clients)?;
            let Some(report) = verifier.verify(&name, &agent).await else {
                bail!("verification was cancelled");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Record {
            name,
            agent,
            registry,
            value,
            clear,
        } => {
            let registry = registry_or_configured(registry, &config)?;
            let update = match (value, clear) {
                (_, true) => TextRecordUpdate::clear(&name, &registry, &agent),
                (Some(value), false) => TextRecordUpdate::set(&name, &registry, &agent, &value),
                (None, false) => bail!("pass --value <VALUE> or --clear"),
            };
            println!("name:     {}", update.name);
            println!("node:     {}", update.node);
            println!("key:      {}", update.key);
            println!("value:    {:?}", update.value);
            println!("calldata: {}", update.calldata);
        }
        Command::Fetch { uri } => {
            let http = ReqwestFetch::new(config.request_timeout)?;
            let fetcher = AgentFileFetcher::new(Arc::new(http), config.ipfs_gateway.clone());
            let text = fetcher
                .fetch(&uri, &CancelToken::new())
                .await
                .with_context(|| format!("fetching {uri}"))?;
            println!("{text}");
            match extract_endpoint(&text) {
                Some(endpoint) => eprintln!("ENS endpoint: {endpoint}"),
                None => eprintln!("ENS endpoint: not set"),
            }
        }
        Command::Card {
            name,
            ens,
            description,
            agent,
            registry,
        } => {
            let mut card = RegistrationFile::new(name, description).claim_ens(ens);
            if let Some(agent) = agent {
                card = card.registered_as(agent, registry_or_configured(registry, &config)?);
            }
            println!("{}", card.to_json_pretty()?);
        }
        Command::Config { action } => match action {
            ConfigAction::Get { path } => match settings.get(&path) {
                Some(value) => println!("{value}"),
                None => bail!("unknown setting: {path}"),
            },
            ConfigAction::Set { path, value } => {
                settings.set(&path, &value).map_err(anyhow::Error::msg)?;
                settings
                    .save_to(&settings_path)
                    .with_context(|| format!("writing {}", settings_path.display()))?;
                tracing::info!("Saved {} to {}", path, settings_path.display());
            }
        },
    }

    Ok(())
}

fn registry_or_configured(
    registry: Option<String>,
    config: &AttestConfig,
) -> anyhow::Result<String> {
    match registry {
        Some(registry) => Ok(registry),
        None => Ok(config.require_registry_id()?.to_string()),
    }
}

fn print_report(report: &AttestationReport) {
    println!("name:        {}", report.ens_name);
    println!("agent:       {}", report.agent_id);
    println!("key:         {}", report.key);

    let ens_side = match &report.ens_record {
        RecordLookup::Set { value } => format!("set ({value})"),
        RecordLookup::NotSet => "not set".to_string(),
        RecordLookup::Error { message } => format!("error: {message}"),
    };
    println!("ENS → Agent: {ens_side}");

    let agent_side = match &report.agent_file {
        AttestationResult::Valid { endpoint } => format!("valid ({endpoint})"),
        AttestationResult::Invalid { endpoint } => format!("points elsewhere ({endpoint})"),
        AttestationResult::NotSet => "not set".to_string(),
        AttestationResult::Error { message } => format!("error: {message}"),
    };
    println!("Agent → ENS: {agent_side}");
    println!("status:      {}", report.status);
}
