use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use supplydna_client::{
    config::ClientConfig,
    explorer,
    history::FileHistoryRepository,
    ipfs::{GatewayResolver, RelayUploader},
    ledger::LedgerAccessor,
    stage::lifecycle_series,
    workflow::{
        CertificateResolver, LookupOutcome, LookupWorkflow, RegistrationForm,
        RegistrationWorkflow,
    },
};

#[derive(Parser)]
#[command(name = "supplydna", about = "SupplyDNA component traceability")]
struct Cli {
    /// Configuration file (defaults to ./supplydna.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a component by id, scanned QR payload, or QR image
    Lookup {
        #[arg(required_unless_present = "qr_image")]
        input: Option<String>,
        /// Image file containing the component's QR code
        #[arg(long, conflicts_with = "input")]
        qr_image: Option<PathBuf>,
    },
    /// Register a new component
    Register {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        supplier: String,
        #[arg(long)]
        batch: String,
        #[arg(long)]
        date: String,
        /// Shared registration passphrase
        #[arg(long, default_value = "")]
        password: String,
        /// Mint an NFT certificate with pinned metadata
        #[arg(long)]
        mint: bool,
    },
    /// Fetch a JSON document from IPFS through the gateway mirrors
    Metadata { uri: String },
    /// Show a component's NFT certificate
    Certificate {
        id: String,
        #[arg(long)]
        metadata_uri: String,
        #[arg(long)]
        token_id: String,
    },
    /// Show recent lookups
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Lookup { input, qr_image } => {
            let workflow = lookup_workflow(&config, LedgerAccessor::from_config(&config))?;
            let outcome = match (&qr_image, &input) {
                (Some(path), _) => workflow.lookup_qr_image(path).await,
                (None, Some(input)) => workflow.lookup(input).await,
                (None, None) => LookupOutcome::Skipped,
            };
            match outcome {
                LookupOutcome::Found(record) => {
                    let view = workflow.view();
                    println!("✅ Found {}", record.id);
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    match view.stage() {
                        Some(stage) => println!("Stage: {}", stage.label()),
                        None => println!("Stage: unknown"),
                    }
                    for point in lifecycle_series(view.component.as_ref()) {
                        let marker = if point.highlight { "▶" } else { " " };
                        println!("{} {:<13} {}", marker, point.stage.label(), point.value);
                    }
                }
                LookupOutcome::Skipped => println!("Nothing to look up"),
                LookupOutcome::Busy => println!("A lookup is already running"),
                LookupOutcome::NotFound { .. } | LookupOutcome::Failed { .. } => {
                    if let Some(error) = workflow.view().error {
                        eprintln!("❌ {}", error);
                    }
                    std::process::exit(1);
                }
            }
        }
        Command::Register {
            id,
            name,
            supplier,
            batch,
            date,
            password,
            mint,
        } => {
            let uploader = match RelayUploader::new(config.upload_endpoint()) {
                Ok(uploader) => Arc::new(uploader),
                Err(err) => {
                    eprintln!("❌ Registration failed. {}", err);
                    std::process::exit(1);
                }
            };
            let workflow = RegistrationWorkflow::new(
                LedgerAccessor::from_config(&config),
                uploader,
                mint || config.mints_certificate,
                config.registration_passphrase.clone(),
            );
            let mut form = RegistrationForm {
                id,
                name,
                supplier,
                batch,
                date,
                password,
            };
            if workflow.mints_certificate() {
                println!("Pinning certificate metadata via {}", config.upload_endpoint());
            }
            match workflow.submit(&mut form).await {
                Ok(success) => {
                    println!("✅ {}", success.message);
                    println!(
                        "Transaction: {}",
                        explorer::transaction_url(&config.network, &success.transaction_hash)
                    );
                    if let Some(token_id) = &success.token_id {
                        println!(
                            "Certificate: {}",
                            explorer::token_url(
                                &config.network,
                                &config.contract_address,
                                token_id
                            )
                        );
                    }
                    if let Some(uri) = &success.metadata_uri {
                        println!("Metadata: {}", uri);
                    }
                }
                Err(err) => {
                    eprintln!("❌ {}", err.registration_message());
                    std::process::exit(1);
                }
            }
        }
        Command::Metadata { uri } => {
            let gateway = GatewayResolver::new(config.gateways.clone(), config.gateway_timeout())?;
            let value = gateway.fetch_metadata(&uri).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Certificate {
            id,
            metadata_uri,
            token_id,
        } => {
            let gateway = GatewayResolver::new(config.gateways.clone(), config.gateway_timeout())?;
            let resolver = CertificateResolver::new(
                gateway,
                config.network.clone(),
                config.contract_address.clone(),
            );
            match resolver.resolve(&id, &metadata_uri, &token_id).await {
                Ok(view) => {
                    match view.typed_metadata() {
                        Some(metadata) => {
                            println!("{}", metadata.name);
                            println!("{}", metadata.description);
                            for attribute in &metadata.attributes {
                                println!("  {}: {}", attribute.trait_type, attribute.value);
                            }
                        }
                        None => println!("{}", serde_json::to_string_pretty(&view.metadata)?),
                    }
                    println!("Token ID: {}", view.token_id);
                    println!("Explorer: {}", view.explorer_url);
                }
                Err(err) => {
                    eprintln!("❌ Failed to load NFT metadata: {}", err);
                    std::process::exit(1);
                }
            }
        }
        Command::History => {
            let workflow = lookup_workflow(&config, LedgerAccessor::unavailable())?;
            let history = workflow.history();
            if history.is_empty() {
                println!("No recent lookups");
            }
            for entry in history {
                println!("{:<16} {:<32} {}", entry.id, entry.status, entry.updated);
            }
        }
    }

    Ok(())
}

fn lookup_workflow(config: &ClientConfig, ledger: LedgerAccessor) -> Result<LookupWorkflow> {
    let repository = Arc::new(FileHistoryRepository::new(config.history_path.clone()));
    Ok(LookupWorkflow::new(ledger, repository)?)
}
