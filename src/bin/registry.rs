//! Charity Registry CLI
//!
//! Commands for listing, querying and removing charities in a registry store.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use charity_registry::{
    CallContext, Identity, NewCharity, RegistryConfig, RegistryStore, RegistryState,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "charity-registry")]
#[command(about = "Authorized registry of charity listings")]
struct Cli {
    /// Config file to load on top of the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the registry store (overrides config)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Identity issuing the command (overrides registry.default_caller)
    #[arg(long, global = true)]
    caller: Option<Identity>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new registry
    Init {
        /// Administrator identity (defaults to registry.administrator, then the caller)
        #[arg(long)]
        admin: Option<Identity>,
    },

    /// List a new charity
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Funding goal in the smallest currency unit
        #[arg(short, long)]
        goal: u128,
        #[arg(long)]
        duration: u64,
    },

    /// Show a charity by id
    Get { id: u64 },

    /// Show every slot, including the sentinel and deleted entries
    List {
        /// Only show live charities
        #[arg(long)]
        active: bool,
    },

    /// Show the number of charities ever created
    Counter,

    /// Show the registry administrator
    Owner,

    /// Delete a charity (creator or administrator only)
    Delete { id: u64 },

    /// Verify the state checksum
    Verify,

    /// Show registry statistics
    Stats,

    /// Inspect or write configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to a file
    Init {
        #[arg(default_value = "charity.toml")]
        path: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        RegistryConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = &cli.store {
        config.registry.path = path.clone();
    }
    let caller = cli.caller.or(config.registry.default_caller);
    let format = config.output.format;

    match cli.command {
        Commands::Init { admin } => {
            let Some(admin) = config.init_administrator(admin, caller) else {
                bail!("no administrator: pass --admin, set registry.administrator or pass --caller");
            };
            let store = RegistryStore::init(config.store_path(), admin)?;
            println!("✅ Registry initialized at {:?}", store.root());
            println!("👤 Administrator: {}", admin);
        }

        Commands::Create {
            name,
            description,
            goal,
            duration,
        } => {
            let ctx = call_context(caller)?;
            let store = RegistryStore::open(config.store_path())?;
            let mut sink = config.event_sink(&store);
            let listing = NewCharity::new(name, description, goal, duration);
            let id = store.transact(&mut sink, |registry| {
                Ok(registry.create_charity(&ctx, listing))
            })?;
            println!("✅ Listed charity {}", id);
        }

        Commands::Get { id } => {
            let store = RegistryStore::open(config.store_path())?;
            let charity = store.read(|registry| registry.get_charity(id))?;
            println!("{}", format.render(&charity)?);
        }

        Commands::List { active } => {
            let store = RegistryStore::open(config.store_path())?;
            let mut charities = store.read(|registry| registry.get_charities())?;
            if active {
                charities.retain(|c| !c.is_empty());
            }
            println!("{}", format.render(&charities)?);
        }

        Commands::Counter => {
            let store = RegistryStore::open(config.store_path())?;
            println!("{}", store.read(|registry| registry.get_counter())?);
        }

        Commands::Owner => {
            let store = RegistryStore::open(config.store_path())?;
            println!("{}", store.read(|registry| registry.get_contract_owner())?);
        }

        Commands::Delete { id } => {
            let ctx = call_context(caller)?;
            let store = RegistryStore::open(config.store_path())?;
            let mut sink = config.event_sink(&store);
            store.transact(&mut sink, |registry| registry.delete_charity(&ctx, id))?;
            println!("🗑️  Deleted charity {}", id);
        }

        Commands::Verify => {
            let store = RegistryStore::open(config.store_path())?;
            if store.verify()? {
                println!("✅ State checksum verified");
            } else {
                eprintln!("❌ State checksum verification failed");
                std::process::exit(1);
            }
        }

        Commands::Stats => {
            let store = RegistryStore::open(config.store_path())?;
            let state: RegistryState = store.load()?;
            let active = state.active_count();
            let deleted = state.deleted_count();

            println!("📊 Registry Statistics");
            println!();
            println!("Administrator: {}", state.administrator);
            println!("Total created: {}", state.counter);
            println!("Active:        {}", active);
            println!("Deleted:       {}", deleted);
        }

        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommand::Init { path } => {
                config.save(&path)?;
                println!("✅ Wrote configuration to {}", path);
            }
        },
    }

    Ok(())
}

fn call_context(caller: Option<Identity>) -> anyhow::Result<CallContext> {
    match caller {
        Some(caller) => Ok(CallContext::new(caller)),
        None => bail!("no caller: pass --caller or set registry.default_caller"),
    }
}
