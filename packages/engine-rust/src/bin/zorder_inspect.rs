//! Inspect and maintain a `zorder` JSON preferences file.
//!
//! ```text
//! zorder-inspect --store prefs/orders.json list
//! zorder-inspect show "Image Layers" "Image Data"
//! zorder-inspect compress "Image Layers" "Image Data"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zorder_core::persistence_key;
use zorder_engine::{FileOrderStore, OrderManagerRegistry, OrderStore};

#[derive(Debug, Parser)]
#[command(name = "zorder-inspect", about = "Inspect persisted layer orderings")]
struct Cli {
    /// Path to the JSON preferences file.
    #[arg(long, env = "ZORDER_STORE", default_value = "orders.json")]
    store: PathBuf,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every persisted `family::category` record.
    List,
    /// Print one record's participants in ascending order.
    Show { family: String, category: String },
    /// Renumber one record's participants to consecutive orders.
    Compress { family: String, category: String },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let store = Arc::new(FileOrderStore::open(&cli.store)?);
    match cli.command {
        Command::List => {
            for key in store.keys()? {
                println!("{key}");
            }
        }
        Command::Show { family, category } => {
            let key = persistence_key(&family, &category);
            let record = store
                .load(&key)?
                .with_context(|| format!("no record stored under {key}"))?;
            println!("{} ({})", key, record.category);
            let mut participants = record.participants;
            participants.sort_by_key(|p| p.order);
            for participant in participants {
                println!("{:>12}  {}", participant.order, participant.id);
            }
        }
        Command::Compress { family, category } => {
            let key = persistence_key(&family, &category);
            let record = store
                .load(&key)?
                .with_context(|| format!("no record stored under {key}"))?;
            let registry = OrderManagerRegistry::new(Arc::clone(&store) as Arc<dyn OrderStore>);
            let manager = registry.get_order_manager(&family, &record.category);
            let renumbered = manager.compress_orders();
            info!(key = %key, renumbered, "compressed orders");
        }
    }
    Ok(())
}
