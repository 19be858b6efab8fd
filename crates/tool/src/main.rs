//! protoforge command line
//!
//! Loads packages and levels through a [`ModelManager`] configured from
//! `configs/core.toml`, and writes them back:
//!
//! ```text
//! protoforge inspect-package props    list every object of props.apkg
//! protoforge dump props crate         print the container crate saves to
//! protoforge resave-package props     load and save props.apkg in place
//! protoforge resave-level yard -o out load yard.alvl and save it to out/
//! protoforge spawn yard crate --set '{"visible": false}'
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use protoforge_core::config::{core_config_path, protoforge_base_dir};
use protoforge_core::{save_object, CacheSet, CoreConfig, ModelManager, SaveContext};
use protoforge_engine::{codec, Container};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "protoforge")]
#[command(about = "Load, inspect and resave protoforge content", long_about = None)]
#[command(version)]
struct Cli {
    /// Core config file (defaults to configs/core.toml under the base dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Content root, overriding the config
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Write every property, including those still at their default
    #[arg(long, global = true)]
    keep_defaults: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the class objects and instances of a package
    InspectPackage {
        /// Package id (directory name without .apkg)
        package: String,
    },

    /// Print the container an object would be saved as
    Dump {
        /// Package id
        package: String,
        /// Object id
        id: String,
    },

    /// Load a package and save it back
    ResavePackage {
        /// Package id
        package: String,
        /// Output directory (defaults to the package directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Load a level and its packages and save the level back
    ResaveLevel {
        /// Level id (directory name without .alvl)
        level: String,
        /// Output directory (defaults to the level directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Clone a prototype into a level and save the level
    Spawn {
        /// Level id
        level: String,
        /// Prototype id
        prototype: String,
        /// Id of the new instance (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// JSON object of properties to set on the new instance
        #[arg(long)]
        set: Option<String>,
    },
}

fn load_manager(cli: &Cli) -> anyhow::Result<ModelManager> {
    let base = protoforge_base_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => core_config_path().context("Failed to resolve core config path")?,
    };
    let mut config = CoreConfig::load_from(&config_path)
        .with_context(|| format!("Failed to load config {:?}", config_path))?;

    init_tracing(config.debug);

    if let Some(root) = &cli.root {
        config.resources.root = root.clone();
    }
    if cli.keep_defaults {
        config.save.skip_default_values = false;
    }

    let manager = ModelManager::from_config(&config, &base);
    tracing::debug!("Content root {:?}", manager.locator().root());
    Ok(manager)
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_set(label: &str, set: &CacheSet) {
    println!("{} ({})", label, set.len());
    for object in set.iter() {
        let class = object
            .class_obj()
            .map(|c| format!(" <- {}", c))
            .unwrap_or_default();
        let member = if object.header().is_member() {
            format!(" [{}:{}]", object.order_idx(), object.parent_idx())
        } else {
            String::new()
        };
        println!(
            "  {:<32} {:<24} {:<12}{}{}",
            object.id().as_str(),
            object.object_type(),
            object.architype().as_str(),
            member,
            class
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut manager = load_manager(&cli)?;

    match &cli.command {
        Commands::InspectPackage { package } => {
            let package = manager.load_package(package)?;
            println!("{} - {:?}", package.id(), package.path());
            print_set("class objects", package.class_objects());
            print_set("instances", package.instances());
        }

        Commands::Dump { package, id } => {
            manager.load_package(package)?;
            let Some(object) = manager.find_object(id) else {
                bail!("Object '{}' not found", id);
            };
            let container = save_object(object, &SaveContext::new(&manager))?;
            print!("{}", codec::encode(&Container::Object(container))?);
        }

        Commands::ResavePackage { package, out } => {
            manager.load_package(package)?;
            let written = manager.save_package(package, out.as_deref())?;
            println!("Saved {} files", written);
        }

        Commands::ResaveLevel { level, out } => {
            manager.load_level(level)?;
            let written = manager.save_level(level, out.as_deref())?;
            println!("Saved {} files", written);
        }

        Commands::Spawn {
            level,
            prototype,
            id,
            set,
        } => {
            manager.load_level(level)?;
            let new_id = manager.spawn_object(level, prototype, id.as_deref())?;

            if let Some(set) = set {
                let patch: serde_json::Value =
                    serde_json::from_str(set).context("--set is not valid JSON")?;
                let Some(patch) = patch.as_object() else {
                    bail!("--set must be a JSON object");
                };
                let changed = manager.update_object(level, &new_id, patch)?;
                println!("Updated {} properties", changed);
            }

            let written = manager.save_level(level, None)?;
            println!("Spawned '{}' ({} files saved)", new_id, written);
        }
    }

    Ok(())
}
