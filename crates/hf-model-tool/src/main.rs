//! hf-model-tool - inspect and clean up locally stored HuggingFace models.
//!
//! Thin command-line front end over `hf-model-core`: every command opens an
//! [`AssetRegistry`], runs one operation and renders the result.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hf_model_core::{AssetKind, AssetRegistry, DeclaredType, SortKey};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "hf-model-tool")]
#[command(about = "Inventory of HuggingFace cache models, custom checkpoints and LoRA adapters")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Registration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List discovered assets
    List {
        /// Sort order: size, name, date or type
        #[arg(long, default_value = "size")]
        sort: SortKey,

        /// Only show these kinds (repeatable)
        #[arg(long = "kind", value_name = "KIND")]
        kinds: Vec<AssetKind>,

        /// Also show suppressed duplicates
        #[arg(long)]
        include_secondary: bool,

        /// Rebuild the catalog even if the cached one is fresh
        #[arg(long)]
        refresh: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one asset by identity or path
    Details {
        identity: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete assets from disk
    Delete {
        #[arg(required = true)]
        identities: Vec<String>,

        /// Also delete suppressed duplicates of each asset
        #[arg(long)]
        include_secondary: bool,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Manage registered directories
    Dirs {
        #[command(subcommand)]
        command: DirsCommand,
    },

    /// Generate or edit a directory manifest
    Manifest {
        #[command(subcommand)]
        command: ManifestCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DirsCommand {
    /// Show registered and effective directories
    List,

    /// Register a directory
    Add {
        path: PathBuf,

        /// Directory type: huggingface, custom, lora or auto
        #[arg(long = "type", default_value = "auto")]
        declared: DeclaredType,
    },

    /// Unregister a directory
    Remove { path: PathBuf },

    /// Toggle scanning of the default HuggingFace caches
    ToggleDefault,
}

#[derive(Subcommand, Debug)]
enum ManifestCommand {
    /// Build a manifest from the directory's current contents
    Generate {
        root: PathBuf,

        /// Write it to the directory instead of printing it
        #[arg(long)]
        save: bool,
    },

    /// Set fields of one manifest entry
    Update {
        root: PathBuf,

        /// Entry path, relative to the root or absolute
        path: PathBuf,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        publisher: Option<String>,

        /// model, custom_model or lora_adapter
        #[arg(long = "type")]
        kind: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
}

fn init_logging(debug: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    } else {
        let log_level = if debug { Level::DEBUG } else { Level::INFO };
        FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);
    debug!("Running on {}", hf_model_core::platform::current_platform());

    let mut registry = match &args.config {
        Some(path) => AssetRegistry::open(path)?,
        None => AssetRegistry::open_default()?,
    };

    match args.command {
        Command::List {
            sort,
            kinds,
            include_secondary,
            refresh,
            json,
        } => commands::list(&mut registry, sort, kinds, include_secondary, refresh, json),
        Command::Details { identity, json } => commands::details(&mut registry, &identity, json),
        Command::Delete {
            identities,
            include_secondary,
            yes,
        } => commands::delete(&mut registry, &identities, include_secondary, yes),
        Command::Dirs { command } => match command {
            DirsCommand::List => commands::dirs_list(&registry),
            DirsCommand::Add { path, declared } => {
                commands::dirs_add(&mut registry, &path, declared)
            }
            DirsCommand::Remove { path } => commands::dirs_remove(&mut registry, &path),
            DirsCommand::ToggleDefault => commands::dirs_toggle(&mut registry),
        },
        Command::Manifest { command } => match command {
            ManifestCommand::Generate { root, save } => {
                commands::manifest_generate(&mut registry, &root, save)
            }
            ManifestCommand::Update {
                root,
                path,
                name,
                publisher,
                kind,
                notes,
            } => commands::manifest_update(
                &mut registry,
                &root,
                path,
                commands::FieldValues {
                    name,
                    publisher,
                    kind,
                    notes,
                },
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_flags() {
        let args = Args::try_parse_from([
            "hf-model-tool",
            "list",
            "--sort",
            "name",
            "--kind",
            "lora_adapter",
            "--kind",
            "custom",
            "--json",
        ])
        .unwrap();

        match args.command {
            Command::List {
                sort, kinds, json, ..
            } => {
                assert_eq!(sort, SortKey::Name);
                assert_eq!(kinds, vec![AssetKind::LoraAdapter, AssetKind::CustomModel]);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_dirs_add_type() {
        let args = Args::try_parse_from([
            "hf-model-tool",
            "--config",
            "/tmp/config.json",
            "dirs",
            "add",
            "/data/lora",
            "--type",
            "lora",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.json")));
        match args.command {
            Command::Dirs {
                command: DirsCommand::Add { declared, .. },
            } => assert_eq!(declared, DeclaredType::Lora),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_identity() {
        assert!(Args::try_parse_from(["hf-model-tool", "delete", "--yes"]).is_err());
    }

    #[test]
    fn test_invalid_sort_is_rejected() {
        assert!(Args::try_parse_from(["hf-model-tool", "list", "--sort", "color"]).is_err());
    }
}
