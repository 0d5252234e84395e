//! `designer` command line front-end

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use designer_catalog::{CatalogPort, StaticCatalog};
use designer_core::{ConfiguratorSession, ModelOptions, SessionConfig};
use designer_lifecycle::{DesignId, FileDesignStore, MemoryDesignStore, PersistencePort};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Log filter when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "designer", version, about = "Compose design documents from a component catalog")]
struct Cli {
    /// Session configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List catalog categories
    Categories(CatalogArgs),
    /// List the models of a category
    Models {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Category name
        #[arg(long)]
        category: String,
    },
    /// List the components of a model
    Components {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Model name
        #[arg(long)]
        model: String,
    },
    /// Build a design from component settings
    Compose(ComposeArgs),
    /// List stored designs
    List(StoreArgs),
    /// Print a stored design
    Show {
        #[command(flatten)]
        store: StoreArgs,
        /// Design id
        id: String,
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
    /// Delete a stored design
    Delete {
        #[command(flatten)]
        store: StoreArgs,
        /// Design id
        id: String,
    },
}

#[derive(Debug, Args)]
struct CatalogArgs {
    /// Catalog definition (YAML)
    #[arg(long)]
    catalog: PathBuf,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Design store directory
    #[arg(long)]
    store: PathBuf,
}

#[derive(Debug, Args)]
struct ComposeArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Category name
    #[arg(long)]
    category: String,
    /// Model name
    #[arg(long)]
    model: String,
    /// Component setting, `kind.field=value`; repeatable
    #[arg(long = "set", value_name = "KIND.FIELD=VALUE")]
    settings: Vec<String>,
    /// Design store directory; designs stay in memory when omitted
    #[arg(long)]
    store: Option<PathBuf>,
    /// Edit a stored design instead of starting a new one
    #[arg(long, requires = "store")]
    open: Option<String>,
    /// Persist the result
    #[arg(long)]
    save: bool,
    /// Print JSON instead of YAML
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Command::Categories(args) => {
            let session = catalog_session(&args.catalog, config).await?;
            for category in session.categories().await?.iter() {
                println!("{}", category.name);
            }
        }
        Command::Models { catalog, category } => {
            let session = catalog_session(&catalog.catalog, config).await?;
            session.select_category(&category).await?;
            match session.model_options() {
                ModelOptions::Options(models) => {
                    for model in models.iter() {
                        println!("{}\t{}", model.name, model.display_name);
                    }
                }
                ModelOptions::NoModels => eprintln!("category '{category}' has no models"),
                ModelOptions::Failed(err) => bail!("listing models failed: {err}"),
                ModelOptions::SelectCategoryFirst | ModelOptions::Loading => {}
            }
        }
        Command::Components { catalog, model } => {
            let session = catalog_session(&catalog.catalog, config).await?;
            for component in session.catalog().components(&model).await?.iter() {
                let marker = if component.has_invalid_schema() { " (invalid schema)" } else { "" };
                println!("{}{marker}", component.kind);
            }
        }
        Command::Compose(args) => compose(args, config).await?,
        Command::List(args) => {
            for id in FileDesignStore::new(args.store).list().await? {
                println!("{id}");
            }
        }
        Command::Show { store, id, json } => {
            let document = FileDesignStore::new(store.store)
                .fetch(&DesignId::new(id))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&document.to_json()?)?);
            } else {
                print!("{}", document.to_yaml()?);
            }
        }
        Command::Delete { store, id } => {
            let id = DesignId::new(id);
            let session = ConfiguratorSession::open(
                Arc::new(StaticCatalog::default()),
                Arc::new(FileDesignStore::new(store.store)),
                config,
                &id,
            )
            .await?;
            session.delete().await?;
            eprintln!("deleted design {id}");
        }
    }
    Ok(())
}

async fn load_catalog(path: &Path) -> Result<Arc<dyn CatalogPort>> {
    let catalog = StaticCatalog::load(path)
        .await
        .with_context(|| format!("loading catalog {}", path.display()))?;
    Ok(Arc::new(catalog))
}

async fn catalog_session(path: &Path, config: SessionConfig) -> Result<ConfiguratorSession> {
    Ok(ConfiguratorSession::new(
        load_catalog(path).await?,
        Arc::new(MemoryDesignStore::new()),
        config,
    ))
}

async fn compose(args: ComposeArgs, config: SessionConfig) -> Result<()> {
    let catalog = load_catalog(&args.catalog.catalog).await?;
    let persistence: Arc<dyn PersistencePort> = match &args.store {
        Some(dir) => Arc::new(FileDesignStore::new(dir)),
        None => Arc::new(MemoryDesignStore::new()),
    };
    let session = match &args.open {
        Some(id) => {
            ConfiguratorSession::open(catalog, persistence, config, &DesignId::new(id.as_str()))
                .await?
        }
        None => ConfiguratorSession::new(catalog, persistence, config),
    };

    session.select_category(&args.category).await?;
    session.select_model(&args.model).await?;

    for (kind, settings) in group_settings(&args.settings)? {
        let mut merged = session
            .document()
            .service(&kind)
            .map(|entry| entry.settings)
            .unwrap_or_default();
        merged.extend(settings);
        session
            .apply_component_settings(&kind, Value::Object(merged))
            .with_context(|| format!("applying settings of '{kind}'"))?;
    }

    if args.save {
        match session.design_id() {
            Some(id) => {
                session.update().await?;
                eprintln!("updated design {id}");
            }
            None => {
                let id = session.save().await?;
                eprintln!("saved design {id}");
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.to_json()?)?);
    } else {
        print!("{}", session.to_yaml()?);
    }
    Ok(())
}

/// Group `kind.field=value` assignments by component kind, in first-seen order
fn group_settings(assignments: &[String]) -> Result<IndexMap<String, Map<String, Value>>> {
    let mut grouped: IndexMap<String, Map<String, Value>> = IndexMap::new();
    for assignment in assignments {
        let Some((path, raw)) = assignment.split_once('=') else {
            bail!("expected kind.field=value, got '{assignment}'");
        };
        let Some((kind, field)) = path.split_once('.') else {
            bail!("expected kind.field=value, got '{assignment}'");
        };
        if kind.is_empty() || field.is_empty() {
            bail!("expected kind.field=value, got '{assignment}'");
        }
        grouped
            .entry(kind.to_string())
            .or_default()
            .insert(field.to_string(), parse_value(raw));
    }
    Ok(grouped)
}

/// YAML scalar syntax, so `2` is a number and `true` a bool; anything else is a string
fn parse_value(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
