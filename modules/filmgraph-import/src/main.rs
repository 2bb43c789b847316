use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use filmgraph_common::{AppConfig, FileConfig};
use filmgraph_graph::{
    ensure_identity_constraints, FilmGraphStore, GraphClient, MemoryGraph, NodeLabel,
};
use filmgraph_import::{
    run_linker, BarProgress, DocumentSource, ImportPipeline, JsonLinesSource, LogProgress,
    MongoSource, ProgressSink,
};

#[derive(Parser)]
#[command(name = "filmgraph", about = "Load film documents into a Neo4j graph")]
#[command(version)]
struct Cli {
    /// Path to config TOML file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import documents into the graph, then optionally link project members
    Import(ImportArgs),

    /// Attach project members to a film by exact title
    Link {
        /// Film title to link to (falls back to [linker].film_title)
        #[arg(long)]
        film: Option<String>,

        /// Member name; repeat for several (falls back to [linker].members)
        #[arg(long = "member")]
        members: Vec<String>,
    },

    /// Create the identity uniqueness constraints
    Migrate,

    /// Print node and relationship counts
    Stats {
        /// Only count nodes with this label
        #[arg(long)]
        label: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// Records per transaction
    #[arg(long)]
    batch_size: Option<usize>,

    /// MongoDB database name
    #[arg(long)]
    database: Option<String>,

    /// MongoDB collection name
    #[arg(long)]
    collection: Option<String>,

    /// Read a JSON Lines export instead of MongoDB
    #[arg(long)]
    from_file: Option<PathBuf>,

    /// Write to an in-memory graph and report what would be created
    #[arg(long)]
    dry_run: bool,

    /// Link project members to this film title after the import
    #[arg(long)]
    link_film: Option<String>,

    /// Project member to link; repeat for several
    #[arg(long = "link-member")]
    link_members: Vec<String>,

    /// Log progress instead of drawing a progress bar
    #[arg(long)]
    no_progress: bool,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filmgraph=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    let mut file_config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading config");
            filmgraph_common::file_config::load_config(path)?
        }
        None => FileConfig::default(),
    };
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Import(args) => {
            if let Some(size) = args.batch_size {
                file_config.import.batch_size = size;
            }
            if let Some(database) = args.database.clone() {
                file_config.source.database = database;
            }
            if let Some(collection) = args.collection.clone() {
                file_config.source.collection = collection;
            }
            file_config.validate()?;
            cmd_import(&config, &file_config, args).await
        }
        Commands::Link { film, members } => {
            let film = film
                .or_else(|| file_config.linker.film_title.clone())
                .context("No film title given. Pass --film or set [linker].film_title")?;
            let members = if members.is_empty() {
                file_config.linker.members.clone()
            } else {
                members
            };
            let store = connect_neo4j(&config).await?;
            let counters = run_linker(&store, &members, &film)
                .await
                .context("Linking project members failed")?;
            println!("Linked {} members to \"{film}\": {counters}", members.len());
            Ok(())
        }
        Commands::Migrate => {
            let store = connect_neo4j(&config).await?;
            let report = ensure_identity_constraints(&store).await;
            println!("Constraints ensured: {}", report.ensured.join(", "));
            if !report.failed.is_empty() {
                for (name, error) in &report.failed {
                    eprintln!("  {name}: {error}");
                }
                bail!("{} constraint(s) could not be created", report.failed.len());
            }
            Ok(())
        }
        Commands::Stats { label, json } => {
            let store = connect_neo4j(&config).await?;
            if let Some(label) = label {
                let label: NodeLabel = label.parse()?;
                let count = store.count_label(label).await?;
                if json {
                    println!("{}", serde_json::json!({ "label": label.as_str(), "count": count }));
                } else {
                    println!(":{} {count}", label.as_str());
                }
            } else {
                let stats = store.stats().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    print!("{stats}");
                }
            }
            Ok(())
        }
    }
}

async fn connect_neo4j(config: &AppConfig) -> Result<GraphClient> {
    let creds = config.neo4j()?;
    let client = GraphClient::connect(&creds.uri, &creds.user, &creds.password)
        .await
        .with_context(|| format!("Failed to connect to Neo4j at {}", creds.uri))?;
    tracing::info!(uri = creds.uri.as_str(), "Connected to Neo4j");
    Ok(client)
}

async fn cmd_import(config: &AppConfig, file_config: &FileConfig, args: ImportArgs) -> Result<()> {
    let batch_size = file_config.import.batch_size;

    let mut source: Box<dyn DocumentSource> = match &args.from_file {
        Some(path) => Box::new(
            JsonLinesSource::open(path, &file_config.source, &file_config.fields).await?,
        ),
        None => Box::new(
            MongoSource::open(
                config.mongodb_uri()?,
                &file_config.source,
                &file_config.fields,
                batch_size,
            )
            .await
            .context("Failed to open MongoDB source")?,
        ),
    };

    let store: Box<dyn FilmGraphStore> = if args.dry_run {
        tracing::info!("Dry run: writing to an in-memory graph");
        Box::new(MemoryGraph::new())
    } else {
        Box::new(connect_neo4j(config).await?)
    };

    let mut progress: Box<dyn ProgressSink> = if args.no_progress {
        Box::new(LogProgress)
    } else {
        Box::new(BarProgress::new())
    };

    let pipeline = ImportPipeline::new(store.as_ref(), file_config.fields.clone(), batch_size);
    let summary = pipeline
        .run(source.as_mut(), progress.as_mut())
        .await
        .context("Import failed")?;

    println!("Imported: {summary}");
    if summary.constraint_failures > 0 {
        eprintln!(
            "Warning: {} identity constraint(s) could not be created",
            summary.constraint_failures
        );
    }

    // The import above is already committed; a linker failure is reported on its own.
    let link_film = args
        .link_film
        .or_else(|| file_config.linker.film_title.clone());
    let link_members = if args.link_members.is_empty() {
        file_config.linker.members.clone()
    } else {
        args.link_members
    };
    let link_result = match link_film {
        Some(film) if !link_members.is_empty() => {
            Some(run_linker(store.as_ref(), &link_members, &film).await)
        }
        _ => None,
    };

    match store.stats().await {
        Ok(stats) => print!("{stats}"),
        Err(e) => tracing::warn!(error = %e, "Could not read graph statistics"),
    }

    match link_result {
        Some(Ok(counters)) => {
            println!("Linked project members: {counters}");
            Ok(())
        }
        Some(Err(e)) => Err(e).context("Linking project members failed (import was committed)"),
        None => Ok(()),
    }
}
