use clap::{Parser, Subcommand};
use photoframe_server::cache::ThumbnailCache;
use photoframe_server::config::{self, ServerConfig};
use photoframe_server::device::DeviceHints;
use photoframe_server::imaging::{FontSet, OverlayRenderer};
use photoframe_server::pipeline::{Collaborators, FrameOutput, FrameRequest, Pipeline};
use photoframe_server::processing::{CommandDelegate, InProcessDelegate, ProcessingDelegate};
use photoframe_server::server;
use photoframe_server::store::SqliteStore;
use photoframe_server::types::SourceFilter;
use photoframe_server::upstream::{FsAssetLoader, HttpPlaceholder, OpenMeteo};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "photoframe-server")]
#[command(about = "Composes and serves photos for e-paper picture frames")]
#[command(long_about = "\
Composes and serves photos for e-paper picture frames

Each request to /image/<source> picks a photo (or a two-photo collage) from
the pool, fits it to the requesting panel, optionally draws the date and
current weather, and runs the result through the processing step.

Routes:

  GET /image/{google_photos|synology|telegram}      one composed frame (PNG)
  GET /image/telegram/updates/<cursor>              next chat photo after <cursor>
  GET /served-image-thumbnail/<id>                  preview of a served frame
  GET /api/status                                   health check

Device headers:
  X-Hostname, X-Display-Width, X-Display-Height, X-Display-Orientation,
  X-Processing-Settings, X-Color-Palette

Run 'photoframe-server gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML). Stock defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `listen`
    #[arg(long, global = true)]
    listen: Option<String>,

    /// Photo and scratch directory, overrides `data_dir`
    #[arg(long, env = "DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// SQLite database, overrides `database`
    #[arg(long, env = "DB_PATH", global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Compose one frame and write the processed bytes to a file
    Render(RenderArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Source route name: google_photos, synology or telegram
    #[arg(long, default_value = "google_photos")]
    source: String,

    /// Device hostname to resolve a stored profile
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// portrait or landscape
    #[arg(long)]
    orientation: Option<String>,

    /// Ordered delivery: render the item after this cursor
    #[arg(long)]
    after: Option<i64>,

    /// Raw X-Processing-Settings JSON
    #[arg(long)]
    settings: Option<String>,

    #[arg(long, short, default_value = "frame.png")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        None | Some(Command::Serve) => serve(&cli)?,
        Some(Command::Render(args)) => render_to_file(&cli, args)?,
        Some(Command::GenConfig) => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,photoframe_server=debug")),
        )
        .init();
}

fn serve(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = load_config(cli)?;
    let addr = config.listen_addr()?;

    // Blocking HTTP clients must be built outside the runtime, and the
    // pipeline declared first so it is dropped after it.
    let pipeline = build_pipeline(&config)?;
    match pipeline.thumbnails().sweep() {
        Ok(stats) => tracing::info!(dir = %config.data_dir.display(), "{stats}"),
        Err(e) => tracing::warn!(error = %e, "thumbnail sweep failed"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(server::serve(pipeline.clone(), addr, shutdown_signal()))?;
    tracing::info!("server stopped");
    Ok(())
}

fn render_to_file(cli: &Cli, args: &RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = load_config(cli)?;
    let pipeline = build_pipeline(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let output = runtime.block_on(render(&pipeline, args))?;
    std::fs::write(&args.output, &output.image)?;
    println!("{} bytes → {} ({:?})", output.image.len(), args.output.display(), output.kind);
    if let Some(thumb) = output.thumbnail {
        println!("preview: {}", thumb.path.display());
    }
    Ok(())
}

/// Load the config file, then apply command-line and environment overrides.
fn load_config(cli: &Cli) -> Result<ServerConfig, config::ConfigError> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(listen) = &cli.listen {
        config.listen = listen.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    config.validate()?;
    Ok(config)
}

fn build_pipeline(config: &ServerConfig) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::open(&config.database_path())?);
    tracing::info!(database = %store.path().display(), "opened store");

    let mut loader = FsAssetLoader::new(&config.data_dir);
    if let Some(base_url) = &config.remote.base_url {
        loader = loader.with_remote(base_url, config.remote.timeout())?;
    }
    let placeholder = HttpPlaceholder::new(&config.placeholder.url, config.placeholder.timeout())?;
    let weather = OpenMeteo::new(&config.weather.base_url, config.weather.timeout())?;

    let delegate: Arc<dyn ProcessingDelegate> = match &config.processing.command {
        Some(command) => {
            tracing::info!(command = %command.display(), "using external processing command");
            Arc::new(CommandDelegate::new(command, config.processing.args.clone()))
        }
        None => {
            tracing::info!("using in-process processing");
            Arc::new(InProcessDelegate::new())
        }
    };

    let fonts = FontSet::load(&config.fonts.text, &config.fonts.icons);
    let collaborators = Collaborators {
        assets: store.clone(),
        profiles: store,
        loader: Arc::new(loader),
        placeholder: Arc::new(placeholder),
        delegate,
        overlay: OverlayRenderer::new(fonts, Arc::new(weather)),
    };
    Ok(Pipeline::new(collaborators, ThumbnailCache::new(&config.data_dir)))
}

async fn render(pipeline: &Pipeline, args: &RenderArgs) -> Result<FrameOutput, Box<dyn std::error::Error>> {
    let filter =
        SourceFilter::from_route(&args.source).ok_or_else(|| format!("unknown source '{}'", args.source))?;
    let request = FrameRequest {
        hints: DeviceHints {
            hostname: args.host.clone(),
            client_addr: None,
            width: args.width.map(|w| w.to_string()),
            height: args.height.map(|h| h.to_string()),
            orientation: args.orientation.clone(),
        },
        settings: args.settings.clone(),
        palette: None,
    };

    match args.after {
        Some(cursor) => {
            let kind = filter
                .kind()
                .ok_or_else(|| format!("'{}' has no ordered delivery", args.source))?;
            let update = pipeline
                .serve_ordered(kind, cursor, request)
                .await?
                .ok_or("no newer item")?;
            println!("sequence: {}", update.sequence);
            Ok(update.frame)
        }
        None => Ok(pipeline.serve_frame(filter, request).await?),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
