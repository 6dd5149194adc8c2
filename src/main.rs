use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recycle_lens::config;
use recycle_lens::detection::{build_detector, YoloParams};
use recycle_lens::knowledge::SqliteKnowledgeStore;
use recycle_lens::server::{metrics, run_server, state::ServerState, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the reference database, created if missing.
    #[clap(long, value_parser = parse_path, default_value = "data.db")]
    pub db_path: PathBuf,

    /// Directory where submitted images are stored and served from.
    #[clap(long, value_parser = parse_path, default_value = "static/uploads")]
    pub uploads_dir: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Largest accepted request body, e.g. "20 MiB".
    #[clap(long, default_value = config::DEFAULT_MAX_UPLOAD_SIZE)]
    pub max_upload_size: String,

    /// ONNX model exported from a YOLOv8 detector.
    #[clap(long, value_parser = parse_path)]
    pub model_path: Option<PathBuf>,

    /// Class names of the model, one per line, in class id order.
    #[clap(long, value_parser = parse_path)]
    pub labels_path: Option<PathBuf>,

    /// Side of the square model input.
    #[clap(long, default_value_t = YoloParams::default().input_size)]
    pub input_size: u32,

    /// Detections below this confidence are dropped.
    #[clap(long, default_value_t = YoloParams::default().confidence_threshold)]
    pub confidence_threshold: f32,

    /// Overlap above which same-class boxes are suppressed.
    #[clap(long, default_value_t = YoloParams::default().iou_threshold)]
    pub iou_threshold: f32,

    /// Maximum detections kept per image.
    #[clap(long, default_value_t = YoloParams::default().max_detections)]
    pub max_detections: usize,

    /// Name of the model input tensor.
    #[clap(long, default_value = "images")]
    pub input_name: String,

    /// Name of the model output tensor.
    #[clap(long, default_value = "output0")]
    pub output_name: String,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_path: args.db_path.clone(),
            uploads_dir: args.uploads_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            max_upload_size: args.max_upload_size.clone(),
            model_path: args.model_path.clone(),
            labels_path: args.labels_path.clone(),
            input_size: args.input_size,
            confidence_threshold: args.confidence_threshold,
            iou_threshold: args.iou_threshold,
            max_detections: args.max_detections,
            input_name: args.input_name.clone(),
            output_name: args.output_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_path: {:?}", app_config.db_path);
    info!("  uploads_dir: {:?}", app_config.uploads_dir);
    info!("  port: {}", app_config.port);
    info!("  model_path: {:?}", app_config.detector.model_path);

    info!("Initializing metrics...");
    metrics::init_metrics();

    if !app_config.db_path.exists() {
        info!("Creating new reference database at {:?}", app_config.db_path);
    }
    let knowledge_store = Arc::new(SqliteKnowledgeStore::new(&app_config.db_path)?);

    info!("Loading detector...");
    let detector = build_detector(&app_config.detector)?;

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level,
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        uploads_dir: app_config.uploads_dir,
        max_upload_bytes: app_config.max_upload_bytes,
    };
    let state = ServerState::new(server_config, detector, knowledge_store);

    run_server(state).await
}
