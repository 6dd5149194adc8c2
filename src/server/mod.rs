pub mod config;
mod http_layers;
pub mod metrics;
pub mod pipeline;
mod render;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;
pub mod storage;

pub use config::ServerConfig;
pub use http_layers::*;
pub use render::{escape_html, render_result};
pub use server::{make_app, make_metrics_app, run_server};
