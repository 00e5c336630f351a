pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod rate_limit;
pub mod sanitize;
pub mod server;
pub mod translate;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayReply, ResponseBody, Route};
pub use logging::SharedLogger;
pub use models::{ModelCatalog, ModelInfo, StaticModelCatalog, SupportedEndpoints};
pub use server::{build_router, AppState};
pub use upstream::{HttpUpstream, SseFrame, UpstreamClient};
