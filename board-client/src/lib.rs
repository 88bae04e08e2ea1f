mod config;
mod error;
mod http_client;
mod logging;
mod realtime_client;

pub use config::{ClientConfig, DEFAULT_TABLE};
pub use error::BoardClientError;
pub use http_client::BoardClientHttp;
pub use logging::init_logging;
pub use realtime_client::RealtimeSubscription;
