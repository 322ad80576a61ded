pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use api::{ApiClient, AuthorizedSink, User};
pub use config::ApiConfig;
pub use error::{ClientError, ConfigError};
pub use session::Session;
