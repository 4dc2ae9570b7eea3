pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use context::RunContext;
pub use error::AgentError;
