//! # Cogwheel Runtime
//!
//! Turns a configuration file into a running bot:
//!
//! - layered configuration with figment ([`ConfigLoader`], [`CogwheelConfig`])
//! - `tracing-subscriber` setup ([`LoggingBuilder`])
//! - store bootstrap and adapter lifecycle ([`BotRuntime`])
//!
//! ```rust,ignore
//! use cogwheel_runtime::BotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BotRuntime::builder()
//!         .factory(cogwheel_commands::builtin_factory())
//!         .build()
//!         .await?;
//!     runtime.register_adapter::<MyAdapter>().await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{CogwheelConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BotRuntime, RuntimeBuilder};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler and adapter code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
