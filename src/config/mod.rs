pub mod settings;

pub use settings::{AdapterConfig, LoggingConfig, Settings};
