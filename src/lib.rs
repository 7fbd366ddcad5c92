pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{DbaseDecoder, HttpUploader};
pub use app::pipelines::DbfPipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{etl::EtlEngine, worker::ConversionWorker};
pub use domain::protocol::{ConversionMode, ConversionOptions, ConversionRequest, ConversionResponse};
pub use utils::error::{ConvertError, Result};
