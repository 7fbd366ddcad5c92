pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::protocol::{ConversionMode, ConversionOptions};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_delimiter, validate_encoding, validate_file_extension, validate_path,
    validate_positive_number, validate_url, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "dbf-convert")]
#[command(about = "Convert legacy dBase tables into CSV for the product importer")]
pub struct CliConfig {
    /// DBF file to convert
    #[arg(short, long)]
    pub input: String,

    /// Directory the CSV is written to
    #[arg(short, long = "output", default_value = "./output")]
    pub output_path: String,

    /// raw: every source column; canonical: the product import schema
    #[arg(short, long, default_value = "canonical")]
    pub mode: ConversionMode,

    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    #[arg(long, default_value_t = 2000)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1000)]
    pub progress_interval: usize,

    #[arg(long, default_value_t = 10)]
    pub preview_rows: usize,

    /// Records to skip before converting
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Maximum records to convert, 0 for all
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Code page of the DBF text fields
    #[arg(long, default_value = "windows-1252")]
    pub encoding: String,

    /// Base URL of the shop API; canonical output is uploaded when set
    #[arg(long)]
    pub upload_endpoint: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process memory and CPU between stages")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn mode(&self) -> ConversionMode {
        self.mode
    }

    fn options(&self) -> ConversionOptions {
        ConversionOptions {
            batch_size: self.batch_size,
            progress_interval: self.progress_interval,
            preview_rows: self.preview_rows,
            delimiter: self.delimiter,
            encoding: self.encoding.clone(),
            offset: self.offset,
            limit: self.limit,
        }
    }

    fn upload_endpoint(&self) -> Option<&str> {
        self.upload_endpoint.as_deref()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input)?;
        validate_file_extension("input", &self.input, &["dbf"])?;
        validate_path("output_path", &self.output_path)?;
        validate_positive_number("batch_size", self.batch_size, 1)?;
        validate_positive_number("progress_interval", self.progress_interval, 1)?;
        validate_delimiter("delimiter", self.delimiter)?;
        validate_encoding("encoding", &self.encoding)?;

        if let Some(endpoint) = &self.upload_endpoint {
            validate_url("upload_endpoint", endpoint)?;
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = CliConfig::parse_from(["dbf-convert", "--input", "STOCK.DBF"]);

        assert_eq!(config.mode, ConversionMode::Canonical);
        assert_eq!(config.options(), ConversionOptions::default());
        assert!(config.upload_endpoint().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let config = CliConfig::parse_from([
            "dbf-convert",
            "-i",
            "data/stock.dbf",
            "--mode",
            "raw",
            "--delimiter",
            ";",
            "--limit",
            "50",
            "--upload-endpoint",
            "https://shop.example.com",
        ]);

        assert_eq!(config.mode(), ConversionMode::Raw);
        assert_eq!(config.options().delimiter, ';');
        assert_eq!(config.options().limit, 50);
        assert_eq!(config.upload_endpoint(), Some("https://shop.example.com"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CliConfig::parse_from(["dbf-convert", "--input", "stock.csv"]);
        assert!(config.validate().is_err());

        config.input = "stock.dbf".to_string();
        config.delimiter = '"';
        assert!(config.validate().is_err());

        config.delimiter = ',';
        config.encoding = "klingon".to_string();
        assert!(config.validate().is_err());

        config.encoding = "cp850".to_string();
        config.upload_endpoint = Some("ftp://shop".to_string());
        assert!(config.validate().is_err());
    }
}
