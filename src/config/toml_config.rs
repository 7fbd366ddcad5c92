use crate::core::ConfigProvider;
use crate::domain::protocol::{ConversionMode, ConversionOptions};
use crate::utils::error::{ConvertError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").expect("environment variable pattern is valid")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    pub output: OutputConfig,
    pub upload: Option<UploadConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    pub mode: Option<ConversionMode>,
}

/// Every key is optional and falls back to [`ConversionOptions::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub batch_size: Option<usize>,
    pub progress_interval: Option<usize>,
    pub preview_rows: Option<usize>,
    pub delimiter: Option<char>,
    pub encoding: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// "compact" or "json"
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ConvertError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${IMPORT_API})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_file_extension("input.path", &self.input.path, &["dbf"])?;
        validation::validate_path("output.path", &self.output.path)?;

        let options = self.options();
        validation::validate_positive_number("conversion.batch_size", options.batch_size, 1)?;
        validation::validate_positive_number(
            "conversion.progress_interval",
            options.progress_interval,
            1,
        )?;
        validation::validate_delimiter("conversion.delimiter", options.delimiter)?;
        validation::validate_encoding("conversion.encoding", &options.encoding)?;

        if let Some(upload) = &self.upload {
            if upload.enabled.unwrap_or(true) {
                let endpoint = validation::validate_required_field("upload.endpoint", &upload.endpoint)?;
                validation::validate_url("upload.endpoint", endpoint)?;
            }
        }

        if let Some(format) = self.log_format() {
            if !matches!(format, "compact" | "json") {
                return Err(ConvertError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Supported formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn upload_timeout_seconds(&self) -> u64 {
        self.upload
            .as_ref()
            .and_then(|u| u.timeout_seconds)
            .unwrap_or(120)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_format(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_format.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn mode(&self) -> ConversionMode {
        self.input.mode.unwrap_or_default()
    }

    fn options(&self) -> ConversionOptions {
        let defaults = ConversionOptions::default();
        let c = &self.conversion;
        ConversionOptions {
            batch_size: c.batch_size.unwrap_or(defaults.batch_size),
            progress_interval: c.progress_interval.unwrap_or(defaults.progress_interval),
            preview_rows: c.preview_rows.unwrap_or(defaults.preview_rows),
            delimiter: c.delimiter.unwrap_or(defaults.delimiter),
            encoding: c.encoding.clone().unwrap_or(defaults.encoding),
            offset: c.offset.unwrap_or(defaults.offset),
            limit: c.limit.unwrap_or(defaults.limit),
        }
    }

    fn upload_endpoint(&self) -> Option<&str> {
        self.upload
            .as_ref()
            .filter(|u| u.enabled.unwrap_or(true))
            .and_then(|u| u.endpoint.as_deref())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
