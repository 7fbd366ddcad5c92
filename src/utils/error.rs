use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to decode input: {message}")]
    DecodeError { message: String },

    #[error("The input file contains no records")]
    EmptyInput,

    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Upload request failed: {0}")]
    UploadError(#[from] reqwest::Error),

    #[error("Upload rejected with status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Conversion was cancelled")]
    Cancelled,

    #[error("Worker failed: {message}")]
    WorkerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Processing,
    Output,
    Network,
    Configuration,
    Lifecycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConvertError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DecodeError { .. } | Self::EmptyInput | Self::ConversionFailed { .. } => {
                ErrorCategory::Input
            }
            Self::CsvError(_) | Self::ProcessingError { .. } => ErrorCategory::Processing,
            Self::IoError(_) => ErrorCategory::Output,
            Self::UploadError(_) | Self::UploadRejected { .. } => ErrorCategory::Network,
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::Cancelled | Self::WorkerError { .. } => ErrorCategory::Lifecycle,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled => ErrorSeverity::Low,
            Self::UploadError(_) | Self::UploadRejected { .. } => ErrorSeverity::Medium,
            Self::WorkerError { .. } | Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the file is a valid dBase table and that the configured encoding matches it"
            }
            ErrorCategory::Processing => "Re-run with --verbose and inspect the offending records",
            ErrorCategory::Output => "Check that the output directory exists and is writable",
            ErrorCategory::Network => {
                "Check the upload endpoint and retry; the generated CSV was kept on disk"
            }
            ErrorCategory::Configuration => "Review the command line flags or the TOML file",
            ErrorCategory::Lifecycle => "Start a new conversion",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EmptyInput => "The DBF file has no records to convert".to_string(),
            Self::DecodeError { .. } => format!("Could not read the DBF file ({})", self),
            Self::ConversionFailed { message } => format!("The DBF file could not be converted: {}", message),
            Self::Cancelled => "Conversion cancelled".to_string(),
            Self::UploadError(_) | Self::UploadRejected { .. } => {
                format!("The CSV was generated but the upload failed ({})", self)
            }
            _ => self.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
