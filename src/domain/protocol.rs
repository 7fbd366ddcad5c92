//! Messages exchanged between a host and a conversion worker.
//!
//! A host sends exactly one [`ConversionRequest`] and receives a stream of
//! [`ConversionResponse`]s that ends with exactly one terminal response:
//! [`ConversionResponse::Complete`], [`ConversionResponse::CanonicalComplete`]
//! or [`ConversionResponse::Error`].

use crate::domain::model::{OutputBuffer, ProcessingPhase, Record};
use serde::{Deserialize, Serialize};

/// Percent reported while decoding, when the total is not yet known.
pub const INDETERMINATE_PERCENT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    /// Every source column, untouched.
    Raw,
    /// The fixed product import schema.
    #[default]
    Canonical,
}

impl ConversionMode {
    /// The commands that make up this mode's pipeline, in order.
    pub fn commands(self, buffer: Vec<u8>) -> Vec<Command> {
        match self {
            Self::Raw => vec![Command::Decode(buffer), Command::MapRaw],
            Self::Canonical => vec![Command::Decode(buffer), Command::MapCanonical],
        }
    }
}

impl std::str::FromStr for ConversionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "dbf" => Ok(Self::Raw),
            "canonical" | "api" => Ok(Self::Canonical),
            other => Err(format!("unknown conversion mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Canonical => write!(f, "canonical"),
        }
    }
}

/// Tuning knobs carried with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub batch_size: usize,
    pub progress_interval: usize,
    pub preview_rows: usize,
    pub delimiter: char,
    pub encoding: String,
    pub offset: usize,
    /// 0 keeps every record after `offset`.
    pub limit: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            batch_size: 2000,
            progress_interval: 1000,
            preview_rows: 10,
            delimiter: ',',
            encoding: "windows-1252".to_string(),
            offset: 0,
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub mode: ConversionMode,
    #[serde(with = "buffer_as_len", default)]
    pub buffer: Vec<u8>,
    #[serde(default)]
    pub options: ConversionOptions,
}

impl ConversionRequest {
    pub fn new(mode: ConversionMode, buffer: Vec<u8>) -> Self {
        Self {
            mode,
            buffer,
            options: ConversionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Requests are logged, and a raw dump of the buffer is useless there.
mod buffer_as_len {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(buffer: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(buffer.len() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let _ = u64::deserialize(deserializer)?;
        Ok(Vec::new())
    }
}

/// Internal steps of a pipeline. The controller matches on these
/// exhaustively, so a new pipeline step cannot be left unhandled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Decode(Vec<u8>),
    MapRaw,
    MapCanonical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConversionResponse {
    Progress {
        phase: ProcessingPhase,
        percent: i32,
    },
    Preview {
        fields: Vec<String>,
        rows: Vec<Record>,
        total_count: usize,
    },
    Complete {
        output: OutputBuffer,
        total_count: usize,
        fields: Vec<String>,
    },
    CanonicalComplete {
        output: OutputBuffer,
        total_count: usize,
        fields: Vec<String>,
    },
    Error {
        message: String,
    },
}

impl ConversionResponse {
    pub fn progress(phase: ProcessingPhase, percent: i32) -> Self {
        Self::Progress { phase, percent }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::CanonicalComplete { .. } | Self::Error { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Preview { .. } => "preview",
            Self::Complete { .. } => "complete",
            Self::CanonicalComplete { .. } => "canonical-complete",
            Self::Error { .. } => "error",
        }
    }
}
