use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded row: field name to primitive value, in the order the decoder
/// produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

/// Column order of the product import endpoint.
pub const CANONICAL_HEADERS: [&str; 14] = [
    "sku",
    "name",
    "description",
    "regular_price",
    "sale_price",
    "special_price",
    "category_slug",
    "image_url",
    "video_url",
    "weight",
    "dimension_length",
    "dimension_width",
    "dimension_height",
    "is_active",
];

pub fn canonical_headers() -> Vec<String> {
    CANONICAL_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// A record mapped onto the product import schema. Every column is already
/// rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub regular_price: String,
    pub sale_price: String,
    pub special_price: String,
    pub category_slug: String,
    pub image_url: String,
    pub video_url: String,
    pub weight: String,
    pub dimension_length: String,
    pub dimension_width: String,
    pub dimension_height: String,
    pub is_active: String,
}

impl CanonicalRow {
    pub fn into_columns(self) -> [String; 14] {
        [
            self.sku,
            self.name,
            self.description,
            self.regular_price,
            self.sale_price,
            self.special_price,
            self.category_slug,
            self.image_url,
            self.video_url,
            self.weight,
            self.dimension_length,
            self.dimension_width,
            self.dimension_height,
            self.is_active,
        ]
    }
}

/// Encoded CSV text, one chunk per batch. Chunks are only joined when the
/// caller asks for the full text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputBuffer {
    chunks: Vec<String>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: String) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(String::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Final assembly into one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for chunk in &self.chunks {
            bytes.extend_from_slice(chunk.as_bytes());
        }
        bytes
    }

    pub fn to_text(&self) -> String {
        self.chunks.concat()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingPhase {
    Idle,
    Decoding,
    Converting,
    Mapping,
    Uploading,
    Done,
    Failed,
}

impl ProcessingPhase {
    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Decoding => 1,
            Self::Converting | Self::Mapping => 2,
            Self::Uploading => 3,
            Self::Done => 4,
            Self::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Host-side view of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub phase: ProcessingPhase,
    pub percent: i32,
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self {
            phase: ProcessingPhase::Idle,
            percent: 0,
        }
    }
}

impl ProcessingState {
    /// Applies a transition. Phases only move forward and, within a phase,
    /// the percent never goes down; an indeterminate percent (-1) is always
    /// accepted while decoding. Returns false if the transition was ignored.
    pub fn advance(&mut self, phase: ProcessingPhase, percent: i32) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        if phase == ProcessingPhase::Failed {
            self.phase = phase;
            self.percent = 0;
            return true;
        }

        let current = self.phase.rank();
        let next = phase.rank();
        if next < current {
            return false;
        }
        if next == current {
            if phase != self.phase {
                return false;
            }
            let indeterminate = percent < 0 && phase == ProcessingPhase::Decoding;
            if !indeterminate && self.percent >= 0 && percent < self.percent {
                return false;
            }
        }

        self.phase = phase;
        self.percent = percent;
        true
    }

    /// Back to idle, used when a new input is selected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_processing(&self) -> bool {
        !matches!(
            self.phase,
            ProcessingPhase::Idle | ProcessingPhase::Done | ProcessingPhase::Failed
        )
    }

    /// Single 0..=100 figure across the whole run: decoding takes the first
    /// 30%, mapping the next 50%, uploading the last 20%.
    pub fn overall_percent(&self) -> u8 {
        let percent = self.percent.clamp(0, 100);
        let overall = match self.phase {
            ProcessingPhase::Idle | ProcessingPhase::Failed => 0,
            ProcessingPhase::Decoding => percent * 30 / 100,
            ProcessingPhase::Converting | ProcessingPhase::Mapping => 30 + percent * 50 / 100,
            ProcessingPhase::Uploading => 80 + percent * 20 / 100,
            ProcessingPhase::Done => 100,
        };
        overall as u8
    }
}
