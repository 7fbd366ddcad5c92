//! dBase / Visual FoxPro table decoding backed by the `dbase` crate.
//!
//! Legacy tables store text in a single-byte regional code page. Decoding
//! with the wrong one does not fail, it silently garbles accented text, so
//! the code page is always explicit (windows-1252 unless configured).
//!
//! Records carrying the `*` deletion mark are skipped by the reader; they are
//! counted from the raw buffer so a table that ends early is still reported
//! as truncated instead of converting partially.

use crate::domain::model::Record;
use crate::domain::ports::RecordDecoder;
use crate::utils::error::{ConvertError, Result};
use crate::utils::validation::validate_encoding;
use chrono::NaiveDate;
use dbase::{FieldValue, Reader};
use serde_json::{Number, Value};
use std::io::Cursor;
use yore::code_pages::{CP1250, CP1251, CP1252, CP437, CP850, CP852, CP866};

pub const DEFAULT_ENCODING: &str = "windows-1252";

// Integers beyond 2^53 are not exact in f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

const HEADER_LEN: usize = 32;
const DELETED_FLAG: u8 = b'*';

/// Code pages the decoder can read text fields in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    Cp437,
    Cp850,
    Cp852,
    Cp866,
    Cp1250,
    Cp1251,
    Cp1252,
}

impl CodePage {
    pub const ALL: [CodePage; 7] = [
        Self::Cp437,
        Self::Cp850,
        Self::Cp852,
        Self::Cp866,
        Self::Cp1250,
        Self::Cp1251,
        Self::Cp1252,
    ];

    /// Accepts `cp850`, `ibm850`, `850`, `windows-1252` and similar spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        let label: String = label
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        let number = label
            .strip_prefix("windows")
            .or_else(|| label.strip_prefix("ibm"))
            .or_else(|| label.strip_prefix("cp"))
            .unwrap_or(&label);

        match number {
            "437" => Some(Self::Cp437),
            "850" => Some(Self::Cp850),
            "852" => Some(Self::Cp852),
            "866" => Some(Self::Cp866),
            "1250" => Some(Self::Cp1250),
            "1251" => Some(Self::Cp1251),
            "1252" => Some(Self::Cp1252),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cp437 => "cp437",
            Self::Cp850 => "cp850",
            Self::Cp852 => "cp852",
            Self::Cp866 => "cp866",
            Self::Cp1250 => "windows-1250",
            Self::Cp1251 => "windows-1251",
            Self::Cp1252 => "windows-1252",
        }
    }

    fn open<'a>(self, buffer: &'a [u8]) -> std::result::Result<Reader<Cursor<&'a [u8]>>, dbase::Error> {
        let source = Cursor::new(buffer);
        match self {
            Self::Cp437 => Reader::new_with_encoding(source, CP437),
            Self::Cp850 => Reader::new_with_encoding(source, CP850),
            Self::Cp852 => Reader::new_with_encoding(source, CP852),
            Self::Cp866 => Reader::new_with_encoding(source, CP866),
            Self::Cp1250 => Reader::new_with_encoding(source, CP1250),
            Self::Cp1251 => Reader::new_with_encoding(source, CP1251),
            Self::Cp1252 => Reader::new_with_encoding(source, CP1252),
        }
    }
}

/// Record count and layout read straight from the table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableLayout {
    num_records: usize,
    header_len: usize,
    record_len: usize,
}

impl TableLayout {
    fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < HEADER_LEN {
            return Err(ConvertError::decode(format!(
                "invalid dBase header: {} bytes, expected at least {}",
                buffer.len(),
                HEADER_LEN
            )));
        }
        let num_records = u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]) as usize;
        let header_len = u16::from_le_bytes([buffer[8], buffer[9]]) as usize;
        let record_len = u16::from_le_bytes([buffer[10], buffer[11]]) as usize;

        Ok(Self {
            num_records,
            header_len,
            record_len,
        })
    }

    /// Fails when the buffer ends before the last record the header
    /// announces, otherwise returns how many records are marked deleted.
    fn deleted_records(&self, buffer: &[u8]) -> Result<usize> {
        let expected_len = self
            .record_len
            .checked_mul(self.num_records)
            .and_then(|data| data.checked_add(self.header_len))
            .unwrap_or(usize::MAX);
        if buffer.len() < expected_len {
            return Err(ConvertError::decode(format!(
                "table is truncated: header announces {} records ({} bytes) but the file has {} bytes",
                self.num_records,
                expected_len,
                buffer.len()
            )));
        }

        Ok((0..self.num_records)
            .filter(|i| buffer[self.header_len + i * self.record_len] == DELETED_FLAG)
            .count())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DbaseDecoder {
    code_page: CodePage,
}

impl Default for DbaseDecoder {
    fn default() -> Self {
        Self::new(CodePage::Cp1252)
    }
}

impl DbaseDecoder {
    pub fn new(code_page: CodePage) -> Self {
        Self { code_page }
    }

    pub fn from_label(label: &str) -> Result<Self> {
        validate_encoding("encoding", label).map(Self::new)
    }

    pub fn encoding_name(&self) -> &'static str {
        self.code_page.name()
    }
}

impl RecordDecoder for DbaseDecoder {
    fn decode(&self, buffer: &[u8], sink: &mut dyn FnMut(Record) -> Result<()>) -> Result<()> {
        let layout = TableLayout::parse(buffer)?;
        let mut reader = self
            .code_page
            .open(buffer)
            .map_err(|e| ConvertError::decode(format!("invalid dBase header: {}", e)))?;
        let deleted = if layout.record_len == 0 {
            0
        } else {
            layout.deleted_records(buffer)?
        };

        let field_names: Vec<String> = reader
            .fields()
            .iter()
            .map(|field| field.name().to_string())
            .collect();
        tracing::debug!(
            "dBase table with {} fields and {} records ({} deleted), decoding as {}",
            field_names.len(),
            layout.num_records,
            deleted,
            self.code_page.name()
        );

        let mut delivered = 0;
        for (index, record_result) in reader.iter_records().enumerate() {
            let mut raw = record_result
                .map_err(|e| ConvertError::decode(format!("record {}: {}", index + 1, e)))?;

            let mut record = Record::new();
            for name in &field_names {
                let value = raw.remove(name).map(field_value_to_json).unwrap_or(Value::Null);
                record.insert(name.clone(), value);
            }
            sink(record)?;
            delivered += 1;
        }

        let expected = layout.num_records - deleted;
        if delivered != expected {
            return Err(ConvertError::decode(format!(
                "read {} of {} live records; the table is damaged",
                delivered, expected
            )));
        }
        if deleted > 0 {
            tracing::info!("Skipped {} records marked as deleted", deleted);
        }

        Ok(())
    }
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// `F` columns come back as `f32`; going through their shortest text keeps
/// `0.1` from turning into `0.10000000149011612`.
fn widen(value: f32) -> Value {
    value
        .to_string()
        .parse::<f64>()
        .map(number)
        .unwrap_or(Value::Null)
}

pub fn field_value_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(text) => text.map(Value::String).unwrap_or(Value::Null),
        FieldValue::Memo(text) => Value::String(text),
        FieldValue::Numeric(num) => num.map(number).unwrap_or(Value::Null),
        FieldValue::Float(num) => num.map(widen).unwrap_or(Value::Null),
        FieldValue::Double(num) => number(num),
        FieldValue::Currency(num) => number(num),
        FieldValue::Integer(num) => Value::from(num),
        FieldValue::Logical(flag) => flag.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Date(date) => date
            .and_then(|d| NaiveDate::from_ymd_opt(d.year() as i32, d.month() as u32, d.day() as u32))
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        // timestamps are not exported
        FieldValue::DateTime(_) => Value::Null,
    }
}
