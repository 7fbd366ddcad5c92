//! Field name lookup across the spelling conventions of different legacy
//! systems (`STCODIGO`, `stcodigo`, `St_Codigo`, ...).

use crate::domain::model::Record;
use serde_json::Value;
use std::collections::HashMap;

/// Lower-cased with everything outside `[a-z0-9]` removed.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Maps every known form of a field name to the name actually used by the
/// current input. Built once from the first record; the decoder guarantees
/// every record of one input carries the same field set.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    keys: HashMap<String, String>,
}

impl KeyMap {
    pub fn build(sample: &Record) -> Self {
        let mut keys = HashMap::new();
        for key in sample.data.keys() {
            keys.insert(normalize_key(key), key.clone());
            keys.insert(key.to_lowercase(), key.clone());
            keys.insert(key.clone(), key.clone());
        }
        Self { keys }
    }

    pub fn resolve(&self, form: &str) -> Option<&str> {
        self.keys.get(form).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Looks `field` up in `record`: exact name first, then its lower-cased
    /// form, then through the normalized map. A present-but-null field still
    /// counts as found.
    pub fn get_value_by_field<'r>(&self, record: &'r Record, field: &str) -> Option<&'r Value> {
        if let Some(value) = record.get(field) {
            return Some(value);
        }

        let lower = field.to_lowercase();
        if let Some(value) = record.get(&lower) {
            return Some(value);
        }

        let actual = self
            .resolve(&normalize_key(field))
            .or_else(|| self.resolve(&lower))
            .or_else(|| self.resolve(field))?;
        record.get(actual)
    }
}
