use super::RowMapper;
use crate::core::coerce::stringify;
use crate::domain::model::Record;

/// Emits the columns of the first record, in their original order, unchanged.
#[derive(Debug, Clone)]
pub struct PassthroughMapper {
    fields: Vec<String>,
}

impl PassthroughMapper {
    pub fn from_sample(sample: &Record) -> Self {
        Self {
            fields: sample.field_names(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl RowMapper for PassthroughMapper {
    fn header(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn map_row(&self, record: &Record) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| record.get(field).map(stringify).unwrap_or_default())
            .collect()
    }
}
