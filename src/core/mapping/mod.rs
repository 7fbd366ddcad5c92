pub mod canonical;
pub mod passthrough;

pub use canonical::CanonicalMapper;
pub use passthrough::PassthroughMapper;

use crate::domain::model::Record;

/// Turns a decoded record into one output row of text cells. Mapping never
/// fails; unresolvable cells come out empty so every input record yields
/// exactly one row.
pub trait RowMapper {
    fn header(&self) -> Vec<String>;
    fn map_row(&self, record: &Record) -> Vec<String>;
}
