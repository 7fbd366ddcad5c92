//! Batched CSV encoding.
//!
//! Each batch of mapped rows is encoded into its own chunk of the
//! [`OutputBuffer`], so peak working memory is one batch of text no matter
//! how many records the input holds. No byte-order mark is ever written:
//! some import parsers read it as part of the first header cell.

use crate::core::mapping::RowMapper;
use crate::domain::model::{OutputBuffer, Record};
use crate::utils::error::{ConvertError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 2000;

#[derive(Debug, Clone, Copy)]
pub struct StreamingEncoder {
    batch_size: usize,
    delimiter: u8,
}

impl Default for StreamingEncoder {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delimiter: b',',
        }
    }
}

impl StreamingEncoder {
    pub fn new(batch_size: usize, delimiter: char) -> Result<Self> {
        if batch_size == 0 {
            return Err(ConvertError::processing("batch size must be at least 1"));
        }
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ConvertError::processing(format!("delimiter {:?} is not ASCII", delimiter)))?;
        Ok(Self {
            batch_size,
            delimiter,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn writer(&self) -> csv::Writer<Vec<u8>> {
        csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(csv::QuoteStyle::Necessary)
            .double_quote(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new())
    }

    fn finish(&self, writer: csv::Writer<Vec<u8>>) -> Result<String> {
        let bytes = writer
            .into_inner()
            .map_err(|e| ConvertError::processing(format!("flushing CSV batch: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ConvertError::processing(format!("encoded batch is not UTF-8: {}", e)))
    }

    /// A row made of one empty cell is written as an empty line; `csv` would
    /// quote it as `""` to keep it distinguishable from no record at all.
    fn write_row(writer: &mut csv::Writer<Vec<u8>>, row: Vec<String>) -> Result<()> {
        if let [cell] = row.as_slice() {
            if cell.is_empty() {
                writer.flush()?;
                writer.get_mut().push(b'\n');
                return Ok(());
            }
        }
        writer.write_record(&row)?;
        Ok(())
    }

    /// Encodes a single row as one line of text, terminator included.
    pub fn encode_line<I, S>(&self, cells: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut writer = self.writer();
        writer.write_record(cells)?;
        self.finish(writer)
    }

    /// Writes the header once, then every record in batches. `on_progress`
    /// receives the rounded percent after each batch; the last call is
    /// always 100. `on_progress` can abort the run by returning an error.
    pub fn encode<M, F>(&self, records: &[Record], mapper: &M, mut on_progress: F) -> Result<OutputBuffer>
    where
        M: RowMapper + ?Sized,
        F: FnMut(i32) -> Result<()>,
    {
        let mut output = OutputBuffer::new();
        output.push(self.encode_line(mapper.header())?);

        let total = records.len();
        let mut processed = 0;
        for batch in records.chunks(self.batch_size) {
            let mut writer = self.writer();
            for record in batch {
                Self::write_row(&mut writer, mapper.map_row(record))?;
            }
            output.push(self.finish(writer)?);

            processed += batch.len();
            on_progress(percent_of(processed, total))?;
        }

        tracing::debug!(
            "Encoded {} records into {} chunks ({} bytes)",
            total,
            output.chunk_count(),
            output.byte_len()
        );
        Ok(output)
    }
}

/// `processed / total` as a rounded percent; an empty run counts as done.
pub fn percent_of(processed: usize, total: usize) -> i32 {
    if total == 0 {
        return 100;
    }
    ((processed as f64 / total as f64) * 100.0).round() as i32
}
