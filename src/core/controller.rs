//! The conversion state machine that runs inside a worker.
//!
//! `idle → decoding → converting | mapping → done`, with any failure going
//! straight to `failed`. A controller handles one request and always ends it
//! with exactly one terminal response.

use crate::core::encoder::StreamingEncoder;
use crate::core::mapping::{CanonicalMapper, PassthroughMapper, RowMapper};
use crate::domain::model::{canonical_headers, ProcessingPhase, Record};
use crate::domain::ports::{RecordDecoder, ResponseSink};
use crate::domain::protocol::{
    Command, ConversionOptions, ConversionRequest, ConversionResponse, INDETERMINATE_PERCENT,
};
use crate::utils::error::{ConvertError, Result};

pub struct ConversionController<'a, D: RecordDecoder + ?Sized, S: ResponseSink> {
    decoder: &'a D,
    sink: S,
    options: ConversionOptions,
    phase: ProcessingPhase,
    records: Vec<Record>,
}

impl<'a, D: RecordDecoder + ?Sized, S: ResponseSink> ConversionController<'a, D, S> {
    pub fn new(decoder: &'a D, sink: S, options: ConversionOptions) -> Self {
        Self {
            decoder,
            sink,
            options,
            phase: ProcessingPhase::Idle,
            records: Vec::new(),
        }
    }

    pub fn phase(&self) -> ProcessingPhase {
        self.phase
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs every command of the request's pipeline. Failures are reported
    /// to the sink as a single `error` response rather than returned.
    pub fn run(&mut self, request: ConversionRequest) {
        tracing::info!(
            "Starting {} conversion of {} bytes",
            request.mode,
            request.buffer.len()
        );

        for command in request.mode.commands(request.buffer) {
            match self.dispatch(command) {
                Ok(Some(terminal)) => {
                    self.phase = ProcessingPhase::Done;
                    self.records = Vec::new();
                    if let Err(e) = self.sink.post(terminal) {
                        tracing::debug!("Host went away before the result was delivered: {}", e);
                    }
                    return;
                }
                Ok(None) => {}
                Err(ConvertError::Cancelled) => {
                    tracing::info!("Conversion terminated by host during {:?}", self.phase);
                    self.fail();
                    return;
                }
                Err(e) => {
                    tracing::error!("Conversion failed during {:?}: {}", self.phase, e);
                    self.fail();
                    // 終止訊息送不出去時 host 已經離開，無需處理
                    let _ = self.sink.post(ConversionResponse::error(e.to_string()));
                    return;
                }
            }
        }

        self.fail();
        let _ = self.sink.post(ConversionResponse::error(
            "pipeline finished without producing a result",
        ));
    }

    fn fail(&mut self) {
        self.phase = ProcessingPhase::Failed;
        self.records = Vec::new();
    }

    /// Executes one pipeline step. Returns the terminal response once the
    /// pipeline has produced its result.
    pub fn dispatch(&mut self, command: Command) -> Result<Option<ConversionResponse>> {
        match command {
            Command::Decode(buffer) => {
                self.decode(&buffer)?;
                Ok(None)
            }
            Command::MapRaw => self.map_raw().map(Some),
            Command::MapCanonical => self.map_canonical().map(Some),
        }
    }

    fn progress(&mut self, percent: i32) -> Result<()> {
        self.sink.post(ConversionResponse::progress(self.phase, percent))
    }

    fn decode(&mut self, buffer: &[u8]) -> Result<()> {
        self.phase = ProcessingPhase::Decoding;
        self.progress(0)?;

        if buffer.is_empty() {
            return Err(ConvertError::decode("input buffer is empty"));
        }

        let interval = self.options.progress_interval.max(1);
        let mut records = Vec::new();
        {
            let sink = &mut self.sink;
            let phase = self.phase;
            self.decoder.decode(buffer, &mut |record| {
                records.push(record);
                if records.len() % interval == 0 {
                    sink.post(ConversionResponse::progress(phase, INDETERMINATE_PERCENT))?;
                }
                Ok(())
            })?;
        }
        tracing::debug!("Decoded {} records", records.len());

        let offset = self.options.offset;
        let limit = match self.options.limit {
            0 => usize::MAX,
            n => n,
        };
        if offset > 0 || limit < records.len() {
            records = records.into_iter().skip(offset).take(limit).collect();
            tracing::debug!("Kept {} records after offset {} / limit {}", records.len(), offset, self.options.limit);
        }

        if records.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        if let Some(first) = records.first() {
            tracing::debug!("Detected fields: {:?}", first.field_names());
        }

        self.records = records;
        self.progress(100)
    }

    fn encoder(&self) -> Result<StreamingEncoder> {
        StreamingEncoder::new(self.options.batch_size, self.options.delimiter)
    }

    fn sample(&self) -> Result<&Record> {
        self.records
            .first()
            .ok_or_else(|| ConvertError::processing("mapping requested before decoding"))
    }

    fn encode_with<M: RowMapper>(&mut self, mapper: &M) -> Result<crate::domain::model::OutputBuffer> {
        let encoder = self.encoder()?;
        self.progress(0)?;

        let records = std::mem::take(&mut self.records);
        let phase = self.phase;
        let sink = &mut self.sink;
        let output = encoder.encode(&records, mapper, |percent| {
            sink.post(ConversionResponse::progress(phase, percent))
        });
        self.records = records;
        output
    }

    fn map_raw(&mut self) -> Result<ConversionResponse> {
        let mapper = PassthroughMapper::from_sample(self.sample()?);
        let fields = mapper.fields().to_vec();
        let total_count = self.records.len();

        let rows = self
            .records
            .iter()
            .take(self.options.preview_rows)
            .cloned()
            .collect();
        self.sink.post(ConversionResponse::Preview {
            fields: fields.clone(),
            rows,
            total_count,
        })?;

        self.phase = ProcessingPhase::Converting;
        let output = self.encode_with(&mapper)?;

        Ok(ConversionResponse::Complete {
            output,
            total_count,
            fields,
        })
    }

    fn map_canonical(&mut self) -> Result<ConversionResponse> {
        let mapper = CanonicalMapper::from_sample(self.sample()?);
        tracing::debug!("Key map built with {} lookup forms", mapper.key_map().len());
        let total_count = self.records.len();

        self.phase = ProcessingPhase::Mapping;
        let output = self.encode_with(&mapper)?;

        Ok(ConversionResponse::CanonicalComplete {
            output,
            total_count,
            fields: canonical_headers(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::protocol::ConversionMode;
    use serde_json::json;

    struct StaticDecoder(Vec<Record>);

    impl RecordDecoder for StaticDecoder {
        fn decode(&self, _buffer: &[u8], sink: &mut dyn FnMut(Record) -> Result<()>) -> Result<()> {
            for record in &self.0 {
                sink(record.clone())?;
            }
            Ok(())
        }
    }

    struct FailingDecoder;

    impl RecordDecoder for FailingDecoder {
        fn decode(&self, _buffer: &[u8], _sink: &mut dyn FnMut(Record) -> Result<()>) -> Result<()> {
            Err(ConvertError::decode("corrupt header"))
        }
    }

    fn products(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                [
                    ("STCODIGO", json!(format!("P{}", i))),
                    ("STDESCRIP", json!("Producto")),
                    ("STPRECUNI2", json!(10)),
                ]
                .into_iter()
                .collect()
            })
            .collect()
    }

    fn run(decoder: &dyn RecordDecoder, request: ConversionRequest) -> (ProcessingPhase, Vec<ConversionResponse>) {
        let options = request.options.clone();
        let mut controller = ConversionController::new(decoder, Vec::new(), options);
        controller.run(request);
        let phase = controller.phase();
        (phase, controller.into_sink())
    }

    #[test]
    fn test_raw_pipeline_sequence() {
        let decoder = StaticDecoder(products(3));
        let (phase, responses) = run(&decoder, ConversionRequest::new(ConversionMode::Raw, vec![1]));

        assert_eq!(phase, ProcessingPhase::Done);
        let kinds: Vec<_> = responses.iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec!["progress", "progress", "preview", "progress", "progress", "complete"]
        );
        match &responses[2] {
            ConversionResponse::Preview {
                fields,
                rows,
                total_count,
            } => {
                assert_eq!(fields, &vec!["STCODIGO", "STDESCRIP", "STPRECUNI2"]);
                assert_eq!(rows.len(), 3);
                assert_eq!(*total_count, 3);
            }
            other => panic!("expected preview, got {:?}", other),
        }
        match responses.last().unwrap() {
            ConversionResponse::Complete {
                output, total_count, ..
            } => {
                assert_eq!(*total_count, 3);
                assert_eq!(
                    output.to_text(),
                    "STCODIGO,STDESCRIP,STPRECUNI2\nP0,Producto,10\nP1,Producto,10\nP2,Producto,10\n"
                );
            }
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_is_bounded() {
        let decoder = StaticDecoder(products(25));
        let (_, responses) = run(&decoder, ConversionRequest::new(ConversionMode::Raw, vec![1]));
        let preview = responses
            .iter()
            .find_map(|r| match r {
                ConversionResponse::Preview { rows, total_count, .. } => Some((rows.len(), *total_count)),
                _ => None,
            })
            .unwrap();
        assert_eq!(preview, (10, 25));
    }

    #[test]
    fn test_canonical_pipeline_has_no_preview() {
        let decoder = StaticDecoder(products(2));
        let (phase, responses) = run(&decoder, ConversionRequest::new(ConversionMode::Canonical, vec![1]));

        assert_eq!(phase, ProcessingPhase::Done);
        assert!(responses.iter().all(|r| r.kind() != "preview"));
        assert!(responses.iter().any(|r| matches!(
            r,
            ConversionResponse::Progress {
                phase: ProcessingPhase::Mapping,
                ..
            }
        )));
        match responses.last().unwrap() {
            ConversionResponse::CanonicalComplete {
                output,
                total_count,
                fields,
            } => {
                assert_eq!(*total_count, 2);
                assert_eq!(fields, &canonical_headers());
                let text = output.to_text();
                let lines: Vec<_> = text.lines().collect();
                assert_eq!(lines.len(), 3);
                assert_eq!(lines[1], "P0,Producto,Producto,10.00,,,,,,,,,,true");
            }
            other => panic!("expected canonical-complete, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_progress_cadence() {
        let decoder = StaticDecoder(products(2500));
        let (_, responses) = run(&decoder, ConversionRequest::new(ConversionMode::Canonical, vec![1]));
        let indeterminate = responses
            .iter()
            .filter(|r| matches!(r, ConversionResponse::Progress { percent: -1, .. }))
            .count();
        assert_eq!(indeterminate, 2);
    }

    #[test]
    fn test_empty_input_is_single_error() {
        let decoder = StaticDecoder(Vec::new());
        let (phase, responses) = run(&decoder, ConversionRequest::new(ConversionMode::Raw, vec![1]));
        assert_eq!(phase, ProcessingPhase::Failed);
        assert_eq!(responses.iter().filter(|r| r.is_terminal()).count(), 1);
        assert!(matches!(responses.last(), Some(ConversionResponse::Error { .. })));
    }

    #[test]
    fn test_empty_buffer_is_error() {
        let decoder = StaticDecoder(products(1));
        let (_, responses) = run(&decoder, ConversionRequest::new(ConversionMode::Canonical, Vec::new()));
        match responses.last() {
            Some(ConversionResponse::Error { message }) => assert!(message.contains("empty")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_failure_is_reported() {
        let (phase, responses) = run(&FailingDecoder, ConversionRequest::new(ConversionMode::Canonical, vec![1]));
        assert_eq!(phase, ProcessingPhase::Failed);
        match responses.last() {
            Some(ConversionResponse::Error { message }) => assert!(message.contains("corrupt header")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_and_limit() {
        let decoder = StaticDecoder(products(10));
        let options = ConversionOptions {
            offset: 2,
            limit: 3,
            ..ConversionOptions::default()
        };
        let request = ConversionRequest::new(ConversionMode::Canonical, vec![1]).with_options(options);
        let (_, responses) = run(&decoder, request);
        match responses.last().unwrap() {
            ConversionResponse::CanonicalComplete {
                output, total_count, ..
            } => {
                assert_eq!(*total_count, 3);
                assert!(output.to_text().lines().nth(1).unwrap().starts_with("P2,"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let options = ConversionOptions {
            offset: 50,
            ..ConversionOptions::default()
        };
        let request = ConversionRequest::new(ConversionMode::Raw, vec![1]).with_options(options);
        let (_, responses) = run(&decoder, request);
        assert!(matches!(responses.last(), Some(ConversionResponse::Error { .. })));
    }

    #[test]
    fn test_mapping_before_decoding_fails() {
        let decoder = StaticDecoder(products(1));
        let mut controller = ConversionController::new(&decoder, Vec::new(), ConversionOptions::default());
        assert!(controller.dispatch(Command::MapCanonical).is_err());
    }
}
