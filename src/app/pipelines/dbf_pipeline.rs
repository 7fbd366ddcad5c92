use crate::adapters::dbf::DbaseDecoder;
use crate::core::worker::ConversionWorker;
use crate::core::{ConfigProvider, Pipeline, RecordDecoder, Storage, Uploader};
use crate::domain::model::{ProcessingPhase, ProcessingState};
use crate::domain::ports::ConversionOutput;
use crate::domain::protocol::{ConversionMode, ConversionRequest, ConversionResponse};
use crate::utils::error::{ConvertError, Result};
use crate::utils::validation::{validate_file_extension, validate_file_size, MAX_INPUT_BYTES};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Host side of a conversion: reads the table, drives a worker until its
/// terminal response, writes the CSV and optionally uploads it.
pub struct DbfPipeline<S: Storage, U: Uploader, C: ConfigProvider> {
    storage: S,
    config: C,
    uploader: Option<U>,
    decoder: Arc<dyn RecordDecoder>,
    state: Mutex<ProcessingState>,
}

impl<S: Storage, U: Uploader, C: ConfigProvider> DbfPipeline<S, U, C> {
    pub fn new(storage: S, config: C, uploader: Option<U>) -> Result<Self> {
        let decoder = DbaseDecoder::from_label(&config.options().encoding)?;
        Ok(Self::with_decoder(storage, config, uploader, Arc::new(decoder)))
    }

    pub fn with_decoder(
        storage: S,
        config: C,
        uploader: Option<U>,
        decoder: Arc<dyn RecordDecoder>,
    ) -> Self {
        Self {
            storage,
            config,
            uploader,
            decoder,
            state: Mutex::new(ProcessingState::default()),
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    /// `stock.DBF` -> `stock.csv`
    pub fn output_filename(&self) -> String {
        output_filename(self.config.input_path())
    }

    fn track(&self, phase: ProcessingPhase, percent: i32) {
        if let Ok(mut state) = self.state.lock() {
            let before = state.overall_percent();
            let phase_changed = state.phase != phase;
            if state.advance(phase, percent) {
                let overall = state.overall_percent();
                if phase_changed || overall / 10 != before / 10 {
                    tracing::info!("⏳ {:?} {}% (overall {}%)", phase, percent.max(0), overall);
                } else {
                    tracing::debug!("{:?} progress: {}", phase, percent);
                }
            }
        }
    }

    fn reset_state(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.reset();
        }
    }
}

pub fn output_filename(input_path: &str) -> String {
    let stem = Path::new(input_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");
    format!("{}.csv", stem)
}

#[async_trait::async_trait]
impl<S: Storage, U: Uploader, C: ConfigProvider> Pipeline for DbfPipeline<S, U, C> {
    async fn extract(&self) -> Result<Vec<u8>> {
        let input_path = self.config.input_path();
        validate_file_extension("input", input_path, &["dbf"])?;

        tracing::debug!("Reading DBF file: {}", input_path);
        let buffer = self.storage.read_file(input_path).await?;
        validate_file_size("input", buffer.len() as u64, MAX_INPUT_BYTES)?;

        // 選了新檔案，狀態回到 idle
        self.reset_state();
        Ok(buffer)
    }

    async fn transform(&self, input: Vec<u8>) -> Result<ConversionOutput> {
        let mode = self.config.mode();
        let request = ConversionRequest::new(mode, input).with_options(self.config.options());
        tracing::debug!("Posting conversion request: {:?}", request);

        self.track(ProcessingPhase::Decoding, 0);
        let mut handle = ConversionWorker::new(Arc::clone(&self.decoder)).post(request);
        let mut preview = Vec::new();

        let terminal = loop {
            match handle.recv().await {
                Some(ConversionResponse::Progress { phase, percent }) => self.track(phase, percent),
                Some(ConversionResponse::Preview {
                    fields,
                    rows,
                    total_count,
                }) => {
                    tracing::info!(
                        "👀 Preview: {} of {} records, {} fields",
                        rows.len(),
                        total_count,
                        fields.len()
                    );
                    preview = rows;
                }
                Some(terminal) => break terminal,
                None => break ConversionResponse::error("conversion was terminated"),
            }
        };

        match terminal {
            ConversionResponse::Complete {
                output,
                total_count,
                fields,
            } => Ok(ConversionOutput {
                mode: ConversionMode::Raw,
                output,
                total_count,
                fields,
                preview,
            }),
            ConversionResponse::CanonicalComplete {
                output,
                total_count,
                fields,
            } => Ok(ConversionOutput {
                mode: ConversionMode::Canonical,
                output,
                total_count,
                fields,
                preview,
            }),
            ConversionResponse::Error { message } => {
                self.track(ProcessingPhase::Failed, 0);
                Err(ConvertError::ConversionFailed { message })
            }
            other => {
                self.track(ProcessingPhase::Failed, 0);
                Err(ConvertError::WorkerError {
                    message: format!("unexpected terminal response '{}'", other.kind()),
                })
            }
        }
    }

    async fn load(&self, result: ConversionOutput) -> Result<String> {
        let filename = self.output_filename();
        let output_path = Path::new(self.config.output_path())
            .join(&filename)
            .to_string_lossy()
            .to_string();

        tracing::debug!(
            "Writing {} chunks ({} bytes) to {}",
            result.output.chunk_count(),
            result.output.byte_len(),
            output_path
        );
        self.storage.write_chunks(&output_path, &result.output).await?;

        if result.mode == ConversionMode::Canonical {
            if let Some(uploader) = &self.uploader {
                self.track(ProcessingPhase::Uploading, 0);
                match uploader.upload(&filename, &result.output).await {
                    Ok(job) => {
                        tracing::info!("📤 Upload accepted, import job: {}", job);
                        self.track(ProcessingPhase::Uploading, 100);
                    }
                    Err(e) => {
                        self.track(ProcessingPhase::Failed, 0);
                        return Err(e);
                    }
                }
            }
        }

        self.track(ProcessingPhase::Done, 100);
        Ok(output_path)
    }
}
