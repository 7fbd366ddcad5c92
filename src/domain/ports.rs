use crate::domain::model::{OutputBuffer, Record};
use crate::domain::protocol::{ConversionMode, ConversionOptions, ConversionResponse};
use crate::utils::error::{ConvertError, Result};
use async_trait::async_trait;

/// Turns a raw table buffer into records. Implementations hand each record to
/// `sink` in file order and stop as soon as the sink returns an error.
pub trait RecordDecoder: Send + Sync {
    fn decode(&self, buffer: &[u8], sink: &mut dyn FnMut(Record) -> Result<()>) -> Result<()>;
}

/// Where a worker posts its responses.
pub trait ResponseSink {
    fn post(&mut self, response: ConversionResponse) -> Result<()>;
}

impl ResponseSink for Vec<ConversionResponse> {
    fn post(&mut self, response: ConversionResponse) -> Result<()> {
        self.push(response);
        Ok(())
    }
}

impl ResponseSink for tokio::sync::mpsc::UnboundedSender<ConversionResponse> {
    fn post(&mut self, response: ConversionResponse) -> Result<()> {
        // 接收端已被丟棄表示 host 終止了這次轉換
        self.send(response).map_err(|_| ConvertError::Cancelled)
    }
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_chunks(
        &self,
        path: &str,
        output: &OutputBuffer,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Receives the finished CSV. The host owns this step, not the worker.
pub trait Uploader: Send + Sync {
    fn upload(
        &self,
        filename: &str,
        output: &OutputBuffer,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn mode(&self) -> ConversionMode;
    fn options(&self) -> ConversionOptions;
    fn upload_endpoint(&self) -> Option<&str>;
}

/// What a finished conversion hands to the load step.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub mode: ConversionMode,
    pub output: OutputBuffer,
    pub total_count: usize,
    pub fields: Vec<String>,
    pub preview: Vec<Record>,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<u8>>;
    async fn transform(&self, input: Vec<u8>) -> Result<ConversionOutput>;
    async fn load(&self, result: ConversionOutput) -> Result<String>;
}
