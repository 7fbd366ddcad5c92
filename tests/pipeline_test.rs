mod common;

use anyhow::Result;
use common::stock_table;
use dbf_convert::core::{Pipeline, RecordDecoder};
use dbf_convert::domain::model::{ProcessingPhase, Record};
use dbf_convert::{ConversionMode, ConvertError, DbfPipeline, EtlEngine, HttpUploader, LocalStorage, TomlConfig};
use httpmock::prelude::*;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn config(input: &Path, output: &Path, extra: &str) -> TomlConfig {
    let content = format!(
        r#"
[input]
path = "{}"

[output]
path = "{}"

{}
"#,
        input.display(),
        output.display(),
        extra
    );
    TomlConfig::from_toml_str(&content).unwrap()
}

fn write_table(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, stock_table()).unwrap();
    path
}

#[tokio::test]
async fn test_canonical_run_writes_csv_and_uploads() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_table(&temp_dir, "STOCK.DBF");
    let output_dir = temp_dir.path().join("out");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/imports")
            .body_contains("filename=\"STOCK.csv\"")
            .body_contains("A001,Caño de cobre");
        then.status(201)
            .header("Content-Type", "application/json")
            .json_body(json!({"data": {"id": 7, "status": "pending"}}));
    });

    let config = config(&input, &output_dir, "");
    let pipeline = DbfPipeline::new(
        LocalStorage::default(),
        config,
        Some(HttpUploader::new(server.base_url())),
    )?;
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let output_path = engine.run().await?;

    api_mock.assert();
    assert!(output_path.ends_with("STOCK.csv"));
    let written = std::fs::read_to_string(&output_path)?;
    assert!(written.starts_with("sku,name,description,regular_price"));
    assert_eq!(written.lines().count(), 4);

    Ok(())
}

#[tokio::test]
async fn test_raw_run_never_uploads() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_table(&temp_dir, "stock.dbf");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/api/imports");
        then.status(201);
    });

    let mut config = config(&input, temp_dir.path(), "[conversion]\ndelimiter = \";\"\n");
    config.input.mode = Some(ConversionMode::Raw);

    let pipeline = DbfPipeline::new(
        LocalStorage::default(),
        config,
        Some(HttpUploader::new(server.base_url())),
    )?;

    let input_bytes = pipeline.extract().await?;
    let converted = pipeline.transform(input_bytes).await?;
    assert_eq!(converted.total_count, 3);
    assert_eq!(converted.preview.len(), 3);
    assert_eq!(converted.fields[0], "stcodigo");

    let output_path = pipeline.load(converted).await?;

    api_mock.assert_hits(0);
    assert_eq!(pipeline.state().phase, ProcessingPhase::Done);
    let written = std::fs::read_to_string(output_path)?;
    assert!(written.starts_with("stcodigo;STDESCRIP;StPrecUni2;STFAMILIA\n"));

    Ok(())
}

#[tokio::test]
async fn test_rejected_upload_keeps_csv_on_disk() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_table(&temp_dir, "stock.dbf");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/api/imports");
        then.status(500).body("database unavailable");
    });

    let pipeline = DbfPipeline::new(
        LocalStorage::default(),
        config(&input, temp_dir.path(), ""),
        Some(HttpUploader::new(server.base_url())),
    )?;
    let engine = EtlEngine::new(pipeline);

    let err = engine.run().await.unwrap_err();

    api_mock.assert();
    assert!(matches!(err, ConvertError::UploadRejected { status: 500, .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(temp_dir.path().join("stock.csv").exists());

    Ok(())
}

#[tokio::test]
async fn test_extract_rejects_non_dbf_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("stock.csv");
    std::fs::write(&input, "sku\n").unwrap();

    let pipeline = DbfPipeline::<_, HttpUploader, _>::new(
        LocalStorage::default(),
        config(&input, temp_dir.path(), ""),
        None,
    )
    .unwrap();

    let err = assert_err!(pipeline.extract().await);
    assert!(matches!(err, ConvertError::InvalidConfigValueError { .. }));
}

#[tokio::test]
async fn test_conversion_error_marks_state_failed() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("broken.dbf");
    std::fs::write(&input, b"garbage").unwrap();

    let pipeline = DbfPipeline::<_, HttpUploader, _>::new(
        LocalStorage::default(),
        config(&input, temp_dir.path(), ""),
        None,
    )
    .unwrap();

    let bytes = assert_ok!(pipeline.extract().await);
    let err = pipeline.transform(bytes).await.unwrap_err();

    assert!(matches!(err, ConvertError::ConversionFailed { .. }));
    assert_eq!(pipeline.state().phase, ProcessingPhase::Failed);
}

struct SlowDecoder {
    delivered: Arc<AtomicUsize>,
}

impl RecordDecoder for SlowDecoder {
    fn decode(
        &self,
        _buffer: &[u8],
        sink: &mut dyn FnMut(Record) -> dbf_convert::Result<()>,
    ) -> dbf_convert::Result<()> {
        for i in 0..10_000 {
            std::thread::sleep(Duration::from_millis(2));
            sink([("STCODIGO", json!(format!("A{}", i)))].into_iter().collect())?;
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_dropping_transform_stops_the_worker() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("stock.dbf");
    let delivered = Arc::new(AtomicUsize::new(0));

    let pipeline = DbfPipeline::<_, HttpUploader, _>::with_decoder(
        LocalStorage::default(),
        config(&input, temp_dir.path(), "[conversion]\nprogress_interval = 1\n"),
        None,
        Arc::new(SlowDecoder {
            delivered: Arc::clone(&delivered),
        }),
    );

    let outcome = tokio::time::timeout(Duration::from_millis(50), pipeline.transform(vec![0x03])).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_cancel = delivered.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(delivered.load(Ordering::SeqCst), after_cancel);
    assert!(after_cancel < 10_000);
}
