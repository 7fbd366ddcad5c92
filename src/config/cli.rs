use crate::core::{OutputBuffer, Storage};
use crate::utils::error::Result;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Filesystem storage. Relative paths resolve against `base_path`, absolute
/// paths are used as given.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }

    fn create_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".".to_string())
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path))?;
        Ok(data)
    }

    async fn write_chunks(&self, path: &str, output: &OutputBuffer) -> Result<()> {
        let full_path = self.resolve(path);
        Self::create_parent(&full_path)?;

        // 逐塊寫入，不先拼成一個大字串
        let mut writer = BufWriter::new(fs::File::create(full_path)?);
        for chunk in output.chunks() {
            writer.write_all(chunk.as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }
}
