use crate::{config, models::Restaurant};
use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Writes the scraped restaurants as a pretty printed JSON array
#[derive(Debug, Clone)]
pub struct JsonWriter {
    path: PathBuf,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new(config::OUTPUT_FILE)
    }
}

impl JsonWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all restaurants, replacing any existing file, and return the path written to
    pub fn write(&self, restaurants: &[Restaurant]) -> Result<PathBuf> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, restaurants)?;
        w.flush()?;

        debug!(path = %self.path.display(), count = restaurants.len(), "Wrote restaurants");
        Ok(self.path.clone())
    }
}
