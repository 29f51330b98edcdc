use crate::error::{Result, SpeedtestError};
use crate::traits::ReportSink;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Writes report lines to stdout.
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn line(&self, line: &str) -> Result<()> {
        println!("{}", line);
        Ok(())
    }
}

/// Appends report lines to a file. The file is created on construction.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn line(&self, line: &str) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| SpeedtestError::Custom("report file lock poisoned".to_string()))?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

/// Collects lines in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ReportSink for MemorySink {
    fn line(&self, line: &str) -> Result<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}
