//! Staging of print buffers on disk
//!
//! Several strategies need a file rather than an in-memory buffer. The
//! staged file lives exactly as long as the [`StagedBuffer`]; dropping it
//! removes the file on every exit path.

use crate::error::{PrintError, PrintResult};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug)]
pub struct StagedBuffer {
    file: NamedTempFile,
    len: usize,
}

impl StagedBuffer {
    /// Write `data` to a fresh temporary file in the system temp dir
    pub fn write(data: &[u8]) -> PrintResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("comanda-")
            .suffix(".prn")
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self {
            file,
            len: data.len(),
        })
    }

    /// [`StagedBuffer::write`] on the blocking pool, for async callers
    ///
    /// Removal on drop stays inline; unlinking one small file does not
    /// stall the runtime.
    pub async fn stage(data: &[u8]) -> PrintResult<Self> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::write(&data))
            .await
            .map_err(|e| PrintError::Io(std::io::Error::other(e)))?
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
