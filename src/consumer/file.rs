//! File backed media sink
//!
//! Appends every frame to one file per player. With an fMP4 stream the
//! result is a playable recording.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::SinkError;

use super::sink::{AppendSignal, MediaSink, SinkFactory};

/// File extension for a negotiated mime
pub fn extension_for(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or("").trim();
    match essence {
        "video/mp4" | "audio/mp4" => "mp4",
        "video/webm" | "audio/webm" => "webm",
        _ => "bin",
    }
}

/// Creates a [`FileSink`] at `{dir}/{prefix}.{ext}`
#[derive(Debug, Clone)]
pub struct FileSinkFactory {
    dir: PathBuf,
    prefix: String,
}

impl FileSinkFactory {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

impl SinkFactory for FileSinkFactory {
    fn create_sink(
        &self,
        mime: &str,
        signal: AppendSignal,
    ) -> Result<Box<dyn MediaSink>, SinkError> {
        if mime.trim().is_empty() {
            return Err(SinkError::UnsupportedMime(mime.to_string()));
        }

        let path = self
            .dir
            .join(format!("{}.{}", self.prefix, extension_for(mime)));
        let sink = FileSink::create(&path, signal)?;

        tracing::info!(path = %path.display(), mime = mime, "Recording to file");
        Ok(Box::new(sink))
    }
}

/// Sink writing appends to a file on the tokio runtime
pub struct FileSink {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
    busy: Arc<AtomicBool>,
    signal: AppendSignal,
}

impl FileSink {
    /// Create (or truncate) the file at `path`
    pub fn create(path: &Path, signal: AppendSignal) -> Result<Self, SinkError> {
        let file = std::fs::File::create(path)
            .map_err(|e| SinkError::Rejected(format!("{}: {e}", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(tokio::fs::File::from_std(file))),
            busy: Arc::new(AtomicBool::new(false)),
            signal,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaSink for FileSink {
    fn append(&mut self, frame: Bytes) -> Result<(), SinkError> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Err(SinkError::NotReady);
        };
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(SinkError::Busy);
        }

        let file = Arc::clone(&self.file);
        let busy = Arc::clone(&self.busy);
        let signal = self.signal.clone();
        let path = self.path.clone();

        handle.spawn(async move {
            let mut file = file.lock().await;
            let written = match file.write_all(&frame).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tracing::warn!(path = %path.display(), error = %e, "Segment write failed");
            }
            drop(file);

            busy.store(false, Ordering::Release);
            signal.notify();
        });

        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
