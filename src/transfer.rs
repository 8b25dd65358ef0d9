use futures::StreamExt;
use futures::stream;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::EtdbError;
use crate::manifest::ManifestWriter;
use crate::plan::PlannedFile;
use crate::run_dir::RunDir;
use crate::source::FileSource;

/// Progress notifications for one run. Events for different files interleave
/// freely; events for a single file follow the transfer state machine
/// (started, zero or more progress updates, then completed or failed).
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started {
        location: String,
        display_name: String,
        total_bytes: u64,
    },
    /// Emitted at each chunk boundary of the underlying stream.
    Progress {
        location: String,
        display_name: String,
        received: u64,
        total_bytes: u64,
    },
    Completed {
        location: String,
        display_name: String,
    },
    Failed {
        location: String,
        display_name: String,
        error: String,
    },
}

pub trait TransferSink: Send + Sync {
    fn event(&self, event: TransferEvent);
}

/// Sink that discards everything; used by non-interactive callers and tests.
pub struct NullSink;

impl TransferSink for NullSink {
    fn event(&self, _event: TransferEvent) {}
}

#[derive(Debug, Clone)]
pub struct FailedTransfer {
    pub location: String,
    pub filename: String,
    pub error: String,
}

/// Outcome of a whole run. Failed files are absent from the manifest, so a
/// later resume run re-attempts them; that is the only recovery path.
#[derive(Debug, Default)]
pub struct TransferReport {
    pub completed: usize,
    pub bytes_downloaded: u64,
    pub failed: Vec<FailedTransfer>,
}

pub struct TransferPipeline<'a, S: FileSource> {
    source: &'a S,
    run_dir: &'a RunDir,
    manifest: &'a ManifestWriter,
    threads: usize,
}

impl<'a, S: FileSource> TransferPipeline<'a, S> {
    pub fn new(
        source: &'a S,
        run_dir: &'a RunDir,
        manifest: &'a ManifestWriter,
        threads: usize,
    ) -> Self {
        Self {
            source,
            run_dir,
            manifest,
            threads: threads.max(1),
        }
    }

    /// Runs every planned transfer, at most `threads` in flight at once.
    /// A failed file aborts only its own task; siblings keep going.
    pub async fn run(&self, files: Vec<PlannedFile>, sink: &dyn TransferSink) -> TransferReport {
        let outcomes: Vec<(PlannedFile, Result<u64, EtdbError>)> = stream::iter(files)
            .map(|planned| async move {
                let result = self.transfer_one(&planned, sink).await;
                (planned, result)
            })
            .buffer_unordered(self.threads)
            .collect()
            .await;

        let mut report = TransferReport::default();
        for (planned, result) in outcomes {
            match result {
                Ok(bytes) => {
                    report.completed += 1;
                    report.bytes_downloaded += bytes;
                }
                Err(err) => {
                    warn!(
                        location = planned.location.as_str(),
                        filename = planned.file.filename.as_str(),
                        "transfer failed: {err}"
                    );
                    report.failed.push(FailedTransfer {
                        location: planned.location.clone(),
                        filename: planned.file.filename.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// One file through the state machine. The manifest entry is appended
    /// only after the destination is fully written and flushed; on any error
    /// partial destination bytes stay on disk and the manifest is untouched,
    /// so the next resume run re-downloads into the same path in truncate
    /// mode.
    async fn transfer_one(
        &self,
        planned: &PlannedFile,
        sink: &dyn TransferSink,
    ) -> Result<u64, EtdbError> {
        let total_bytes = planned.file.size_bytes;
        sink.event(TransferEvent::Started {
            location: planned.location.clone(),
            display_name: planned.file.display_name.clone(),
            total_bytes,
        });

        let outcome = self.stream_to_destination(planned, sink, total_bytes).await;
        match &outcome {
            Ok(bytes) => {
                debug!(
                    location = planned.location.as_str(),
                    filename = planned.file.filename.as_str(),
                    bytes,
                    "transfer completed"
                );
                sink.event(TransferEvent::Completed {
                    location: planned.location.clone(),
                    display_name: planned.file.display_name.clone(),
                });
            }
            Err(err) => {
                sink.event(TransferEvent::Failed {
                    location: planned.location.clone(),
                    display_name: planned.file.display_name.clone(),
                    error: err.to_string(),
                });
            }
        }
        outcome
    }

    async fn stream_to_destination(
        &self,
        planned: &PlannedFile,
        sink: &dyn TransferSink,
        total_bytes: u64,
    ) -> Result<u64, EtdbError> {
        let remote_id = planned.remote_id();
        let mut chunks = self.source.open_read_stream(&remote_id).await?;

        let destination = self
            .run_dir
            .destination(&planned.location, &planned.file.display_name)
            .await?;
        let mut file = File::create(destination.as_std_path())
            .await
            .map_err(|err| EtdbError::Filesystem(format!("create {destination}: {err}")))?;

        let mut received: u64 = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            sink.event(TransferEvent::Progress {
                location: planned.location.clone(),
                display_name: planned.file.display_name.clone(),
                received,
                total_bytes,
            });
            file.write_all(&chunk)
                .await
                .map_err(|err| EtdbError::Filesystem(format!("write {destination}: {err}")))?;
        }
        file.flush()
            .await
            .map_err(|err| EtdbError::Filesystem(format!("flush {destination}: {err}")))?;

        // The file only counts as downloaded once this append lands.
        self.manifest
            .append(&planned.location, &planned.file.filename)
            .await?;
        Ok(received)
    }
}
