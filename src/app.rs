use camino::Utf8PathBuf;
use tracing::info;

use crate::catalog::CatalogClient;
use crate::domain::{Artifact, CategoryFilter};
use crate::error::EtdbError;
use crate::manifest::ManifestWriter;
use crate::plan::DownloadPlan;
use crate::run_dir::RunDir;
use crate::source::FileSource;
use crate::transfer::{TransferPipeline, TransferReport, TransferSink};

/// Everything the caller needs for its go/no-go decision, plus the state the
/// execute phase picks back up: the raw artifact list, the resolved run
/// directory, and the computed plan.
#[derive(Debug)]
pub struct PreparedRun {
    pub artifacts: Vec<Artifact>,
    pub run_dir: RunDir,
    pub plan: DownloadPlan,
}

pub struct App<C: CatalogClient, S: FileSource> {
    catalog: C,
    source: S,
}

impl<C: CatalogClient, S: FileSource> App<C, S> {
    pub fn new(catalog: C, source: S) -> Self {
        Self { catalog, source }
    }

    /// Startup phase: catalog query, run-directory bootstrap, plan
    /// construction. Any failure here aborts the run before the caller's
    /// confirmation gate is ever reached.
    pub async fn prepare(
        &self,
        resume: Option<Utf8PathBuf>,
        filter: &CategoryFilter,
    ) -> Result<PreparedRun, EtdbError> {
        let artifacts = self.catalog.list_artifacts().await?;
        info!(artifacts = artifacts.len(), "catalog query complete");

        let run_dir = RunDir::resolve(resume);
        let manifest_keys = run_dir.prepare()?;
        if !manifest_keys.is_empty() {
            info!(
                entries = manifest_keys.len(),
                run_dir = run_dir.root().as_str(),
                "resuming with existing manifest"
            );
        }

        let plan = DownloadPlan::build(&artifacts, filter, &manifest_keys);
        Ok(PreparedRun {
            artifacts,
            run_dir,
            plan,
        })
    }

    /// Transfer phase: snapshot the selected metadata, then stream every
    /// planned file with at most `threads` transfers in flight.
    pub async fn execute(
        &self,
        prepared: &PreparedRun,
        threads: usize,
        sink: &dyn TransferSink,
    ) -> Result<TransferReport, EtdbError> {
        prepared.run_dir.write_snapshot(&prepared.artifacts)?;
        let manifest = ManifestWriter::open(&prepared.run_dir.manifest_path())?;
        let pipeline = TransferPipeline::new(&self.source, &prepared.run_dir, &manifest, threads);
        let report = pipeline.run(prepared.plan.files.clone(), sink).await;
        info!(
            completed = report.completed,
            failed = report.failed.len(),
            bytes = report.bytes_downloaded,
            "transfer phase finished"
        );
        Ok(report)
    }
}
