use std::io::{self, Write};

use crate::plan::DownloadPlan;
use crate::transfer::{TransferEvent, TransferReport, TransferSink};

/// Formats a byte count with decimal (base 10) units, the way the summary
/// prompt has always shown sizes.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

pub fn plan_summary(plan: &DownloadPlan) -> String {
    format!(
        "The search parameters selected {} records with {} files with a total of {} for download.",
        plan.selected_artifact_count,
        plan.file_count(),
        format_size(plan.total_bytes)
    )
}

pub fn report_summary(report: &TransferReport) -> String {
    format!(
        "Downloaded {} files ({}), {} failed.",
        report.completed,
        format_size(report.bytes_downloaded),
        report.failed.len()
    )
}

/// Prints one line per transfer lifecycle event to stderr. Chunk-level
/// progress is intentionally quiet here; per-chunk updates belong to richer
/// frontends.
pub struct ConsoleSink;

impl TransferSink for ConsoleSink {
    fn event(&self, event: TransferEvent) {
        let mut stderr = io::stderr();
        let line = match event {
            TransferEvent::Started {
                location,
                display_name,
                total_bytes,
            } => format!("{location} - {display_name} ({})", format_size(total_bytes)),
            TransferEvent::Progress { .. } => return,
            TransferEvent::Completed {
                location,
                display_name,
            } => format!("{location} - {display_name} done"),
            TransferEvent::Failed {
                location,
                display_name,
                error,
            } => format!("{location} - {display_name} FAILED: {error}"),
        };
        let _ = writeln!(stderr, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1000), "1.00 kB");
        assert_eq!(format_size(1_500_000), "1.50 MB");
        assert_eq!(format_size(2_000_000_000), "2.00 GB");
    }
}
