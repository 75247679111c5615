use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::record::{FileRecord, ProcessingStatus};

/// Summary metrics derived from a store snapshot. Never stored, always
/// recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_files: usize,
    /// Sum of original sizes, whatever the record status
    pub original_size: u64,
    /// Sum of processed sizes; unprocessed records count at their original
    /// size and a shared artifact counts once
    pub processed_size: u64,
    pub savings: i64,
    /// Mean per-file size reduction in percent over completed records
    pub average_ratio: f64,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

impl AggregateStats {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut stats = AggregateStats {
            total_files: records.len(),
            ..Default::default()
        };
        let mut counted = HashSet::new();
        let mut ratio_sum = 0.0;

        for record in records {
            stats.original_size += record.size_bytes;

            match record.status {
                ProcessingStatus::Pending => stats.pending += 1,
                ProcessingStatus::Processing => stats.processing += 1,
                ProcessingStatus::Completed => stats.completed += 1,
                ProcessingStatus::Error => stats.error += 1,
            }

            match &record.result {
                Some(result) => {
                    for artifact in result.artifacts() {
                        if counted.insert(artifact.id) {
                            stats.processed_size += artifact.size_bytes();
                        }
                    }
                }
                None => stats.processed_size += record.size_bytes,
            }

            if record.status == ProcessingStatus::Completed && record.size_bytes > 0 {
                let processed = record
                    .result
                    .as_ref()
                    .map(|r| r.total_size())
                    .unwrap_or(record.size_bytes);
                ratio_sum += (record.size_bytes as f64 - processed as f64)
                    / record.size_bytes as f64
                    * 100.0;
            }
        }

        stats.savings = stats.original_size as i64 - stats.processed_size as i64;
        if stats.completed > 0 {
            stats.average_ratio = ratio_sum / stats.completed as f64;
        }
        stats
    }
}

/// Human-readable size with a 1024 base, e.g. `1.5 KB`, `0 Bytes`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}
