use serde::Serialize;
use tracing::warn;

use crate::types::{ScanEvent, ScanSummary};

/// Write one record to stdout. Logs go to stderr, so stdout stays
/// machine-readable.
fn emit<T: Serialize>(record: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(record)
    } else {
        serde_json::to_string(record)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to serialize report: {e}"),
    }
}

/// One JSON line per alert.
pub fn report_event(event: &ScanEvent) {
    emit(event, false);
}

/// Pretty JSON at the end of each scan.
pub fn report_summary(summary: &ScanSummary) {
    emit(summary, true);
}
