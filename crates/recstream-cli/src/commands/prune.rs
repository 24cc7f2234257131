use crate::cli::StreamArgs;
use crate::support::{exit_with, or_exit, open_stream, print_json};
use chrono::{DateTime, Utc};
use recstream_kernel::PruneOp;
use recstream_store::RecordStream;
use serde_json::json;

pub fn run(
    before_id: Option<i64>,
    before_timestamp: Option<String>,
    details: String,
    stream: StreamArgs,
) {
    let mut op = match (before_id, before_timestamp) {
        (Some(id), None) => or_exit(PruneOp::before_internal_record_id(id, details), "invalid prune"),
        (None, Some(raw)) => {
            let timestamp = or_exit(
                DateTime::parse_from_rfc3339(&raw),
                &format!("invalid --before-timestamp '{raw}'"),
            )
            .with_timezone(&Utc);
            or_exit(PruneOp::before_timestamp(timestamp, details), "invalid prune")
        }
        _ => exit_with("invalid prune", "exactly one of --before-id or --before-timestamp is required"),
    };
    if let Some(locator) = &stream.locator {
        op = or_exit(op.with_resource_locator(locator.clone()), "invalid prune");
    }

    let records = RecordStream::new(open_stream(&stream));
    let summary = or_exit(records.prune(&op), "prune failed");

    if stream.json {
        print_json(&json!({
            "action": "record.prune",
            "recordsRemoved": summary.records_removed,
            "entriesRemoved": summary.entries_removed,
        }));
    } else {
        println!(
            "recstream prune\n  Records removed: {}\n  Handling entries removed: {}",
            summary.records_removed, summary.entries_removed
        );
    }
}
