use crate::cli::{HandleCommands, RecordBlockArgs, StreamArgs, StreamBlockArgs, TransitionArgs};
use crate::support::{exit_with, or_exit, open_stream, print_json};
use recstream_kernel::{
    GetCompositeHandlingStatusByIdsOp, GetCompositeHandlingStatusByTagsOp,
    GetHandlingHistoryOfRecordOp, GetHandlingStatusOp, HandlingOp,
    HandlingStatusCompositionStrategy, RecordBlockOp, RecordFilter, RecordTransition,
    RecordTransitionOp, StreamBlockOp, StringSerializedIdentifier, TryHandleRecordOp,
};
use recstream_store::{HandlingOutcome, HandlingProtocol, JsonlStream};
use serde_json::json;

pub fn run(command: HandleCommands) {
    let (op, stream) = build_op(command);
    let handling = HandlingProtocol::new(open_stream(&stream));
    let outcome = or_exit(handling.execute(&op), &format!("{} failed", op.name()));
    if stream.json {
        print_json(&json!({
            "action": format!("handle.{}", op.name()),
            "outcome": outcome,
        }));
    } else {
        print_text(&op, &outcome, &handling);
    }
}

fn build_op(command: HandleCommands) -> (HandlingOp, StreamArgs) {
    match command {
        HandleCommands::Claim {
            concern,
            match_tags,
            tag_match,
            object_types,
            order,
            min_id,
            details,
            tags,
            inherit_record_tags,
            stream,
        } => {
            let mut filter = RecordFilter::new();
            if !match_tags.is_empty() {
                filter = filter.with_tags(match_tags, tag_match);
            }
            if !object_types.is_empty() {
                filter = filter.with_object_types(object_types);
            }
            let mut op = or_exit(TryHandleRecordOp::new(concern), "invalid claim")
                .with_filter(filter)
                .with_order(order)
                .with_tags(tags)
                .inheriting_record_tags(inherit_record_tags);
            if let Some(min_id) = min_id {
                op = or_exit(op.with_minimum_internal_record_id(min_id), "invalid claim");
            }
            if let Some(details) = details {
                op = or_exit(op.with_details(details), "invalid claim");
            }
            if let Some(locator) = &stream.locator {
                op = or_exit(op.with_resource_locator(locator.clone()), "invalid claim");
            }
            (HandlingOp::TryHandleRecord(op), stream)
        }
        HandleCommands::Complete(args) => transition(RecordTransition::CompleteRunning, args),
        HandleCommands::Fail(args) => transition(RecordTransition::FailRunning, args),
        HandleCommands::Cancel(args) => transition(RecordTransition::CancelRunning, args),
        HandleCommands::SelfCancel(args) => transition(RecordTransition::SelfCancelRunning, args),
        HandleCommands::Retry(args) => transition(RecordTransition::RetryFailed, args),
        HandleCommands::CancelRequest(args) => transition(RecordTransition::CancelRequest, args),
        HandleCommands::Block(args) => record_block(true, args),
        HandleCommands::Unblock(args) => record_block(false, args),
        HandleCommands::DisableStream(args) => stream_block(true, args),
        HandleCommands::EnableStream(args) => stream_block(false, args),
        HandleCommands::Status {
            internal_record_id,
            concern,
            stream,
        } => {
            let mut op = or_exit(
                GetHandlingStatusOp::new(concern, internal_record_id),
                "invalid status query",
            );
            if let Some(locator) = &stream.locator {
                op = or_exit(op.with_resource_locator(locator.clone()), "invalid status query");
            }
            (HandlingOp::GetHandlingStatus(op), stream)
        }
        HandleCommands::Composite {
            concern,
            ids,
            id_type,
            tags,
            tag_match,
            ignore_cancel,
            stream,
        } => {
            let composition = HandlingStatusCompositionStrategy { ignore_cancel };
            let op = if !ids.is_empty() {
                let ids = ids
                    .iter()
                    .map(|id| StringSerializedIdentifier::new(id, id_type.clone()))
                    .collect();
                HandlingOp::GetCompositeHandlingStatusByIds(
                    or_exit(
                        GetCompositeHandlingStatusByIdsOp::new(concern, ids),
                        "invalid composite query",
                    )
                    .with_composition(composition),
                )
            } else {
                HandlingOp::GetCompositeHandlingStatusByTags(
                    or_exit(
                        GetCompositeHandlingStatusByTagsOp::new(concern, tags, tag_match),
                        "invalid composite query (give --id or --tag)",
                    )
                    .with_composition(composition),
                )
            };
            (op, stream)
        }
        HandleCommands::History {
            internal_record_id,
            concern,
            stream,
        } => {
            let mut op = or_exit(
                GetHandlingHistoryOfRecordOp::new(internal_record_id, concern),
                "invalid history query",
            );
            if let Some(locator) = &stream.locator {
                op = or_exit(op.with_resource_locator(locator.clone()), "invalid history query");
            }
            (HandlingOp::GetHandlingHistoryOfRecord(op), stream)
        }
    }
}

fn transition(kind: RecordTransition, args: TransitionArgs) -> (HandlingOp, StreamArgs) {
    let context = format!("invalid {}", kind.operation_name());
    let mut op = or_exit(
        RecordTransitionOp::new(kind, args.internal_record_id, args.concern, args.details),
        &context,
    )
    .with_tags(args.tags)
    .inheriting_record_tags(args.inherit_record_tags);
    if let Some(locator) = &args.stream.locator {
        op = or_exit(op.with_resource_locator(locator.clone()), &context);
    }
    (HandlingOp::Transition(op), args.stream)
}

fn record_block(block: bool, args: RecordBlockArgs) -> (HandlingOp, StreamArgs) {
    let built = if block {
        RecordBlockOp::block(args.internal_record_id, args.details)
    } else {
        RecordBlockOp::cancel_block(args.internal_record_id, args.details)
    };
    let mut op = or_exit(built, "invalid record block");
    if let Some(locator) = &args.stream.locator {
        op = or_exit(op.with_resource_locator(locator.clone()), "invalid record block");
    }
    (HandlingOp::RecordBlock(op), args.stream)
}

fn stream_block(disable: bool, args: StreamBlockArgs) -> (HandlingOp, StreamArgs) {
    if args.stream.locator.is_some() {
        exit_with(
            "invalid stream block",
            "--locator is not accepted; stream handling flags apply to every locator",
        );
    }
    let built = if disable {
        StreamBlockOp::disable(args.details)
    } else {
        StreamBlockOp::enable(args.details)
    };
    (
        HandlingOp::StreamBlock(or_exit(built, "invalid stream block")),
        args.stream,
    )
}

fn print_text(op: &HandlingOp, outcome: &HandlingOutcome, handling: &HandlingProtocol<JsonlStream>) {
    println!("recstream handle {}", op.name());
    match outcome {
        HandlingOutcome::Claimed(result) => match (&result.record_to_handle, &result.resource_locator) {
            (Some(record), Some(locator)) => println!(
                "  Claimed: record {} ({}) in '{}'",
                record.internal_record_id, record.metadata.id.serialized_id, locator
            ),
            _ if result.is_blocked => println!("  Nothing claimed: handling is disabled for the stream"),
            _ => println!("  Nothing claimed"),
        },
        HandlingOutcome::Applied => {
            if let Some(concern) = op.concern() {
                println!("  Applied for concern '{concern}'");
            } else {
                println!("  Applied");
            }
            if let HandlingOp::StreamBlock(_) = op {
                let status = or_exit(handling.stream_handling_status(), "stream status failed");
                println!("  Stream status: {status}");
            }
        }
        HandlingOutcome::Status(status) => println!(
            "  Record {} in '{}' for '{}': {}",
            status.internal_record_id, status.resource_locator, status.concern, status.status
        ),
        HandlingOutcome::Composite { status } => println!("  Composite status: {status}"),
        HandlingOutcome::History { entries } => {
            if entries.is_empty() {
                println!("  (no entries)");
            }
            for entry in entries {
                println!(
                    "  #{} {} {} {}",
                    entry.internal_handling_entry_id,
                    entry.metadata.timestamp_utc.to_rfc3339(),
                    entry.metadata.status,
                    entry.details.as_deref().unwrap_or("")
                );
            }
        }
    }
}
