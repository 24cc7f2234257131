use crate::cli::StreamArgs;
use crate::support::{or_exit, open_stream, print_json};
use recstream_kernel::{
    DescribedSerialization, ExistingRecordStrategy, PutRecordOp, StringSerializedIdentifier, Tag,
    TypeRepresentation,
};
use recstream_store::RecordStream;
use serde_json::json;

pub struct Args {
    pub id: String,
    pub id_type: TypeRepresentation,
    pub object_type: TypeRepresentation,
    pub payload: String,
    pub tags: Vec<Tag>,
    pub existing: ExistingRecordStrategy,
    pub retain: Option<i64>,
    pub stream: StreamArgs,
}

pub fn run(args: Args) {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&args.payload) {
        eprintln!("error: payload is not valid JSON: {e}");
        std::process::exit(1);
    }

    let mut op = or_exit(
        PutRecordOp::new(
            StringSerializedIdentifier::new(&args.id, args.id_type),
            DescribedSerialization::json(args.object_type, args.payload),
        ),
        "invalid put",
    )
    .with_tags(args.tags);
    op = or_exit(
        op.with_existing_record_strategy(args.existing, args.retain),
        "invalid put",
    );
    if let Some(locator) = &args.stream.locator {
        op = or_exit(op.with_resource_locator(locator.clone()), "invalid put");
    }

    let records = RecordStream::new(open_stream(&args.stream));
    let result = or_exit(records.put(&op), "put failed");

    if args.stream.json {
        print_json(&json!({
            "action": "record.put",
            "id": args.id,
            "result": result,
        }));
    } else {
        match result.internal_record_id {
            Some(internal_record_id) => println!(
                "recstream put\n  Wrote: {} as record {} in '{}'",
                args.id, internal_record_id, result.resource_locator
            ),
            None => println!(
                "recstream put\n  Skipped: {} already present as {:?} in '{}'",
                args.id, result.existing_record_ids, result.resource_locator
            ),
        }
        if !result.pruned_record_ids.is_empty() {
            println!("  Pruned: {:?}", result.pruned_record_ids);
        }
    }
}
