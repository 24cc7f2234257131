use crate::cli::StreamArgs;
use crate::support::{or_exit, open_stream, print_json};
use recstream_kernel::{
    OrderRecordsBy, RecordFilter, StringSerializedIdentifier, Tag, TagMatchStrategy,
    TypeRepresentation, VersionMatchStrategy,
};
use recstream_store::{LocatedRecord, RecordStream};
use serde_json::json;

pub struct Args {
    pub ids: Vec<String>,
    pub id_type: TypeRepresentation,
    pub object_types: Vec<TypeRepresentation>,
    pub version_match: VersionMatchStrategy,
    pub tags: Vec<Tag>,
    pub tag_match: TagMatchStrategy,
    pub order: OrderRecordsBy,
    pub latest: bool,
    pub stream: StreamArgs,
}

pub fn run(args: Args) {
    let mut filter = RecordFilter::new().with_version_match_strategy(args.version_match);
    if !args.ids.is_empty() {
        let id_type = args.id_type.clone();
        filter = filter.with_ids(
            args.ids
                .iter()
                .map(|id| StringSerializedIdentifier::new(id, id_type.clone())),
        );
    }
    if !args.object_types.is_empty() {
        filter = filter.with_object_types(args.object_types.clone());
    }
    if !args.tags.is_empty() {
        filter = filter.with_tags(args.tags.clone(), args.tag_match);
    }

    let records = RecordStream::new(open_stream(&args.stream));
    let found: Vec<LocatedRecord> = if args.latest {
        or_exit(records.get_latest_record(&filter), "query failed")
            .into_iter()
            .collect()
    } else {
        or_exit(records.get_all_records(&filter, args.order), "query failed")
    };

    if args.stream.json {
        print_json(&json!({
            "action": "record.list",
            "count": found.len(),
            "records": found,
        }));
    } else if found.is_empty() {
        println!("recstream records\n  (none)");
    } else {
        println!("recstream records");
        for located in &found {
            let record = &located.record;
            let tags: Vec<String> = record.metadata.tags.iter().map(ToString::to_string).collect();
            println!(
                "  [{}#{}] {} {} tags=[{}] {}",
                located.resource_locator,
                record.internal_record_id,
                record.metadata.id.serialized_id,
                record.metadata.object_type,
                tags.join(", "),
                record.payload.payload
            );
        }
    }
}
