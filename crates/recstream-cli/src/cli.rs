use clap::{Args, Parser, Subcommand};
use recstream_kernel::{
    ExistingRecordStrategy, OrderRecordsBy, Tag, TagMatchStrategy, TypeRepresentation,
    VersionMatchStrategy,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "recstream",
    about = "Recstream: an append-only record stream with cooperative record handling",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the stream lives. Shared by every command.
#[derive(Args, Clone, Debug)]
pub struct StreamArgs {
    /// Directory holding one JSONL file per resource locator
    #[arg(long, default_value = ".recstream")]
    pub root: PathBuf,

    /// Optional stream config (TOML); its `root` wins over --root
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resource locator to address (required on multi-locator streams for
    /// commands that take an internal record id)
    #[arg(long)]
    pub locator: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append a record
    Put {
        /// Serialized object id
        #[arg(long)]
        id: String,

        /// Identifier type (`name` or `name@version`)
        #[arg(long, default_value = "string")]
        id_type: TypeRepresentation,

        /// Payload type (`name` or `name@version`)
        #[arg(long = "type")]
        object_type: TypeRepresentation,

        /// Payload JSON
        #[arg(long)]
        payload: String,

        /// Record tag `name[=value]` (repeatable)
        #[arg(long = "tag")]
        tags: Vec<Tag>,

        /// What to do when records with this id already exist
        #[arg(long, default_value = "none")]
        existing: ExistingRecordStrategy,

        /// Records to keep under a prune strategy
        #[arg(long)]
        retain: Option<i64>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// List records matching a filter
    Records {
        /// Serialized object id (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Identifier type used with --id
        #[arg(long, default_value = "string")]
        id_type: TypeRepresentation,

        /// Payload type (repeatable)
        #[arg(long = "type")]
        object_types: Vec<TypeRepresentation>,

        /// How type versions are compared
        #[arg(long, default_value = "any")]
        version_match: VersionMatchStrategy,

        /// Tag to match (repeatable)
        #[arg(long = "tag")]
        tags: Vec<Tag>,

        /// How record tags are compared with --tag
        #[arg(long, default_value = "record-contains-any-query-tag")]
        tag_match: TagMatchStrategy,

        /// ascending or descending internal record id
        #[arg(long, default_value = "ascending")]
        order: OrderRecordsBy,

        /// Only print the latest matching record
        #[arg(long)]
        latest: bool,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Remove old records and their handling history
    Prune {
        /// Remove records with an internal id below this one
        #[arg(long, conflicts_with = "before_timestamp")]
        before_id: Option<i64>,

        /// Remove records written before this RFC 3339 instant
        #[arg(long)]
        before_timestamp: Option<String>,

        /// Why the records are pruned
        #[arg(long)]
        details: String,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Claim, transition, block, and inspect record handling
    Handle {
        #[command(subcommand)]
        command: HandleCommands,
    },

    /// Run a command while holding a named stream mutex
    Mutex {
        /// Mutex name
        #[arg(long)]
        id: String,

        /// Why the mutex is held
        #[arg(long)]
        details: String,

        /// Poll interval while waiting, in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,

        #[command(flatten)]
        stream: StreamArgs,

        /// Command to run, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

/// Arguments of a transition on one (record, concern) pair.
#[derive(Args, Clone, Debug)]
pub struct TransitionArgs {
    /// Internal record id
    pub internal_record_id: i64,

    /// Handling concern
    #[arg(long)]
    pub concern: String,

    /// Entry details
    #[arg(long)]
    pub details: Option<String>,

    /// Entry tag `name[=value]` (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<Tag>,

    /// Merge the record's tags into the entry
    #[arg(long)]
    pub inherit_record_tags: bool,

    #[command(flatten)]
    pub stream: StreamArgs,
}

/// Arguments of a record block or unblock.
#[derive(Args, Clone, Debug)]
pub struct RecordBlockArgs {
    /// Internal record id
    pub internal_record_id: i64,

    /// Why handling changes
    #[arg(long)]
    pub details: String,

    #[command(flatten)]
    pub stream: StreamArgs,
}

/// Arguments of a stream disable or enable.
#[derive(Args, Clone, Debug)]
pub struct StreamBlockArgs {
    /// Why handling changes
    #[arg(long)]
    pub details: String,

    #[command(flatten)]
    pub stream: StreamArgs,
}

#[derive(Subcommand, Clone, Debug)]
pub enum HandleCommands {
    /// Claim the next eligible record for a concern
    Claim {
        /// Handling concern
        #[arg(long)]
        concern: String,

        /// Only consider records carrying this tag (repeatable)
        #[arg(long = "match-tag")]
        match_tags: Vec<Tag>,

        /// How record tags are compared with --match-tag
        #[arg(long, default_value = "record-contains-any-query-tag")]
        tag_match: TagMatchStrategy,

        /// Only consider records of this payload type (repeatable)
        #[arg(long = "type")]
        object_types: Vec<TypeRepresentation>,

        /// ascending or descending internal record id
        #[arg(long, default_value = "ascending")]
        order: OrderRecordsBy,

        /// Skip records below this internal id
        #[arg(long)]
        min_id: Option<i64>,

        /// Entry details
        #[arg(long)]
        details: Option<String>,

        /// Entry tag `name[=value]` (repeatable)
        #[arg(long = "tag")]
        tags: Vec<Tag>,

        /// Merge the record's tags into the entries
        #[arg(long)]
        inherit_record_tags: bool,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Mark running work completed
    Complete(TransitionArgs),

    /// Mark running work failed
    Fail(TransitionArgs),

    /// Cancel running work on someone else's behalf
    Cancel(TransitionArgs),

    /// Give up running work so it can be claimed again
    SelfCancel(TransitionArgs),

    /// Make failed work claimable again
    Retry(TransitionArgs),

    /// Cancel work that has not started
    CancelRequest(TransitionArgs),

    /// Disable handling of one record for every concern
    Block(RecordBlockArgs),

    /// Re-enable handling of a blocked record
    Unblock(RecordBlockArgs),

    /// Disable handling for the whole stream
    DisableStream(StreamBlockArgs),

    /// Re-enable handling for the whole stream
    EnableStream(StreamBlockArgs),

    /// Observed status of a record for a concern
    Status {
        /// Internal record id
        internal_record_id: i64,

        /// Handling concern
        #[arg(long)]
        concern: String,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Composite status over records selected by id or by tag
    Composite {
        /// Handling concern
        #[arg(long)]
        concern: String,

        /// Serialized object id (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Identifier type used with --id
        #[arg(long, default_value = "string")]
        id_type: TypeRepresentation,

        /// Tag to match (repeatable); used when no --id is given
        #[arg(long = "tag")]
        tags: Vec<Tag>,

        /// How record tags are compared with --tag
        #[arg(long, default_value = "record-contains-any-query-tag")]
        tag_match: TagMatchStrategy,

        /// Treat external cancellation as completion
        #[arg(long)]
        ignore_cancel: bool,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Handling history of a record for a concern
    History {
        /// Internal record id
        internal_record_id: i64,

        /// Handling concern
        #[arg(long)]
        concern: String,

        #[command(flatten)]
        stream: StreamArgs,
    },
}
