use crate::cli::StreamArgs;
use recstream_store::{JsonlStream, StreamConfig};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

pub const DEFAULT_STREAM_NAME: &str = "recstream";

/// Print `error: <context>: <err>` and exit non-zero.
pub fn exit_with<E: Display>(context: &str, err: E) -> ! {
    eprintln!("error: {context}: {err}");
    std::process::exit(1);
}

pub fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| exit_with(context, e))
}

pub fn load_config(args: &StreamArgs) -> StreamConfig {
    let mut config = match &args.config {
        Some(path) => or_exit(
            StreamConfig::load(path),
            &format!("failed to load {}", path.display()),
        ),
        None => StreamConfig::new(DEFAULT_STREAM_NAME),
    };
    if config.root.is_none() {
        config.root = Some(args.root.clone());
    }
    config
}

pub fn open_stream(args: &StreamArgs) -> Arc<JsonlStream> {
    let config = load_config(args);
    Arc::new(or_exit(config.open_jsonl(), "failed to open stream"))
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}
