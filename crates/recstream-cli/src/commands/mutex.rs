use crate::cli::StreamArgs;
use crate::support::{exit_with, load_config, or_exit, print_json};
use recstream_store::{MutexError, execute_synchronously_using_stream_mutex};
use serde_json::json;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

pub fn run(id: String, details: String, poll_ms: Option<u64>, stream: StreamArgs, command: Vec<String>) {
    let config = load_config(&stream);
    let backend = Arc::new(or_exit(config.open_jsonl(), "failed to open stream"));
    let mut options = or_exit(config.mutex_options(&id, details), "invalid mutex");
    if let Some(poll_ms) = poll_ms {
        options = options.with_poll_interval(Duration::from_millis(poll_ms));
    }

    let Some((program, program_args)) = command.split_first() else {
        exit_with("invalid mutex", "a command is required after --");
    };

    let outcome = execute_synchronously_using_stream_mutex(backend, options, || {
        Command::new(program)
            .args(program_args)
            .status()
            .map_err(|e| format!("failed to run {program}: {e}"))
    });

    let status = match outcome {
        Ok(status) => status,
        Err(MutexError::Action(message)) => exit_with("mutex action failed", message),
        Err(MutexError::Stream(err)) => exit_with("mutex failed", err),
    };

    if stream.json {
        print_json(&json!({
            "action": "mutex.run",
            "mutexId": id,
            "command": command,
            "exitCode": status.code(),
            "success": status.success(),
        }));
    } else {
        println!(
            "recstream mutex\n  Mutex: {id}\n  Command: {}\n  Exit: {}",
            command.join(" "),
            status
                .code()
                .map_or_else(|| "signal".to_string(), |code| code.to_string())
        );
    }

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
}
