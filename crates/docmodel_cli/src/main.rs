//! CLI probe and snapshot query tool.
//!
//! # Responsibility
//! - Verify `docmodel_core` linkage with deterministic output.
//! - Run `find`/`dump` against a JSON model snapshot for local inspection.
//!
//! Usage:
//! - `docmodel_cli`
//! - `docmodel_cli find <snapshot.json> <class> [query-json]`
//! - `docmodel_cli dump <snapshot.json>`
//!
//! Set `DOCMODEL_LOG_DIR` (absolute) to enable file logging.

use docmodel_core::{default_log_level, init_logging, load_snapshot, ModelOptions};
use serde_json::{Map, Value};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("DOCMODEL_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    match args {
        [] => {
            println!("docmodel_core ping={}", docmodel_core::ping());
            println!("docmodel_core version={}", docmodel_core::core_version());
            Ok(())
        }
        [command, snapshot] if command == "dump" => {
            let model = load_snapshot(snapshot, ModelOptions::default()).map_err(|e| e.to_string())?;
            print_json(&model.dump())
        }
        [command, snapshot, class, rest @ ..] if command == "find" && rest.len() <= 1 => {
            let query = match rest.first() {
                Some(text) => parse_query(text)?,
                None => Map::new(),
            };
            let model = load_snapshot(snapshot, ModelOptions::default()).map_err(|e| e.to_string())?;
            let found = model.find(class, &query).map_err(|e| e.to_string())?;
            log::info!(
                "event=cli_find module=cli status=ok class={} hits={}",
                class,
                found.len()
            );
            print_json(&found)
        }
        _ => Err(
            "usage: docmodel_cli [find <snapshot.json> <class> [query-json] | dump <snapshot.json>]"
                .to_string(),
        ),
    }
}

fn parse_query(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(query)) => Ok(query),
        Ok(_) => Err("query must be a JSON object".to_string()),
        Err(err) => Err(format!("query is not valid JSON: {err}")),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}
