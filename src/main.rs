use std::env;
use std::fs;
use std::process;

use abc_syntax::{parse_with_options, strict, tokenize, ParseOptions};
use log::{Level, LevelFilter, Log, Metadata, Record};

const USAGE: &str = "Usage: abc [--tokens] [--strict] [--config <options.yaml>] <input.abc>";

/// Writes log records to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Level named by `ABC_LOG`, `warn` when unset or unknown.
fn log_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| value.parse::<Level>().ok())
        .map_or(LevelFilter::Warn, |level| level.to_level_filter())
}

fn init_logging() {
    let level = log_level(env::var("ABC_LOG").ok().as_deref());
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().skip(1).collect();

    let mut tokens_only = false;
    let mut strict_mode = false;
    let mut config_path: Option<&String> = None;
    let mut input_path: Option<&String> = None;

    // Parse flags
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tokens" => tokens_only = true,
            "--strict" => strict_mode = true,
            "--config" => match iter.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("{}", USAGE);
                    process::exit(1);
                }
            },
            _ if input_path.is_none() && !arg.starts_with("--") => input_path = Some(arg),
            _ => {
                eprintln!("Unknown argument '{}'", arg);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
    }

    let Some(input_path) = input_path else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };

    let options = match config_path {
        Some(path) => match ParseOptions::load(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => ParseOptions::default(),
    };

    // Read input file
    let source = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    if tokens_only {
        let (tokens, diagnostics) = tokenize(&source);
        for diagnostic in &diagnostics {
            eprintln!("{}", diagnostic);
        }
        print_yaml(&tokens);
        if strict_mode && !diagnostics.is_empty() {
            process::exit(1);
        }
        return;
    }

    let result = parse_with_options(&source, &options);
    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic);
    }
    print_yaml(&result.file);

    if strict_mode {
        if let Err(e) = strict(result) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn print_yaml<T: serde::Serialize>(value: &T) {
    match serde_yaml::to_string(value) {
        Ok(yaml) => print!("{}", yaml),
        Err(e) => {
            eprintln!("Error writing YAML: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(None), LevelFilter::Warn);
        assert_eq!(log_level(Some("debug")), LevelFilter::Debug);
        assert_eq!(log_level(Some("TRACE")), LevelFilter::Trace);
        assert_eq!(log_level(Some("loud")), LevelFilter::Warn);
    }

    #[test]
    fn test_logger_filters_by_level() {
        let logger = StderrLogger {
            level: LevelFilter::Info,
        };
        let info = Metadata::builder().level(Level::Info).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(logger.enabled(&info));
        assert!(!logger.enabled(&debug));
    }
}
