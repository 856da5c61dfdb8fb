//! logtail - inspect and append to log tail files
//!
//! ## Usage
//!
//! ```bash
//! # Append an event
//! logtail --file job.tail append error "copy failed for {}" --arg report.pdf
//!
//! # Read events back
//! logtail --file job.tail get 0
//! logtail --file job.tail range --start 10 --count 5
//! logtail --file job.tail filter --level warn
//! logtail --file job.tail last --level error --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use logtail::{
    FileLogTail, JsonCodec, LogCodec, LogEvent, LogLevel, LogTail, LoggerTail, PostcardCodec,
    TailConfig,
};
use logtail_logging::{LogConfig, LogtailSubscriberBuilder};

type CliTail = FileLogTail<Arc<dyn LogCodec>>;

/// logtail - durable, queryable log files
#[derive(Parser)]
#[command(name = "logtail")]
#[command(about = "Append to and query log tail files")]
#[command(version)]
struct Cli {
    /// Backing file of the tail
    #[arg(short, long, global = true, default_value = "logtail.tail")]
    file: PathBuf,

    /// Payload codec used by the file
    #[arg(long, global = true, value_enum, default_value_t = CodecKind::Postcard)]
    codec: CodecKind,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecKind {
    Postcard,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one event
    Append {
        /// Severity (trace, debug, info, warn, error)
        level: LogLevel,
        /// Message, `{}` placeholders are filled from --arg
        message: String,
        /// Placeholder argument (repeatable)
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Cause attached to the event
        #[arg(long)]
        cause: Option<String>,
    },
    /// Show the event at an index
    Get {
        index: usize,
    },
    /// Show a window of events
    Range {
        /// First index (negative counts as 0)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,
        /// Number of events, all remaining when omitted
        #[arg(long)]
        count: Option<usize>,
    },
    /// Show events at or above a severity
    Filter {
        #[arg(long)]
        level: Option<LogLevel>,
    },
    /// Show the earliest event at or above a severity
    First {
        #[arg(long)]
        level: Option<LogLevel>,
    },
    /// Show the most recent event at or above a severity
    Last {
        #[arg(long)]
        level: Option<LogLevel>,
    },
    /// Print the number of events
    Size,
    /// Delete the backing file
    Delete,
}

impl Commands {
    fn writes(&self) -> bool {
        matches!(self, Commands::Append { .. } | Commands::Delete)
    }
}

fn main() {
    let cli = Cli::parse();

    let _guard = LogtailSubscriberBuilder::new()
        .with_config(LogConfig::cli(cli.verbose))
        .init();

    match run(&cli) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn open_tail(cli: &Cli) -> CliTail {
    let codec: Arc<dyn LogCodec> = match cli.codec {
        CodecKind::Postcard => Arc::new(PostcardCodec),
        CodecKind::Json => Arc::new(JsonCodec),
    };
    let tail = FileLogTail::with_codec(codec, TailConfig::from_env());
    tail.initialize(&cli.file, !cli.command.writes());
    tail
}

fn run(cli: &Cli) -> Result<Vec<String>> {
    let tail = open_tail(cli);
    debug!(path = %cli.file.display(), "Opened tail");
    let lines = execute(&cli.command, &tail, cli.json)?;
    tail.dispose();
    Ok(lines)
}

fn execute(command: &Commands, tail: &CliTail, json: bool) -> Result<Vec<String>> {
    let render = |event: &LogEvent| -> Result<String> {
        if json {
            serde_json::to_string(event).context("failed to render event as JSON")
        } else {
            Ok(event.to_string())
        }
    };
    let render_all = |events: logtail::LogEvents| -> Result<Vec<String>> {
        events.iter().map(&render).collect()
    };
    let render_one = |event: Option<LogEvent>| -> Result<Vec<String>> {
        match event {
            Some(event) => Ok(vec![render(&event)?]),
            None => Ok(Vec::new()),
        }
    };

    match command {
        Commands::Append {
            level,
            message,
            args,
            cause,
        } => {
            let mut event = LogEvent::new(*level, message.clone()).with_arguments(args.clone());
            if let Some(cause) = cause {
                event = event.with_cause(cause.clone());
            }
            tail.log_event(event).context("failed to append event")?;
            tail.flush().context("failed to flush tail")?;
            Ok(Vec::new())
        }
        Commands::Get { index } => render_one(tail.get_log_event(*index)),
        Commands::Range { start, count } => render_all(tail.get_log_events(*start, *count)),
        Commands::Filter { level } => render_all(tail.get_log_events_from(*level)),
        Commands::First { level } => render_one(tail.get_first_log_event(*level)),
        Commands::Last { level } => render_one(tail.get_last_log_event(*level)),
        Commands::Size => Ok(vec![tail.size().to_string()]),
        Commands::Delete => {
            tail.close_and_delete()
                .context("failed to delete backing file")?;
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(file: &std::path::Path, args: &[&str]) -> Cli {
        let mut argv = vec!["logtail", "--file", file.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_append_then_query() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("job.tail");

        run(&cli(&file, &["append", "info", "started"])).unwrap();
        run(&cli(&file, &["append", "error", "lost {}", "--arg", "a.txt", "--cause", "EIO"]))
            .unwrap();

        assert_eq!(run(&cli(&file, &["size"])).unwrap(), vec!["2"]);

        let last = run(&cli(&file, &["last", "--level", "error"])).unwrap();
        assert_eq!(last.len(), 1);
        assert!(last[0].contains("ERROR lost a.txt"));
        assert!(last[0].contains("caused by: EIO"));

        let filtered = run(&cli(&file, &["filter", "--level", "warn"])).unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_range_with_negative_start_and_json() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("job.tail");
        for message in ["a", "b", "c"] {
            run(&cli(&file, &["--codec", "json", "append", "info", message])).unwrap();
        }

        let lines = run(&cli(
            &file,
            &["--codec", "json", "--json", "range", "--start", "-4", "--count", "2"],
        ))
        .unwrap();
        assert_eq!(lines.len(), 2);
        let first: LogEvent = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.message(), "a");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("absent.tail");

        assert!(run(&cli(&file, &["get", "0"])).unwrap().is_empty());
        assert_eq!(run(&cli(&file, &["size"])).unwrap(), vec!["0"]);
        assert!(!file.exists());
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("job.tail");
        run(&cli(&file, &["append", "warn", "x"])).unwrap();
        assert!(file.exists());

        run(&cli(&file, &["delete"])).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_bad_level_rejected() {
        let temp = TempDir::new().unwrap();
        let argv = [
            "logtail",
            "--file",
            temp.path().to_str().unwrap(),
            "append",
            "fatal",
            "x",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
