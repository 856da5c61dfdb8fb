//! Stress tests for logtail
//!
//! These tests verify the tail under volume and with concurrent readers and
//! writers sharing one instance.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use logtail::{FileLogTail, LogLevel, LogTail, LoggerTail, TailConfig};
use rand::Rng;
use tempfile::TempDir;

/// Append 5,000 events and read every one back by index
#[test]
fn test_append_throughput() {
    let temp_dir = TempDir::new().unwrap();
    let tail = FileLogTail::new();
    tail.initialize(temp_dir.path().join("log"), false);
    let event_count = 5_000;

    let start = Instant::now();
    for i in 0..event_count {
        tail.info(format!("event {}", i)).expect("Failed to append event");
    }
    let duration = start.elapsed();
    println!(
        "Appended {} events in {:?} ({:.2} events/sec)",
        event_count,
        duration,
        event_count as f64 / duration.as_secs_f64()
    );

    assert_eq!(tail.size(), event_count);
    for i in (0..event_count).step_by(97) {
        let event = tail.get_log_event(i).unwrap();
        assert_eq!(event.message(), format!("event {}", i));
    }
}

/// Random levels: threshold queries agree with a filter over the full range
#[test]
fn test_random_levels_threshold_consistency() {
    let temp_dir = TempDir::new().unwrap();
    let tail = FileLogTail::new();
    tail.initialize(temp_dir.path().join("log"), false);

    let mut rng = rand::rng();
    for i in 0..500 {
        let level = LogLevel::ALL[rng.random_range(0..LogLevel::ALL.len())];
        tail.log(level, format!("event {}", i)).unwrap();
    }

    let all = tail.get_log_events(0, None);
    assert_eq!(all.len(), 500);

    for level in LogLevel::ALL {
        let expected: Vec<_> = all.iter().filter(|e| e.level() >= level).cloned().collect();
        let actual = tail.get_log_events_from(Some(level));
        assert_eq!(actual.as_slice(), expected.as_slice());
        assert_eq!(tail.get_first_log_event(Some(level)), expected.first().cloned());
        assert_eq!(tail.get_last_log_event(Some(level)), expected.last().cloned());
    }
}

/// One writer and several readers on the same tail
#[test]
fn test_concurrent_readers_and_writer() {
    const NUM_READERS: usize = 8;
    const EVENTS: usize = 1_000;

    let temp_dir = TempDir::new().unwrap();
    let tail = Arc::new(FileLogTail::with_config(TailConfig::default()));
    tail.initialize(temp_dir.path().join("log"), false);

    let barrier = Arc::new(Barrier::new(NUM_READERS + 1));
    let mut handles = vec![];

    {
        let tail = Arc::clone(&tail);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..EVENTS {
                tail.warn(format!("event {}", i)).unwrap();
            }
        }));
    }

    for _ in 0..NUM_READERS {
        let tail = Arc::clone(&tail);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut last_seen = 0;
            for _ in 0..200 {
                let size = tail.size();
                // Appends are never renumbered or lost from under a reader
                assert!(size >= last_seen);
                last_seen = size;
                if size > 0 {
                    let index = size - 1;
                    let event = tail.get_log_event(index).unwrap();
                    assert_eq!(event.message(), format!("event {}", index));
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(tail.size(), EVENTS);
    assert_eq!(tail.get_log_events_from(Some(LogLevel::Warn)).len(), EVENTS);
}

/// Readers on read-only replicas never block each other or the writer
#[test]
fn test_concurrent_readonly_replicas() {
    const NUM_REPLICAS: usize = 4;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("log");

    let writer = FileLogTail::new();
    writer.initialize(&path, false);
    for i in 0..100 {
        writer.info(format!("event {}", i)).unwrap();
    }
    writer.flush().unwrap();

    let mut handles = vec![];
    for _ in 0..NUM_REPLICAS {
        let path = path.clone();
        handles.push(thread::spawn(move || {
            let replica = FileLogTail::new();
            replica.initialize(&path, true);
            for _ in 0..20 {
                assert!(replica.size() >= 100);
                assert_eq!(
                    replica.get_first_log_event(None).unwrap().message(),
                    "event 0"
                );
                assert!(!replica.is_open());
            }
        }));
    }

    for i in 100..150 {
        writer.info(format!("event {}", i)).unwrap();
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let replica = FileLogTail::new();
    replica.initialize(&path, true);
    assert_eq!(replica.size(), 150);
}
