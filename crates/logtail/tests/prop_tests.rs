//! Property tests: the file tail answers every query like the in-memory model

use logtail::{FileLogTail, InMemoryLogTail, LogLevel, LogTail, LoggerTail};
use proptest::prelude::*;
use tempfile::TempDir;

fn level_strategy() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn build(levels: &[LogLevel]) -> (FileLogTail, InMemoryLogTail, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let file = FileLogTail::new();
    file.initialize(temp_dir.path().join("log"), false);
    let model = InMemoryLogTail::new();

    for (i, level) in levels.iter().enumerate() {
        let message = format!("{} {}", level, i);
        file.log(*level, message.clone()).unwrap();
        model.log(*level, message).unwrap();
    }
    (file, model, temp_dir)
}

fn messages(events: logtail::LogEvents) -> Vec<String> {
    events.into_iter().map(|e| e.message().to_string()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn index_lookup_matches_insertion_order(levels in prop::collection::vec(level_strategy(), 0..40)) {
        let (file, _model, _temp) = build(&levels);
        for (i, level) in levels.iter().enumerate() {
            let event = file.get_log_event(i).unwrap();
            prop_assert_eq!(event.level(), *level);
            prop_assert_eq!(event.message(), format!("{} {}", level, i));
        }
        prop_assert!(file.get_log_event(levels.len()).is_none());
    }

    #[test]
    fn threshold_queries_match_model(
        levels in prop::collection::vec(level_strategy(), 0..40),
        threshold in prop::option::of(level_strategy()),
    ) {
        let (file, model, _temp) = build(&levels);

        let from_file = messages(file.get_log_events_from(threshold));
        prop_assert_eq!(&from_file, &messages(model.get_log_events_from(threshold)));

        let first = file.get_first_log_event(threshold).map(|e| e.message().to_string());
        let last = file.get_last_log_event(threshold).map(|e| e.message().to_string());
        prop_assert_eq!(first, from_file.first().cloned());
        prop_assert_eq!(last, from_file.last().cloned());
    }

    #[test]
    fn range_queries_match_model(
        levels in prop::collection::vec(level_strategy(), 0..40),
        start in -5i64..50,
        count in prop::option::of(0usize..60),
    ) {
        let (file, model, _temp) = build(&levels);

        let from_file = messages(file.get_log_events(start, count));
        prop_assert_eq!(&from_file, &messages(model.get_log_events(start, count)));

        let skip = start.max(0) as usize;
        let expected: Vec<String> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| format!("{} {}", level, i))
            .skip(skip)
            .take(count.unwrap_or(usize::MAX))
            .collect();
        prop_assert_eq!(from_file, expected);
    }
}
