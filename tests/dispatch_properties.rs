use std::ops::ControlFlow;

use proptest::prelude::*;
use serde_json::{Value, json};

use drivertrack::protocol::{Dispatch, LineDispatcher, decode_line};

/// A stdout line: either a progress object or a blank (possibly
/// whitespace-only) line.
#[derive(Debug, Clone)]
enum Line {
    Progress(Value),
    Blank(String),
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        (0u32..=100, "[a-z]{1,8}", any::<bool>()).prop_map(|(progress, status, done)| {
            Line::Progress(json!({"progress": progress, "status": status, "done": done}))
        }),
        "[ \t\r]{0,4}".prop_map(Line::Blank),
    ]
}

proptest! {
    #[test]
    fn objects_are_delivered_once_in_order_and_last_wins(
        lines in proptest::collection::vec(line_strategy(), 0..40)
    ) {
        let mut delivered = Vec::new();
        let mut callback = |p: &drivertrack::ProgressObject| {
            delivered.push(p.clone().into_value());
            ControlFlow::Continue(())
        };

        let mut dispatcher = LineDispatcher::new();
        for line in &lines {
            let raw = match line {
                Line::Progress(v) => v.to_string(),
                Line::Blank(s) => s.clone(),
            };
            let outcome = dispatcher.dispatch(&raw, &mut callback).unwrap();
            prop_assert_ne!(outcome, Dispatch::AbortRequested);
        }
        let candidate = dispatcher.into_candidate().map(|p| p.into_value());

        let expected: Vec<Value> = lines
            .iter()
            .filter_map(|l| match l {
                Line::Progress(v) => Some(v.clone()),
                Line::Blank(_) => None,
            })
            .collect();

        prop_assert_eq!(candidate, expected.last().cloned());
        prop_assert_eq!(delivered, expected);
    }

    #[test]
    fn decoding_arbitrary_text_never_panics(raw in "\\PC{0,64}") {
        let _ = decode_line(&raw);
    }
}
