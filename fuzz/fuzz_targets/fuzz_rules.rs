// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lensort::config::RuleConfig;
use lensort::rules::{ClassificationEngine, PeopleBucket};

#[derive(Arbitrary, Debug)]
struct Input {
    person_count: u32,
    classes: Vec<String>,
}

fuzz_target!(|input: Input| {
    let engine = ClassificationEngine::new(RuleConfig::default());
    let decision = engine.decide(input.person_count, &input.classes);
    let labels = &engine.rules().labels;
    match engine.bucket(input.person_count) {
        PeopleBucket::Portrait => assert_eq!(decision.category, labels.portrait),
        PeopleBucket::Crowd => {
            assert_eq!(decision.category, labels.catch_all);
            assert!(decision.scene_type.is_none());
        }
        _ => assert!(decision.scene_type.is_some()),
    }
});
