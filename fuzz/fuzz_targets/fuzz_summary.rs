// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use lensort::summary::SummaryStore;

fuzz_target!(|data: &[u8]| {
    let _ = SummaryStore::read_from(data);
});
