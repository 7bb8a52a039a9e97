// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_only_when_told() {
    let clock = FakeClock::new(1_000);
    assert_eq!(clock.epoch_ms(), 1_000);
    clock.advance_ms(500);
    assert_eq!(clock.epoch_ms(), 1_500);
}

#[test]
fn epoch_secs_truncates_ms() {
    let clock = FakeClock::new(1_999);
    assert_eq!(clock.epoch_secs(), 1);
}

#[test]
fn system_clock_is_monotonic_forward() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    assert!(b >= a);
}
