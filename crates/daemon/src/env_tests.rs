// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn run_id_uses_explicit_override() {
    std::env::set_var("TE_RUN_ID", "run_fixed_1234");
    assert_eq!(run_id(), "run_fixed_1234");
    std::env::remove_var("TE_RUN_ID");
}

#[test]
#[serial]
fn run_id_generates_when_unset() {
    std::env::remove_var("TE_RUN_ID");
    assert!(run_id().starts_with("run_"));
}

#[test]
#[serial]
fn run_mode_defaults_to_broadcast() {
    std::env::remove_var("TE_RUN_MODE");
    assert_eq!(run_mode(), BindMode::Broadcast);
    assert_eq!(run_mode().host(), "0.0.0.0");
}

#[test]
#[serial]
fn run_mode_local_maps_to_loopback() {
    std::env::set_var("TE_RUN_MODE", "local");
    assert_eq!(run_mode(), BindMode::Local);
    assert_eq!(run_mode().host(), "127.0.0.1");
    std::env::remove_var("TE_RUN_MODE");
}

#[test]
#[serial]
fn log_level_defaults_to_info() {
    std::env::remove_var("TE_LOG_LEVEL");
    assert_eq!(log_level(), "info");
}
