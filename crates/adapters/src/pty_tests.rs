// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Read as _;
use std::time::Duration;

#[test]
fn spawns_shell_and_reads_output() {
    let command = vec!["/bin/sh".to_string(), "-c".to_string(), "echo hi; sleep 0.1".to_string()];
    let mut pty = PtyProcess::spawn(&command, Path::new("/tmp"), &HashMap::new(), 80, 24).unwrap();

    std::thread::sleep(Duration::from_millis(200));
    let mut buf = [0u8; 256];
    let n = pty.reader.read(&mut buf).unwrap_or(0);
    let text = String::from_utf8_lossy(&buf[..n]);
    assert!(text.contains("hi"));
}

#[test]
fn resize_does_not_error() {
    let command = vec!["sleep".to_string(), "1".to_string()];
    let mut pty = PtyProcess::spawn(&command, Path::new("/tmp"), &HashMap::new(), 80, 24).unwrap();
    pty.resize(100, 40).unwrap();
}

#[test]
fn default_command_falls_back_to_login_shell() {
    let pty = PtyProcess::spawn(&[], Path::new("/tmp"), &HashMap::new(), 80, 24);
    assert!(pty.is_ok());
}
