// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use yare::parameterized;

fn dama() -> Command {
    let mut cmd = cargo_bin_cmd!("dama");
    cmd.env_remove("DAMA_PASSWORD").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    dama()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch-room"))
        .stdout(predicate::str::contains("watch-game"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("move"))
        .stdout(predicate::str::contains("DAMA_PASSWORD"));
}

#[parameterized(
    watch_room = { &["watch-room", "42"] },
    chat = { &["chat", "3", "gg"] },
    move_piece = { &["move", "7", "5", "0", "4", "1"] },
)]
fn requires_an_email(args: &[&str]) {
    dama()
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("email required"));
}

#[test]
fn requires_a_password() {
    dama()
        .args(["--email", "anna@example.com", "watch-game", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password required"));
}

#[test]
fn rejects_bad_coordinates() {
    dama()
        .args(["move", "7", "5", "0", "4", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
