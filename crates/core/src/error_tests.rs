// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    unknown_command = { Error::UnknownCommand("PUBLISH".into()), "PUBLISH" },
    malformed_header = { Error::MalformedHeader("destination".into()), "name:value" },
    invalid_escape = { Error::InvalidEscape("\\t".into()), "\\t" },
    truncated = { Error::Truncated("missing NUL terminator"), "NUL" },
    heart_beat = { Error::InvalidHeartBeat("abc".into()), "10000,10000" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
