// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::var("OUT_DIR")?;
    let path = std::path::Path::new(&out_dir).join("env_vars.rs");
    let mut f = std::fs::File::create(path)?;

    let vars = [
        ("DAMA_API_BASE_URL", "DAMA_API_BASE_URL"),
        ("DAMA_WS_URL", "DAMA_WS_URL"),
        ("DAMA_PASSWORD", "DAMA_PASSWORD"),
    ];

    for (const_name, env_name) in &vars {
        writeln!(f, "pub const {const_name}: &str = \"{env_name}\";")?;
        // Defaults are baked in with option_env!, so rebuild when they change.
        println!("cargo:rerun-if-env-changed={env_name}");
    }

    Ok(())
}
