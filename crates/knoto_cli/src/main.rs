//! CLI probe and synthetic atlas generator.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `knoto_core` linkage.
//! - Seed a store with deterministically placed synthetic nodes for
//!   local development of the layout frontend.
//!
//! The generator uses the seeded inference double on purpose: synthetic
//! data never goes through the production pipeline contract.

use knoto_core::{AtlasConfig, AtlasRegistry, NodeService, SeededInference};
use std::process::ExitCode;
use std::sync::Arc;

const COLOR_PALETTE: &[&str] = &["red", "orange", "yellow", "green", "blue", "violet"];

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None => {
            println!("knoto_core version={}", knoto_core::core_version());
            println!("usage: knoto_cli gen <root_dir> <store_file> <count> [seed]");
            ExitCode::SUCCESS
        }
        Some("gen") => match run_generate(&args[1..]) {
            Ok(count) => {
                println!("inserted {count} synthetic nodes");
                ExitCode::SUCCESS
            }
            Err(message) => {
                eprintln!("error: {message}");
                ExitCode::FAILURE
            }
        },
        Some(other) => {
            eprintln!("unknown command `{other}`; expected `gen`");
            ExitCode::FAILURE
        }
    }
}

fn run_generate(args: &[String]) -> Result<usize, String> {
    if args.len() < 3 || args.len() > 4 {
        return Err("usage: knoto_cli gen <root_dir> <store_file> <count> [seed]".to_string());
    }

    let root_dir = &args[0];
    let store_file = &args[1];
    let count: usize = args[2]
        .parse()
        .map_err(|_| format!("count must be a non-negative integer, got `{}`", args[2]))?;
    let seed: u64 = match args.get(3) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("seed must be a non-negative integer, got `{raw}`"))?,
        None => 0,
    };

    let registry = Arc::new(AtlasRegistry::new());
    registry
        .set_atlas(AtlasConfig::new(root_dir, store_file.clone()))
        .map_err(|err| err.to_string())?;

    let service = NodeService::new(registry.clone(), Arc::new(SeededInference::new(seed)));
    let mut inserted = 0;
    for index in 0..count {
        let filepath = format!("path/to/node_{index}.md");
        let color = COLOR_PALETTE[index % COLOR_PALETTE.len()];
        service
            .insert(&filepath, &filepath, color)
            .map_err(|err| format!("insert failed for {filepath}: {err}"))?;
        inserted += 1;
    }

    registry.shutdown();
    Ok(inserted)
}
