use shared_types::*;
use std::fs;
use std::path::{Path, PathBuf};
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for the pipeline boundary types
    let mut types = Vec::new();

    // Payment types
    types.push(clean_type(Item::export_to_string()?));
    types.push(clean_type(ShiftReason::export_to_string()?));
    types.push(clean_type(MovedDate::export_to_string()?));

    // Extraction types
    types.push(clean_type(DateLocale::export_to_string()?));
    types.push(clean_type(Issue::export_to_string()?));
    types.push(clean_type(ExtractionResult::export_to_string()?));

    // Risk types
    types.push(clean_type(RiskType::export_to_string()?));
    types.push(clean_type(Severity::export_to_string()?));
    types.push(clean_type(Risk::export_to_string()?));

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("../gui/src/api-types"));
    write_types(&output_dir, &types)
}

fn write_types(output_dir: &Path, types: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // All types land in one file, so cross-type imports are dropped
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
