//! Canonicalize command implementation.

use crate::input;
use restore_canonical::Canonicalizer;
use serde_json::Value;

pub fn run(input: Option<String>, max_size: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let value: Value = input::read_json(input.as_deref(), max_size)?;

    let result = Canonicalizer::new()
        .canonicalize_json(&value)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    println!("{}", result.text);
    Ok(())
}
