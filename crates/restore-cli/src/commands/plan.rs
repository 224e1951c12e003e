//! Plan hash and plan verification commands.

use crate::{input, output};
use restore_core::{compute_plan_hash, verify_canonical_evidence, PlanHashInput, PlanHashRecord};
use serde_json::json;

pub fn run_hash(
    input: Option<String>,
    json_output: bool,
    max_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan: PlanHashInput = input::read_json(input.as_deref(), max_size)?;
    plan.check()
        .map_err(|e| format!("Invalid plan-hash input: {}", e))?;

    let record = compute_plan_hash(&plan)?;

    if json_output {
        println!("{}", output::format_json(&record)?);
    } else {
        println!("{}", record.plan_hash);
    }
    Ok(())
}

pub fn run_verify(
    input: Option<String>,
    strict: bool,
    json_output: bool,
    max_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let record: PlanHashRecord = input::read_json(input.as_deref(), max_size)?;
    let valid = verify_canonical_evidence(&record)?;

    if json_output {
        let verdict = json!({
            "plan_hash": record.plan_hash,
            "valid": valid,
        });
        println!("{}", output::format_json(&verdict)?);
    } else {
        println!("{:<64} {}", "PLAN_HASH", "VERDICT");
        println!("{}", "-".repeat(74));
        println!("{:<64} {}", record.plan_hash, if valid { "Ok" } else { "Mismatch" });
    }

    if strict && !valid {
        std::process::exit(1);
    }

    Ok(())
}
