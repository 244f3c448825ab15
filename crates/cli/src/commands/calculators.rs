use serde::Serialize;
use shipcalc_core::{CalculatorRegistry, Translations};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CalculatorEntry {
    key: &'static str,
    label_key: &'static str,
    label: String,
}

#[derive(Debug, Serialize)]
struct CalculatorsOutcome {
    command: &'static str,
    status: &'static str,
    calculators: Vec<CalculatorEntry>,
}

pub fn run() -> CommandResult {
    let registry = CalculatorRegistry::with_builtin();
    let translations = Translations::new();

    let calculators = registry
        .descriptors()
        .into_iter()
        .map(|descriptor| CalculatorEntry {
            key: descriptor.key,
            label_key: descriptor.label_key,
            label: descriptor.label(&translations),
        })
        .collect();

    CommandResult::with_payload(
        "calculators",
        &CalculatorsOutcome { command: "calculators", status: "ok", calculators },
    )
}
