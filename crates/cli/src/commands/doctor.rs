use serde::Serialize;
use shipcalc_core::config::{AppConfig, LoadOptions};
use shipcalc_core::{validate_costs_string, CostTable};

use super::escape_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_cost_table_format(&config));
            checks.push(check_cost_table_tiers(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["cost_table_format", "cost_table_tiers"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_cost_table_format(config: &AppConfig) -> DoctorCheck {
    match validate_costs_string(&config.calculator.costs_string) {
        Ok(()) => DoctorCheck {
            name: "cost_table_format",
            status: CheckStatus::Pass,
            details: "cost table is well formed".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "cost_table_format",
            status: CheckStatus::Fail,
            details: format!("{error}; the weight tier rule will be unavailable for every order"),
        },
    }
}

fn check_cost_table_tiers(config: &AppConfig) -> DoctorCheck {
    match CostTable::parse(config.calculator.costs_string.trim()) {
        Ok(table) if table.is_empty() => DoctorCheck {
            name: "cost_table_tiers",
            status: CheckStatus::Fail,
            details: "cost table has no tiers".to_string(),
        },
        Ok(table) => {
            let tiers = table
                .tiers()
                .iter()
                .map(|tier| format!("{} -> {}", tier.threshold, tier.price))
                .collect::<Vec<_>>()
                .join(", ");
            DoctorCheck {
                name: "cost_table_tiers",
                status: CheckStatus::Pass,
                details: format!("{} tier(s): {tiers}", table.len()),
            }
        }
        Err(error) => DoctorCheck {
            name: "cost_table_tiers",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "SKIP",
        };
        lines.push(format!("- [{status}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
