use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use shipcalc_cli::commands::{calculators, config, doctor, quote};
use shipcalc_core::config::LoadOptions;
use tempfile::TempDir;

const ORDER_WEIGHING_THREE: &str = r#"{
    "kind": "order",
    "id": "R-3",
    "line_items": [
        {"variant": {"weight": "1.5"}, "quantity": 2, "total": "50"}
    ]
}"#;

#[test]
fn quote_prices_order_from_tier_table() {
    with_env(&[("SHIPCALC_COSTS_STRING", "1:5\n2:7\n5:10")], || {
        let (_dir, input) = write_input(ORDER_WEIGHING_THREE);
        let result = quote::run(&input, options());
        assert_eq!(result.exit_code, 0, "expected successful quote");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["entity"], "order");
        assert_eq!(payload["available"], true);
        assert_eq!(payload["cost"], "10");
        assert_eq!(payload["quote"]["total_weight"], "3.0");
    });
}

#[test]
fn quote_adds_handling_fee_below_handling_max() {
    with_env(
        &[
            ("SHIPCALC_COSTS_STRING", "1:5\n2:7\n5:10"),
            ("SHIPCALC_HANDLING_FEE", "3"),
            ("SHIPCALC_HANDLING_MAX", "100"),
        ],
        || {
            let (_dir, input) = write_input(ORDER_WEIGHING_THREE);
            let result = quote::run(&input, options());

            let payload = parse_payload(&result.output);
            assert_eq!(payload["cost"], "13");
            assert_eq!(payload["quote"]["handling_fee"], "3");
        },
    );
}

#[test]
fn quote_prices_shipment_through_its_order() {
    with_env(&[("SHIPCALC_COSTS_STRING", "1:5\n2:7\n5:10")], || {
        let (_dir, input) = write_input(
            r#"{
                "kind": "shipment",
                "id": "H-1",
                "order": {
                    "id": "R-1",
                    "line_items": [{"variant": {}, "quantity": 1, "total": "12"}]
                }
            }"#,
        );
        let result = quote::run(&input, options());

        let payload = parse_payload(&result.output);
        assert_eq!(payload["entity"], "shipment");
        assert_eq!(payload["available"], true);
        assert_eq!(payload["cost"], "5");
    });
}

#[test]
fn quote_reports_overweight_order_as_unavailable() {
    with_env(&[("SHIPCALC_COSTS_STRING", "1:5\n2:7\n5:10")], || {
        let (_dir, input) = write_input(
            r#"{
                "kind": "order",
                "id": "R-6",
                "line_items": [{"variant": {"weight": 6}, "quantity": 1, "total": "80"}]
            }"#,
        );
        let result = quote::run(&input, options());
        assert_eq!(result.exit_code, 0, "unavailability is not a command failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["available"], false);
        assert_eq!(payload["cost"], "0");
        assert_eq!(payload["quote"]["weight_class"], Value::Null);
    });
}

#[test]
fn quote_reports_oversized_item_as_unavailable() {
    with_env(
        &[("SHIPCALC_COSTS_STRING", "1:5\n2:7\n5:10"), ("SHIPCALC_MAX_ITEM_SIZE", "10")],
        || {
            let (_dir, input) = write_input(
                r#"{
                    "kind": "order",
                    "id": "R-9",
                    "line_items": [{"variant": {"width": 12}, "quantity": 1, "total": "20"}]
                }"#,
            );
            let result = quote::run(&input, options());

            let payload = parse_payload(&result.output);
            assert_eq!(payload["available"], false);
            assert_eq!(payload["cost"], "5");
        },
    );
}

#[test]
fn quote_treats_null_and_unknown_entities_as_free() {
    with_env(&[], || {
        for (body, kind) in [("null", "none"), (r#"{"kind": "gift_card"}"#, "unsupported")] {
            let (_dir, input) = write_input(body);
            let result = quote::run(&input, options());
            assert_eq!(result.exit_code, 0, "expected success for {kind}");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["entity"], kind);
            assert_eq!(payload["available"], false);
            assert_eq!(payload["cost"], "0");
            assert_eq!(payload["quote"], Value::Null);
        }
    });
}

#[test]
fn quote_rejects_unreadable_input() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = quote::run(&dir.path().join("missing.json"), options());
        assert_eq!(result.exit_code, 3, "expected invalid input exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn quote_surfaces_unparsable_cost_table() {
    with_env(&[("SHIPCALC_COSTS_STRING", "1:five")], || {
        let (_dir, input) = write_input(ORDER_WEIGHING_THREE);
        let result = quote::run(&input, options());
        assert_eq!(result.exit_code, 4, "expected cost computation exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "cost_computation");
    });
}

#[test]
fn quote_reports_overflowing_weight_without_crashing() {
    with_env(&[("SHIPCALC_COSTS_STRING", "1:5\n2:7\n5:10")], || {
        let (_dir, input) = write_input(
            r#"{
                "kind": "order",
                "id": "R-MAX",
                "line_items": [
                    {"variant": {"weight": "79228162514264337593543950335"}, "quantity": 2, "total": "20"}
                ]
            }"#,
        );
        let result = quote::run(&input, options());
        assert_eq!(result.exit_code, 4, "expected cost computation exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "cost_computation");
        assert!(payload["message"].as_str().unwrap_or("").contains("total order weight overflows"));
    });
}

#[test]
fn quote_returns_config_failure_for_negative_fee() {
    with_env(&[("SHIPCALC_HANDLING_FEE", "-1")], || {
        let (_dir, input) = write_input(ORDER_WEIGHING_THREE);
        let result = quote::run(&input, options());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_with_default_table() {
    with_env(&[], || {
        let payload = parse_payload(&doctor::run(options(), true));
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"][2]["name"], "cost_table_tiers");
        assert!(payload["checks"][2]["details"].as_str().unwrap_or("").starts_with("5 tier(s)"));
    });
}

#[test]
fn doctor_flags_comma_separated_table() {
    with_env(&[("SHIPCALC_COSTS_STRING", "1:5,2:7")], || {
        let payload = parse_payload(&doctor::run(options(), true));
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][1]["name"], "cost_table_format");
        assert_eq!(payload["checks"][1]["status"], "fail");
    });
}

#[test]
fn doctor_skips_table_checks_when_config_fails() {
    with_env(&[("SHIPCALC_LOG_LEVEL", "loud")], || {
        let report = doctor::run(options(), false);
        assert!(report.contains("- [FAIL] config_validation"));
        assert!(report.contains("- [SKIP] cost_table_format"));
        assert!(report.contains("- [SKIP] cost_table_tiers"));
    });
}

#[test]
fn config_reports_env_and_default_sources() {
    with_env(&[("SHIPCALC_HANDLING_FEE", "2")], || {
        let output = config::run(options());
        assert!(output.contains("- calculator.handling_fee = 2 (source: env (SHIPCALC_HANDLING_FEE))"));
        assert!(output.contains("- calculator.default_weight = 1 (source: default)"));
        assert!(output.contains(r"calculator.costs_string = 1:5\n2:7"));
    });
}

#[test]
fn config_reports_file_source() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("shipcalc.toml");
        fs::write(&path, "[calculator]\nmax_item_size = 40\n").expect("write config");

        let output = config::run(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        assert!(output.contains("- calculator.max_item_size = 40 (source: file ("));
    });
}

#[test]
fn calculators_lists_weight_tier_rule() {
    let result = calculators::run();
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["calculators"][0]["key"], "weight_tier");
    assert_eq!(payload["calculators"][0]["label_key"], "simple_weight");
    assert_eq!(payload["calculators"][0]["label"], "Simple Weight");
}

fn options() -> LoadOptions {
    // Point at a file that never exists so a stray shipcalc.toml cannot leak in.
    LoadOptions {
        config_path: Some(env::temp_dir().join("shipcalc-tests-absent.toml")),
        ..LoadOptions::default()
    }
}

fn write_input(body: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("input.json");
    fs::write(&path, body).expect("write input");
    (dir, path)
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SHIPCALC_COSTS_STRING",
        "SHIPCALC_DEFAULT_WEIGHT",
        "SHIPCALC_MAX_ITEM_SIZE",
        "SHIPCALC_HANDLING_FEE",
        "SHIPCALC_HANDLING_MAX",
        "SHIPCALC_LOGGING_LEVEL",
        "SHIPCALC_LOGGING_FORMAT",
        "SHIPCALC_LOG_LEVEL",
        "SHIPCALC_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
