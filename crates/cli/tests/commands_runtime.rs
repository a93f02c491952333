use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use serde_json::{json, Value};
use solquote_cli::commands::{buildup, config, eligibility, lease, loan};
use solquote_core::config::{AppConfig, LoadOptions};
use tempfile::TempDir;

#[test]
fn buildup_prices_design_and_returns_grand_total() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_input(&dir, "quote.json", buildup_input(true));

    let result = buildup::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 0, "expected successful buildup: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "buildup");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["panelQuoteDetails"][0]["netCost"], "2400.00");
    assert_eq!(payload["data"]["projectGrossTotal"]["netCost"], "4250.00");
    assert_eq!(payload["data"]["projectGrandTotal"]["netCost"], "4040.00");
}

#[test]
fn buildup_without_partner_config_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_input(&dir, "quote.json", buildup_input(false));

    let result = buildup::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 4);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "not_found");
    assert_eq!(payload["data"]["correlation_id"], "buildup:quote");
}

#[test]
fn unreadable_input_is_an_input_failure() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("missing.json");

    let result = loan::run(&AppConfig::default(), &missing);
    assert_eq!(result.exit_code, 3);
    assert_eq!(parse_payload(&result.output)["error_class"], "input");

    let garbage = write_input(&dir, "garbage.json", json!({ "interestRate": "not a rate" }));
    let result = loan::run(&AppConfig::default(), &garbage);
    assert_eq!(result.exit_code, 3);
}

#[test]
fn loan_returns_schedule_with_summary() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_input(
        &dir,
        "loan.json",
        json!({
            "interestRate": "6",
            "loanAmount": "10000",
            "loanTerm": 12,
            "monthlyPayment": null,
            "reinvestment": [{ "month": 6, "amount": "500" }]
        }),
    );

    let result = loan::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 0, "expected successful loan: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["entries"][0]["interestComponent"], "50.00");
    assert_eq!(payload["data"]["entries"][5]["prePaymentAmount"], "500.00");
    assert_eq!(payload["data"]["summary"]["totalPrePayments"], "500.00");
}

#[test]
fn loan_without_amount_is_missing_attribute() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_input(&dir, "loan.json", json!({ "interestRate": "6", "loanTerm": 12 }));

    let result = loan::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 4);
    assert_eq!(parse_payload(&result.output)["error_class"], "missing_attribute");
}

#[test]
fn lease_renders_document_fields_for_shortened_esa() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_input(
        &dir,
        "esa.json",
        json!({
            "attributes": {
                "type": "esa",
                "esaTerm": 10,
                "rateEscalator": "2.9",
                "grossFinancePayment": "125"
            },
            "production": { "generationKwh": "9000", "annualDegradation": null, "guaranteedProduction": null }
        }),
    );

    let result = lease::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 0, "expected successful lease: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["schedule"]["paymentsByYear"].as_array().map(Vec::len), Some(25));
    assert_eq!(payload["data"]["documentFields"]["payment_year1"], "$125.00");
    assert_eq!(payload["data"]["documentFields"]["payment_year12"], "$0.00");
    assert_eq!(payload["data"]["documentFields"]["payoff_year_12"], "$0.00");
    assert_eq!(payload["data"]["documentFields"]["payoff_year_2"], "N/A");
}

#[test]
fn eligibility_annotates_out_of_range_lease() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_input(
        &dir,
        "products.json",
        json!({
            "products": [
                {
                    "id": "lease-small",
                    "name": "Small Lease",
                    "productType": "lease",
                    "minSystemKw": "2",
                    "maxSystemKw": "6",
                    "minBatteryKwh": null,
                    "maxBatteryKwh": null,
                    "minProductivity": null,
                    "maxProductivity": null
                },
                {
                    "id": "cash",
                    "name": "Cash",
                    "productType": "cash",
                    "minSystemKw": null,
                    "maxSystemKw": null,
                    "minBatteryKwh": null,
                    "maxBatteryKwh": null,
                    "minProductivity": null,
                    "maxProductivity": null
                }
            ],
            "design": { "systemCapacityKw": "8", "productivity": "1300" }
        }),
    );

    let result = eligibility::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "1 of 2 products eligible");
    assert_eq!(payload["data"][0]["product"]["name"], "Small Lease (not eligible)");
    assert_eq!(payload["data"][1]["eligible"], true);
}

#[test]
fn config_reports_env_and_file_sources() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("solquote.toml");
    fs::write(&config_path, "[engine]\nfull_product_term_years = 20\n").expect("write config");

    with_env(&[("SOLQUOTE_LOGGING_LEVEL", "debug")], || {
        let options = LoadOptions {
            config_path: Some(config_path.clone()),
            require_file: true,
            ..LoadOptions::default()
        };
        let result = config::run(&options);
        assert_eq!(result.exit_code, 0, "expected config success: {}", result.output);

        let payload = parse_payload(&result.output);
        let entries = payload["data"].as_array().cloned().unwrap_or_default();
        let entry = |key: &str| {
            entries.iter().find(|entry| entry["key"] == key).cloned().unwrap_or(Value::Null)
        };

        assert_eq!(entry("engine.full_product_term_years")["value"], "20");
        assert!(entry("engine.full_product_term_years")["source"]
            .as_str()
            .is_some_and(|source| source.starts_with("file")));
        assert_eq!(entry("logging.level")["source"], "env (SOLQUOTE_LOGGING_LEVEL)");
        assert_eq!(entry("engine.buyout_first_year")["source"], "default");
    });
}

#[test]
fn config_returns_failure_for_invalid_values() {
    with_env(&[("SOLQUOTE_ENGINE_BUYOUT_ANNUAL_DISCOUNT_RATE", "150")], || {
        let result = config::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn buildup_input(with_partner: bool) -> Value {
    let mut input = json!({
        "partnerId": "partner-1",
        "design": {
            "systemCapacityKw": "8",
            "panels": [{
                "modelId": "panel-400",
                "quantity": "20",
                "snapshot": {
                    "name": "Panel 400",
                    "manufacturer": "Acme Solar",
                    "unitCost": "0.30",
                    "pricingUnit": "perWatt",
                    "rating": "400",
                    "snapshotDate": "2026-01-01T00:00:00Z"
                }
            }],
            "softCosts": [{
                "modelId": "permit",
                "quantity": "1",
                "snapshot": {
                    "name": "Permit",
                    "manufacturer": null,
                    "unitCost": "1000",
                    "pricingUnit": "each",
                    "rating": null,
                    "snapshotDate": "2026-01-01T00:00:00Z"
                }
            }]
        },
        "financing": { "productType": "cash" },
        "incentives": {
            "discounts": [{
                "id": "flat-210",
                "name": "Neighbor discount",
                "amount": "210",
                "unit": "$",
                "appliesTo": null,
                "startDate": null,
                "endDate": null
            }]
        },
        "selection": { "discountIds": ["flat-210"] },
        "asOf": "2026-06-01T12:00:00Z"
    });

    if with_partner {
        input["partnerConfig"] = json!({
            "partnerId": "partner-1",
            "adderMarkup": "10",
            "softCostMarkup": "0",
            "swellStandardMarkup": "25",
            "laborFeeSchedules": []
        });
    }
    input
}

fn write_input(dir: &TempDir, name: &str, value: Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, value.to_string()).expect("write input");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SOLQUOTE_ENGINE_BUYOUT_ANNUAL_DISCOUNT_RATE",
        "SOLQUOTE_ENGINE_BUYOUT_FIRST_YEAR",
        "SOLQUOTE_ENGINE_FULL_PRODUCT_TERM_YEARS",
        "SOLQUOTE_ENGINE_DEFAULT_ANNUAL_DEGRADATION",
        "SOLQUOTE_ENGINE_DEFAULT_GUARANTEED_PRODUCTION",
        "SOLQUOTE_ENGINE_MONEY_DECIMAL_PLACES",
        "SOLQUOTE_LOGGING_LEVEL",
        "SOLQUOTE_LOGGING_FORMAT",
        "SOLQUOTE_LOG_LEVEL",
        "SOLQUOTE_LOG_FORMAT",
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
