use pkttransfer_driver::{run_check, SelfTestCheck};
use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks: Vec<CheckResult> = SelfTestCheck::ALL.into_iter().map(self_test_check).collect();
    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn self_test_check(check: SelfTestCheck) -> CheckResult {
    let (status, detail) = match run_check(check) {
        Ok(()) => (CheckStatus::Pass, describe(check).to_string()),
        Err(err) => (CheckStatus::Fail, err.to_string()),
    };
    CheckResult {
        name: check.as_str().replace('-', "_"),
        status,
        detail,
    }
}

fn describe(check: SelfTestCheck) -> &'static str {
    match check {
        SelfTestCheck::CrcVector => "crc16(\"123456789\") == 0x906E",
        SelfTestCheck::SerialLoopback => "stuffed frame delivered over byte loopback",
        SelfTestCheck::BusLoopback => "stuffed frame delivered across two bus nodes",
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("pkttransfer doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![self_test_check(SelfTestCheck::CrcVector)],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"name\":\"crc_vector\""));
        assert!(json.contains("\"status\":\"pass\""));
    }

    #[test]
    fn every_self_test_check_passes() {
        for check in SelfTestCheck::ALL {
            assert_eq!(self_test_check(check).status, CheckStatus::Pass);
        }
    }
}
