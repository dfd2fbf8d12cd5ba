//! Shared fixtures for runner integration tests

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use symbi_coderunner::RunnerConfig;

pub const FUNCTION_ID: &str = "fn-python-sandbox";

pub const ADD_ONE: &str = "async def main(args: Args) -> Output:\n    \
                           return {\"y\": args.params[\"x\"] + 1}\n";

pub fn config() -> RunnerConfig {
    RunnerConfig::new("AKTEST", "secret", "cn-beijing", FUNCTION_ID)
}

pub fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("params must be an object, got {}", other),
    }
}

/// Result envelope as the sandbox executor returns it
pub fn envelope(stdout: &str, stderr: &str) -> String {
    let return_code = if stderr.is_empty() { 0 } else { 1 };
    json!({
        "status": "Success",
        "message": "",
        "compile_result": {"status": "", "execution_time": 0.0, "cpu_time": 0.0,
                           "return_code": 0, "stdout": "", "stderr": ""},
        "run_result": {"status": "Finished", "execution_time": 0.034, "cpu_time": 0.029,
                       "return_code": return_code, "stdout": stdout, "stderr": stderr},
        "executor_pod_name": "executor-7f9c",
        "files": {}
    })
    .to_string()
}
