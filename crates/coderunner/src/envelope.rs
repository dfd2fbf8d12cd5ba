//! Result envelope returned by the sandbox and its decoder

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::{CodeRunnerError, DecodeStage};

/// Outcome of one stage (compile or run) inside the sandbox
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageResult {
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub execution_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cpu_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub return_code: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub stdout: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stderr: String,
}

/// Outer envelope produced by the sandbox executor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultEnvelope {
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub compile_result: StageResult,
    #[serde(deserialize_with = "null_as_default")]
    pub run_result: StageResult,
    #[serde(deserialize_with = "null_as_default")]
    pub executor_pod_name: String,
}

/// Explicit `null` decodes as the field's zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes the raw control-plane result into the snippet's return value.
#[derive(Debug, Clone, Default)]
pub struct ResultDecoder;

impl ResultDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a raw result payload.
    ///
    /// A non-empty `run_result.stderr` always wins over stdout, even when
    /// stdout would parse.
    pub fn decode(&self, raw: Option<&str>) -> Result<Map<String, Value>, CodeRunnerError> {
        let raw = raw.ok_or(CodeRunnerError::MissingResult)?;

        let envelope: ResultEnvelope =
            serde_json::from_str(raw).map_err(|e| CodeRunnerError::DecodeError {
                stage: DecodeStage::Envelope,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            status = %envelope.status,
            run_status = %envelope.run_result.status,
            return_code = envelope.run_result.return_code,
            execution_time = envelope.run_result.execution_time,
            pod = %envelope.executor_pod_name,
            "Decoded sandbox result envelope"
        );

        let run = envelope.run_result;
        if !run.stderr.is_empty() {
            return Err(CodeRunnerError::ExecutionError { stderr: run.stderr });
        }

        serde_json::from_str(&run.stdout).map_err(|e| CodeRunnerError::DecodeError {
            stage: DecodeStage::Stdout,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_with(stdout: &str, stderr: &str) -> String {
        let return_code = if stderr.is_empty() { 0 } else { 1 };
        json!({
            "status": "Success",
            "message": "",
            "compile_result": {"status": "", "execution_time": 0.0, "cpu_time": 0.0,
                               "return_code": 0, "stdout": "", "stderr": ""},
            "run_result": {"status": "Finished", "execution_time": 0.021, "cpu_time": 0.018,
                           "return_code": return_code,
                           "stdout": stdout, "stderr": stderr},
            "executor_pod_name": "pod-1",
            "files": {}
        })
        .to_string()
    }

    #[test]
    fn test_missing_result() {
        assert!(matches!(
            ResultDecoder::new().decode(None),
            Err(CodeRunnerError::MissingResult)
        ));
    }

    #[test]
    fn test_stdout_round_trip() {
        let expected = json!({
            "y": 2,
            "text": "quote \" backslash \\ newline \n",
            "nested": {"a": [1, 2, {"b": null}]},
            "float": 1.5
        });
        let stdout = format!("{}\n", expected);
        let result = ResultDecoder::new()
            .decode(Some(&envelope_with(&stdout, "")))
            .unwrap();
        assert_eq!(Value::Object(result), expected);
    }

    #[test]
    fn test_stderr_wins_over_valid_stdout() {
        let raw = envelope_with("{\"y\": 2}", "ValueError: bad input");
        match ResultDecoder::new().decode(Some(&raw)) {
            Err(CodeRunnerError::ExecutionError { stderr }) => {
                assert_eq!(stderr, "ValueError: bad input")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_stderr_kept_verbatim_with_invalid_stdout() {
        let stderr = "Traceback (most recent call last):\n  KeyError: 'x'\n";
        let raw = envelope_with("not json", stderr);
        match ResultDecoder::new().decode(Some(&raw)) {
            Err(CodeRunnerError::ExecutionError { stderr: got }) => assert_eq!(got, stderr),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(matches!(
            ResultDecoder::new().decode(Some("{not json")),
            Err(CodeRunnerError::DecodeError {
                stage: DecodeStage::Envelope,
                ..
            })
        ));
    }

    #[test]
    fn test_unparseable_stdout() {
        let raw = envelope_with("None\n", "");
        assert!(matches!(
            ResultDecoder::new().decode(Some(&raw)),
            Err(CodeRunnerError::DecodeError {
                stage: DecodeStage::Stdout,
                ..
            })
        ));
    }

    #[test]
    fn test_non_object_stdout_is_a_decode_error() {
        let raw = envelope_with("[1, 2, 3]", "");
        assert!(matches!(
            ResultDecoder::new().decode(Some(&raw)),
            Err(CodeRunnerError::DecodeError {
                stage: DecodeStage::Stdout,
                ..
            })
        ));
    }

    #[test]
    fn test_envelope_fields_default_when_absent() {
        let raw = json!({"run_result": {"stdout": "{}"}}).to_string();
        let result = ResultDecoder::new().decode(Some(&raw)).unwrap();
        assert!(result.is_empty());

        let envelope: ResultEnvelope = serde_json::from_str("{}").unwrap();
        assert_eq!(envelope, ResultEnvelope::default());
    }

    #[test]
    fn test_null_fields_decode_as_zero_values() {
        let raw = json!({
            "status": null,
            "compile_result": null,
            "run_result": {
                "status": "Finished",
                "return_code": null,
                "execution_time": null,
                "stdout": "{\"y\": 2}",
                "stderr": null
            }
        })
        .to_string();

        let result = ResultDecoder::new().decode(Some(&raw)).unwrap();
        assert_eq!(Value::Object(result), json!({"y": 2}));

        let envelope: ResultEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.run_result.return_code, 0);
        assert_eq!(envelope.run_result.stderr, "");
        assert_eq!(envelope.compile_result, StageResult::default());
    }
}
