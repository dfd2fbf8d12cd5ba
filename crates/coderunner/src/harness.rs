//! Harness rendering
//!
//! Wraps a caller's snippet into a runnable script that calls the snippet's
//! `main(args)` entrypoint with the request parameters, prints the returned
//! mapping as one JSON line on stdout, and reports any raised exception as
//! `Kind: message` on stderr with a non-zero exit status.
//!
//! Parameters never appear in the script as source text: they are serialized
//! to JSON, base64-encoded and decoded by the harness at run time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::types::{CodeRunnerError, Language};

const PYTHON_PRELUDE: &str = r#"
import asyncio
import base64
import json
import sys

class Args:
    def __init__(self, params):
        self.params = params

class Output(dict):
    pass

"#;

const PYTHON_PARAMS_MARKER: &str = "__harness_params_b64 = \"";

/// Renders snippets into runnable harness scripts
#[derive(Debug, Clone, Default)]
pub struct HarnessBuilder;

impl HarnessBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the harness for `language` around `code`.
    pub fn build(
        &self,
        language: Language,
        code: &str,
        params: &Map<String, Value>,
    ) -> Result<String, CodeRunnerError> {
        let encoded = encode_params(params)?;
        match language {
            Language::Python => Ok(render_python(code, &encoded)),
        }
    }
}

/// Serialize parameters to JSON and base64-encode them.
pub fn encode_params(params: &Map<String, Value>) -> Result<String, CodeRunnerError> {
    let json = serde_json::to_vec(params).map_err(|e| CodeRunnerError::HarnessError {
        reason: format!("failed to serialize params: {}", e),
    })?;
    Ok(STANDARD.encode(json))
}

fn render_python(code: &str, encoded_params: &str) -> String {
    let mut script = String::with_capacity(PYTHON_PRELUDE.len() + code.len() + 512);
    script.push_str(PYTHON_PRELUDE);
    script.push_str(code);
    script.push_str("\n\n");
    script.push_str(PYTHON_PARAMS_MARKER);
    script.push_str(encoded_params);
    script.push_str("\"\n");
    script.push_str(
        r#"
try:
    __harness_params = json.loads(base64.b64decode(__harness_params_b64).decode("utf-8"))
    result = asyncio.run(main(Args(__harness_params)))
    print(json.dumps(result))
except Exception as e:
    print(f"{type(e).__name__}: {str(e)}", file=sys.stderr)
    sys.exit(1)
"#,
    );
    script
}
