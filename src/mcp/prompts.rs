//! Prompt templates exposed through `prompts/list` and `prompts/get`

use serde_json::{Value, json};

use super::protocol::{ErrorCode, McpError};

pub const MOVIE_ENCODING_STATUS: &str = "movie-encoding-status";

/// `prompts/list` payload
pub fn list() -> Value {
    json!({
        "prompts": [{
            "name": MOVIE_ENCODING_STATUS,
            "description": "Returns a short overview of encoding jobs and cluster status.",
            "arguments": [{
                "name": "job_name",
                "description": "Restrict the report to one job",
                "required": false,
            }],
        }],
    })
}

/// `prompts/get` payload for `name`
pub fn get(name: &str, arguments: &Value) -> Result<Value, McpError> {
    if name != MOVIE_ENCODING_STATUS {
        return Err(McpError::new(
            ErrorCode::InvalidParams,
            format!("Unknown prompt: {}", name),
        ));
    }

    let job_name = arguments
        .get("job_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty());

    Ok(json!({
        "description": "Encoding status report",
        "messages": [{
            "role": "user",
            "content": { "type": "text", "text": movie_encoding_status(job_name) },
        }],
    }))
}

fn movie_encoding_status(job_name: Option<&str>) -> String {
    let job_detail = job_name
        .map(|name| format!(" for job: {}", name))
        .unwrap_or_default();

    format!(
        "Generating encoding status report{}:\n\
         - Current cluster load\n\
         - Active jobs with progress\n\
         - Basic movie info for each job\n\
         - Estimated completion times\n",
        job_detail
    )
}
