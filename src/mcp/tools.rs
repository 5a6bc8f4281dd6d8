//! Tool registration table
//!
//! Every tool is a name, a description, a JSON schema for its arguments and a
//! handler. Arguments are validated against the schema before the handler
//! runs.
//!
//! Result convention: a tool that runs returns a structured JSON record as the
//! text content of the MCP result. Any failure (schema violation, range check,
//! upstream or authentication error) is returned as a result with
//! `isError: true` and the error message as text. Only an unknown tool name is
//! a JSON-RPC error.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::{Value, json};

use super::protocol::{ErrorCode, McpError};
use crate::client::{EncodingApi, MovieApi};
use crate::error::{Error, Result};

/// Largest `limit` accepted by `get_latest_jobs`
pub const MAX_LATEST_JOBS: i64 = 10;

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// Tool entry point: shared clients plus already-validated arguments
pub type ToolHandler = for<'a> fn(&'a ToolContext, &'a Value) -> ToolFuture<'a>;

/// Clients available to tool handlers
pub struct ToolContext {
    pub encoding: Arc<dyn EncodingApi>,
    pub movies: Arc<dyn MovieApi>,
}

pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    validator: JSONSchema,
    handler: ToolHandler,
}

/// What a tool call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

impl ToolOutcome {
    #[allow(dead_code)]
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Failure(_))
    }

    /// Render as an MCP `tools/call` result
    pub fn into_result(self) -> Value {
        let (text, is_error) = match self {
            ToolOutcome::Success(value) => (
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
                false,
            ),
            ToolOutcome::Failure(message) => (message, true),
        };
        json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
        })
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Fails on a duplicate name or an uncompilable schema.
    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        handler: ToolHandler,
    ) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(Error::Other(format!("tool '{}' registered twice", name)));
        }
        let validator = JSONSchema::compile(&input_schema)
            .map_err(|e| Error::Other(format!("invalid schema for tool '{}': {}", name, e)))?;

        self.index.insert(name, self.tools.len());
        self.tools.push(Tool {
            name,
            description,
            input_schema,
            validator,
            handler,
        });
        Ok(())
    }

    /// Registry holding every tool this server exposes
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();

        registry.register(
            "get_job_by_name",
            "Get details of an encoding job by its name",
            object_schema(&[("name", "string", "Name of the encoding job")]),
            get_job_by_name,
        )?;
        registry.register(
            "get_job_tasks_by_id",
            "Get tasks for a specific job by its ID",
            object_schema(&[("job_id", "string", "ID of the encoding job")]),
            get_job_tasks_by_id,
        )?;
        registry.register(
            "get_clients",
            "Get list of all clients",
            object_schema(&[]),
            get_clients,
        )?;
        registry.register(
            "is_cluster_busy",
            "Check if the encoding cluster is busy (has jobs in progress)",
            object_schema(&[]),
            is_cluster_busy,
        )?;
        registry.register(
            "get_latest_jobs",
            "Get the most recent encoding jobs (limit between 1 and 10)",
            object_schema(&[("limit", "integer", "Number of jobs to return (1-10)")]),
            get_latest_jobs,
        )?;
        registry.register(
            "search_movie",
            "Search for a movie by title",
            object_schema(&[("title", "string", "Movie title to search for")]),
            search_movie,
        )?;
        registry.register(
            "get_movie_details",
            "Get detailed information about a movie by its IMDB ID",
            object_schema(&[("imdb_id", "string", "IMDB ID of the movie (e.g. 'tt0111161')")]),
            get_movie_details,
        )?;
        registry.register(
            "get_movie_rating",
            "Get the IMDB rating of the best match for a movie title",
            object_schema(&[("title", "string", "Movie title to rate")]),
            get_movie_rating,
        )?;

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|tool| tool.name)
    }

    /// `tools/list` payload, in registration order
    pub fn list(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    /// Validate and run a tool
    pub async fn call(
        &self,
        ctx: &ToolContext,
        name: &str,
        args: Value,
    ) -> std::result::Result<ToolOutcome, McpError> {
        let tool = self.get(name).ok_or_else(|| {
            McpError::new(ErrorCode::InvalidParams, format!("Unknown tool: {}", name))
        })?;

        let args = if args.is_null() { json!({}) } else { args };
        if let Err(errors) = tool.validator.validate(&args) {
            let problems: Vec<String> = errors.map(|e| e.to_string()).collect();
            let message = format!("Invalid arguments for {}: {}", name, problems.join("; "));
            log::warn!("{}", message);
            return Ok(ToolOutcome::Failure(message));
        }

        match (tool.handler)(ctx, &args).await {
            Ok(value) => Ok(ToolOutcome::Success(value)),
            Err(err) => {
                log::error!("Tool {} failed: {}", name, err);
                Ok(ToolOutcome::Failure(format!("Error: {}", err)))
            }
        }
    }
}

/// Closed object schema whose listed properties are all required
fn object_schema(properties: &[(&str, &str, &str)]) -> Value {
    let props: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, kind, description)| {
            (
                name.to_string(),
                json!({ "type": kind, "description": description }),
            )
        })
        .collect();
    let required: Vec<&str> = properties.iter().map(|(name, _, _)| *name).collect();

    json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false,
    })
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' must be a string", field)))
}

/// Integer value of a JSON number, accepting whole floats such as `5.0`
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() <= i64::MAX as f64)
            .map(|n| n as i64)
    })
}

fn get_job_by_name<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let name = required_str(args, "name")?;
        ctx.encoding.get_job_by_name(name).await
    })
}

fn get_job_tasks_by_id<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let job_id = required_str(args, "job_id")?;
        ctx.encoding.get_job_tasks_by_id(job_id).await
    })
}

fn get_clients<'a>(ctx: &'a ToolContext, _args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move { ctx.encoding.get_clients().await })
}

fn is_cluster_busy<'a>(ctx: &'a ToolContext, _args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let jobs_count = ctx.encoding.get_inprogress_jobs_count().await?;
        let is_busy = jobs_count > 0;
        Ok(json!({
            "is_busy": is_busy,
            "jobs_count": jobs_count,
            "status": if is_busy { "busy" } else { "not busy" },
        }))
    })
}

fn get_latest_jobs<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let limit = args
            .get("limit")
            .and_then(whole_number)
            .filter(|limit| (1..=MAX_LATEST_JOBS).contains(limit))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Limit must be between 1 and {} jobs",
                    MAX_LATEST_JOBS
                ))
            })?;

        let jobs = match ctx.encoding.get_latest_jobs(limit as u32).await? {
            Value::Null => json!([]),
            jobs => jobs,
        };
        Ok(json!({
            "count": jobs.as_array().map_or(0, Vec::len),
            "limit": limit,
            "jobs": jobs,
        }))
    })
}

fn search_movie<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let title = required_str(args, "title")?;
        let results = ctx.movies.search_movie(title, 1, "movie").await?;
        Ok(json!({
            "query": title,
            "total_results": results.total(),
            "movies": results.search,
        }))
    })
}

fn get_movie_details<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let imdb_id = required_str(args, "imdb_id")?;
        let details = ctx.movies.get_movie_details(imdb_id).await?;
        if details.is_empty() {
            return Ok(json!({ "error": format!("No movie found with IMDB ID: {}", imdb_id) }));
        }
        Ok(Value::Object(details))
    })
}

fn get_movie_rating<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let title = required_str(args, "title")?;
        let rating = ctx.movies.get_movie_rating(title).await?;
        Ok(json!({ "title": title, "rating": rating }))
    })
}
