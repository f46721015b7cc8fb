//! Tool-call server over stdio.
//!
//! Speaks the tools subset of the Model Context Protocol: line-delimited
//! JSON-RPC 2.0 requests on stdin, one response line per request on stdout.
//! Every tool names its project with a `projectRoot` argument.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checklist;
use crate::config::Config;
use crate::error::{Error, JsonError};
use crate::extract::extract_task_titles;
use crate::manager::TaskManager;
use crate::task::{
    NewSubtask, NewTask, StatusFilter, TaskFilter, TaskPriority, TaskStatus, TaskUpdate,
};

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const TOOL_FAILED: i64 = -32000;

/// Characters of a rejected line kept in the warning log
const LOG_PREVIEW_CHARS: usize = 200;

/// Serve requests from `reader` until EOF, writing responses to `writer`
///
/// A line that is not UTF-8 or not a JSON-RPC request gets a `-32700`
/// reply; the loop keeps serving.
pub fn serve<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> crate::error::Result<()> {
    tracing::info!("tool server ready on stdio");

    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let response = match parse_request(&line) {
            Ok(request) => handle_request(&request),
            Err(message) => Some(JsonRpcResponse::error(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {message}"),
            )),
        };

        if let Some(response) = response {
            writeln!(writer, "{}", serde_json::to_string(&response)?)?;
            writer.flush()?;
        }
    }

    tracing::info!("tool server input closed");
    Ok(())
}

fn parse_request(bytes: &[u8]) -> std::result::Result<JsonRpcRequest, String> {
    let line = std::str::from_utf8(bytes).map_err(|err| {
        tracing::warn!(error = %err, "request line is not valid UTF-8");
        format!("invalid UTF-8: {err}")
    })?;
    serde_json::from_str(line).map_err(|err| {
        tracing::warn!(
            error = %err,
            raw = log_preview(line.trim_end()),
            "invalid JSON-RPC request"
        );
        err.to_string()
    })
}

/// Leading `LOG_PREVIEW_CHARS` characters of `line`, cut on a char boundary
fn log_preview(line: &str) -> &str {
    line.char_indices()
        .nth(LOG_PREVIEW_CHARS)
        .map_or(line, |(end, _)| &line[..end])
}

// ── JSON-RPC types ──

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: String) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    fn tool_error(id: Value, err: &anyhow::Error) -> Self {
        let data = err
            .downcast_ref::<Error>()
            .and_then(|core| serde_json::to_value(JsonError::from(core)).ok());
        JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: TOOL_FAILED,
                message: format!("{err:#}"),
                data,
            }),
        }
    }
}

// ── Tool definitions ──

#[derive(Debug, Serialize)]
struct ToolDefinition {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

fn tool(name: &str, description: &str, mut properties: Value, required: &[&str]) -> ToolDefinition {
    if let Some(map) = properties.as_object_mut() {
        map.insert(
            "projectRoot".to_string(),
            serde_json::json!({
                "type": "string",
                "description": "Absolute path to the project root"
            }),
        );
    }
    let mut required: Vec<&str> = required.to_vec();
    required.insert(0, "projectRoot");

    ToolDefinition {
        name: name.into(),
        description: description.into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

fn tool_definitions() -> Vec<ToolDefinition> {
    let status_enum: Vec<&str> = TaskStatus::all().iter().map(TaskStatus::as_str).collect();
    let priority_enum = ["high", "medium", "low"];

    vec![
        tool(
            "initialize_project",
            "Create the task store for a project.",
            serde_json::json!({
                "projectName": { "type": "string", "description": "Display name (defaults to the directory name)" },
                "force": { "type": "boolean", "description": "Reinitialize an existing store, discarding its tasks" }
            }),
            &[],
        ),
        tool(
            "get_tasks",
            "List tasks, optionally filtered by status and priority.",
            serde_json::json!({
                "status": {
                    "description": "A status or a list of statuses",
                    "oneOf": [
                        { "type": "string", "enum": status_enum },
                        { "type": "array", "items": { "type": "string", "enum": status_enum } }
                    ]
                },
                "priority": { "type": "string", "enum": priority_enum }
            }),
            &[],
        ),
        tool(
            "get_task",
            "Get a task by id, or a subtask by dotted id such as \"3.2\".",
            serde_json::json!({
                "id": { "type": "string" }
            }),
            &["id"],
        ),
        tool(
            "create_task",
            "Create a task with the next free id.",
            serde_json::json!({
                "title": { "type": "string" },
                "description": { "type": "string" },
                "priority": { "type": "string", "enum": priority_enum },
                "status": { "type": "string", "enum": status_enum },
                "dependencies": { "type": "array", "items": { "type": "string" } },
                "details": { "type": "string" },
                "testStrategy": { "type": "string" }
            }),
            &["title"],
        ),
        tool(
            "update_task",
            "Update fields of a task. id, createdAt, updatedAt and subtasks cannot be changed.",
            serde_json::json!({
                "id": { "type": "string" },
                "updates": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "priority": { "type": "string", "enum": priority_enum },
                        "status": { "type": "string", "enum": status_enum },
                        "dependencies": { "type": "array", "items": { "type": "string" } },
                        "details": { "type": "string" },
                        "testStrategy": { "type": "string" }
                    }
                }
            }),
            &["id", "updates"],
        ),
        tool(
            "delete_task",
            "Delete a task and remove it from every dependency list.",
            serde_json::json!({
                "id": { "type": "string" }
            }),
            &["id"],
        ),
        tool(
            "set_task_status",
            "Set the status of a task, or of a subtask by dotted id.",
            serde_json::json!({
                "id": { "type": "string" },
                "status": { "type": "string", "enum": status_enum }
            }),
            &["id", "status"],
        ),
        tool(
            "add_subtask",
            "Append a subtask to a task.",
            serde_json::json!({
                "taskId": { "type": "string" },
                "title": { "type": "string" },
                "description": { "type": "string" }
            }),
            &["taskId", "title"],
        ),
        tool(
            "get_next_task",
            "Pick the task to work on next: an in-progress task first, otherwise the highest priority pending task whose dependencies are done.",
            serde_json::json!({}),
            &[],
        ),
        tool(
            "get_task_stats",
            "Count tasks per status and report the completion percentage.",
            serde_json::json!({}),
            &[],
        ),
        tool(
            "generate_checklist",
            "Write a Markdown checklist of all tasks.",
            serde_json::json!({
                "output": { "type": "string", "description": "Output path relative to the project root" }
            }),
            &[],
        ),
        tool(
            "parse_tasks_from_text",
            "Create a task for every bullet or numbered line in free text.",
            serde_json::json!({
                "text": { "type": "string" },
                "priority": { "type": "string", "enum": priority_enum }
            }),
            &["text"],
        ),
    ]
}

// ── Dispatch ──

pub fn handle_request(request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = request.id.clone().unwrap_or(Value::Null);

    match request.method.as_str() {
        "initialize" => Some(JsonRpcResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "devtasks",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )),

        "ping" => Some(JsonRpcResponse::success(id, serde_json::json!({}))),

        "tools/list" => Some(JsonRpcResponse::success(
            id,
            serde_json::json!({ "tools": tool_definitions() }),
        )),

        "tools/call" => {
            let tool_name = request
                .params
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let args = request
                .params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));

            match handle_tool_call(tool_name, &args) {
                Ok(content) => Some(JsonRpcResponse::success(
                    id,
                    serde_json::json!({
                        "content": [{
                            "type": "text",
                            "text": content
                        }]
                    }),
                )),
                Err(err) => {
                    tracing::warn!(tool = tool_name, error = %err, "tool call failed");
                    Some(JsonRpcResponse::tool_error(id, &err))
                }
            }
        }

        _ if request.method.starts_with("notifications/") => None,

        _ => {
            if request.id.is_none() {
                None
            } else {
                Some(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown method: {}", request.method),
                ))
            }
        }
    }
}

fn handle_tool_call(tool_name: &str, args: &Value) -> Result<String> {
    let project_root = project_root(args)?;
    let manager = TaskManager::for_project(&project_root);

    match tool_name {
        "initialize_project" => {
            let force = args.get("force").and_then(|v| v.as_bool()).unwrap_or(false);
            if manager.is_initialized() && !force {
                return Err(Error::AlreadyInitialized(project_root).into());
            }
            let name = optional_str(args, "projectName").map(str::to_string);
            let document = manager.initialize(name)?;
            Ok(format!(
                "Initialized task store for '{}' at {}",
                document.project_name.as_deref().unwrap_or_default(),
                manager.store().document_path().display()
            ))
        }

        "get_tasks" => {
            let filter = task_filter(args)?;
            let tasks = manager.get_tasks(Some(&filter))?;
            render(&tasks)
        }

        "get_task" => {
            let id = required_str(args, "id")?;
            let found = manager
                .get_task(id)?
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            render(&found)
        }

        "create_task" => {
            let input: NewTask =
                serde_json::from_value(args.clone()).context("invalid create_task arguments")?;
            let task = manager.create_task(input)?;
            render(&task)
        }

        "update_task" => {
            let id = required_str(args, "id")?;
            let updates = args.get("updates").cloned().context("missing updates")?;
            let update: TaskUpdate =
                serde_json::from_value(updates).context("invalid updates")?;
            let task = manager
                .update_task(id, update)?
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            render(&task)
        }

        "delete_task" => {
            let id = required_str(args, "id")?;
            if !manager.delete_task(id)? {
                return Err(Error::TaskNotFound(id.to_string()).into());
            }
            Ok(format!("Deleted task {id}"))
        }

        "set_task_status" => {
            let id = required_str(args, "id")?;
            let status: TaskStatus = required_str(args, "status")?.parse()?;
            let changed = manager
                .set_status(id, status)?
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            render(&changed)
        }

        "add_subtask" => {
            let task_id = required_str(args, "taskId")?;
            let input = NewSubtask {
                title: required_str(args, "title")?.to_string(),
                description: optional_str(args, "description").map(str::to_string),
            };
            let subtask = manager
                .add_subtask(task_id, input)?
                .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
            render(&subtask)
        }

        "get_next_task" => match manager.get_next_task()? {
            Some(task) => render(&task),
            None => Ok("No task is ready to work on".to_string()),
        },

        "get_task_stats" => render(&manager.get_stats()?),

        "generate_checklist" => {
            let mut config = Config::load_from_project(&project_root);
            if let Some(output) = optional_str(args, "output") {
                config.set_checklist_path(output)?;
            }
            let path = checklist::write_checklist(&manager, &config)?;
            Ok(format!("Wrote checklist to {}", path.display()))
        }

        "parse_tasks_from_text" => {
            let text = required_str(args, "text")?;
            let priority = optional_str(args, "priority")
                .map(str::parse::<TaskPriority>)
                .transpose()?;
            let mut created = Vec::new();
            for title in extract_task_titles(text) {
                created.push(manager.create_task(NewTask {
                    priority,
                    ..NewTask::titled(title)
                })?);
            }
            render(&created)
        }

        _ => bail!("Unknown tool: {tool_name}"),
    }
}

fn project_root(args: &Value) -> Result<PathBuf> {
    let root = required_str(args, "projectRoot")?;
    let root = Path::new(root);
    if !root.is_dir() {
        bail!("projectRoot is not a directory: {}", root.display());
    }
    Ok(root.to_path_buf())
}

/// Filter arguments parsed the way the CLI parses `--status` / `--priority`
fn task_filter(args: &Value) -> Result<TaskFilter> {
    let status = match args.get("status") {
        None | Some(Value::Null) => None,
        Some(Value::String(one)) => Some(StatusFilter::One(one.parse::<TaskStatus>()?)),
        Some(Value::Array(many)) => Some(StatusFilter::Any(
            many.iter()
                .map(|value| -> Result<TaskStatus> {
                    Ok(value
                        .as_str()
                        .context("status list entries must be strings")?
                        .parse::<TaskStatus>()?)
                })
                .collect::<Result<Vec<_>>>()?,
        )),
        Some(other) => bail!("invalid status filter: {other}"),
    };
    let priority = match args.get("priority") {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value.parse::<TaskPriority>()?),
        Some(other) => bail!("invalid priority filter: {other}"),
    };
    Ok(TaskFilter { status, priority })
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    optional_str(args, key).with_context(|| format!("missing {key}"))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to render tool result")
}
