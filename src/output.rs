//! Result rendering for devtasks commands: a `devtasks.v1` JSON envelope
//! under `--json`, plain text otherwise.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "devtasks.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Details,
    Warnings,
    NextSteps,
}

impl Section {
    const ORDER: [Section; 3] = [Section::Details, Section::Warnings, Section::NextSteps];

    fn title(self) -> &'static str {
        match self {
            Section::Details => "Details",
            Section::Warnings => "Warnings",
            Section::NextSteps => "Next steps",
        }
    }
}

/// Text shown for a command when `--json` is off.
///
/// Warnings and next steps also travel in the JSON envelope.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    items: Vec<(Section, String)>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            items: Vec::new(),
        }
    }

    /// `- key: value` line; an empty value prints the key alone
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.items.push((Section::Details, value.into()));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.items.push((Section::Warnings, value.into()));
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.items.push((Section::NextSteps, value.into()));
    }

    fn section(&self, section: Section) -> impl Iterator<Item = &str> + '_ {
        self.items
            .iter()
            .filter(move |(kind, _)| *kind == section)
            .map(|(_, value)| value.as_str())
    }

    fn section_strings(&self, section: Section) -> Vec<String> {
        self.section(section).map(str::to_string).collect()
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }

        for section in Section::ORDER {
            let mut items = self.section(section).peekable();
            if items.peek().is_none() {
                continue;
            }
            write!(f, "\n\n{}:", section.title())?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Success { data: &'a T },
    Error { error: ErrorBody },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        }
    }
}

fn success_envelope<'a, T: Serialize>(
    command: &'a str,
    data: &'a T,
    human: Option<&HumanOutput>,
) -> Envelope<'a, T> {
    Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        outcome: Outcome::Success { data },
        warnings: human.map(|h| h.section_strings(Section::Warnings)).unwrap_or_default(),
        next_steps: human.map(|h| h.section_strings(Section::NextSteps)).unwrap_or_default(),
    }
}

fn error_envelope<'a>(command: &'a str, err: &Error) -> Envelope<'a, ()> {
    Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        outcome: Outcome::Error {
            error: ErrorBody::from(err),
        },
        warnings: Vec::new(),
        next_steps: error_next_steps(err),
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let envelope = success_envelope(command, data, human);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if let (false, Some(human)) = (options.quiet, human) {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&error_envelope(command, err))?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = error_next_steps(err).first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// First positional argument, skipping global flags and the `--project` value
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--project" {
            args.next();
            continue;
        }
        if !arg.starts_with('-') {
            return arg;
        }
    }
    "devtasks".to_string()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::NotInitialized(_) => "devtasks init".to_string(),
        Error::AlreadyInitialized(_) => "devtasks init --force".to_string(),
        Error::TaskNotFound(_) => "devtasks list".to_string(),
        Error::InvalidConfig(_) => "fix .devtasks.toml then retry".to_string(),
        Error::CorruptData { path, .. } => format!("inspect or restore {}", path.display()),
        Error::LockFailed(_) => "retry once the other devtasks process finishes".to_string(),
        _ => return Vec::new(),
    };
    vec![step]
}
