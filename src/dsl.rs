//! DSL parser and executor for mail pipeline definitions.
//!
//! Pipeline format (CMS Pipelines style):
//! ```text
//! PIPE READ
//! | FILTER FROM = "erich@example.com"
//! | COPY "richard@example.com"
//! | SEND
//! ?
//! ```
//!
//! - `PIPE READ` starts the pipeline, reading records from input
//! - `| <stage>` continues to the next stage
//! - `?` on its own line marks end of pipeline
//! - Lines starting with `#` are comments
//!
//! Stage position rules:
//! - READ must be first, and only first
//! - SEND may appear at most once; records after it keep flowing
//! - A pipeline without SEND runs but writes nothing
//!
//! Supported stages (`<field>` is FROM, TO or BODY):
//! - `READ` - Read three-line records from input
//! - `FILTER <field> = "value"` - Keep records whose field equals value
//! - `FILTER <field> != "value"` - Omit records whose field equals value
//! - `LOCATE [<field>] "pattern"` - Keep records containing pattern
//!   (in any field when none is given)
//! - `NLOCATE [<field>] "pattern"` - Keep records NOT containing pattern
//! - `COPY "address"` - Also send a copy of each record to address
//! - `SEND` - Write records to output

use std::io::{BufRead, Write};

use crate::builder::PipelineBuilder;
use crate::error::{PipelineError, Result};
use crate::record::{LINES_PER_RECORD, Record};
use crate::stage::BoxedStage;

/// A record field addressable from a pipeline definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    From,
    To,
    Body,
}

impl Field {
    fn parse(word: &str) -> Option<Field> {
        match word.to_uppercase().as_str() {
            "FROM" => Some(Field::From),
            "TO" => Some(Field::To),
            "BODY" => Some(Field::Body),
            _ => None,
        }
    }

    /// The value of this field in `record`.
    pub fn get<'r>(&self, record: &'r Record) -> &'r str {
        match self {
            Field::From => &record.from,
            Field::To => &record.to,
            Field::Body => &record.body,
        }
    }
}

/// Parsed pipeline command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// READ - read records from input
    Read,
    /// FILTER <field> = "value"
    FilterEq { field: Field, value: String },
    /// FILTER <field> != "value"
    FilterNe { field: Field, value: String },
    /// LOCATE [<field>] "pattern"
    Locate {
        pattern: String,
        /// Optional field restriction
        field: Option<Field>,
    },
    /// NLOCATE [<field>] "pattern"
    Nlocate {
        pattern: String,
        /// Optional field restriction
        field: Option<Field>,
    },
    /// COPY "address"
    Copy { to: String },
    /// SEND - write records to output
    Send,
}

impl Command {
    /// Can this stage be the first stage in a pipeline (source)?
    pub fn can_be_first(&self) -> bool {
        matches!(self, Command::Read)
    }

    /// Get the stage name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Read => "READ",
            Command::FilterEq { .. } | Command::FilterNe { .. } => "FILTER",
            Command::Locate { .. } => "LOCATE",
            Command::Nlocate { .. } => "NLOCATE",
            Command::Copy { .. } => "COPY",
            Command::Send => "SEND",
        }
    }
}

/// Execute a pipeline defined by DSL text on framed input text.
///
/// Returns (output_text, input_count, output_count) on success, where
/// input_count is the number of complete three-line units in the input.
pub fn execute_pipeline(input_text: &str, pipeline_text: &str) -> Result<(String, usize, usize)> {
    let commands = parse_commands(pipeline_text)?;

    let mut output = Vec::<u8>::new();
    {
        let mut pipeline = build_pipeline(&commands, input_text.as_bytes(), &mut output)?;
        pipeline.drive()?;
    }

    let output_text = String::from_utf8_lossy(&output).into_owned();
    let input_count = input_text.lines().count() / LINES_PER_RECORD;
    let output_count = output_text.lines().count() / LINES_PER_RECORD;

    Ok((output_text, input_count, output_count))
}

/// Assemble parsed commands into a runnable chain.
///
/// `input` feeds the READ stage; `output` is handed to the SEND stage.
pub fn build_pipeline<'a, R, W>(commands: &[Command], input: R, output: W) -> Result<BoxedStage<'a>>
where
    R: BufRead + 'a,
    W: Write + 'a,
{
    let Some((first, rest)) = commands.split_first() else {
        return Err(PipelineError::InvalidPipeline("Pipeline is empty".to_string()));
    };

    if !first.can_be_first() {
        return Err(PipelineError::InvalidPipeline(format!(
            "{} cannot be the first stage (try READ)",
            first.name()
        )));
    }

    let mut builder = PipelineBuilder::new(input);
    let mut output = Some(output);

    for cmd in rest {
        builder = match cmd {
            Command::Read => {
                return Err(PipelineError::InvalidPipeline(
                    "READ can only be the first stage".to_string(),
                ));
            }
            Command::FilterEq { field, value } => {
                let (field, value) = (*field, value.clone());
                builder.filter_by(move |r: &Record| field.get(r) == value)
            }
            Command::FilterNe { field, value } => {
                let (field, value) = (*field, value.clone());
                builder.filter_by(move |r: &Record| field.get(r) != value)
            }
            Command::Locate { pattern, field } => {
                let (field, pattern) = (*field, pattern.clone());
                builder.filter_by(move |r: &Record| contains(r, field, &pattern))
            }
            Command::Nlocate { pattern, field } => {
                let (field, pattern) = (*field, pattern.clone());
                builder.filter_by(move |r: &Record| !contains(r, field, &pattern))
            }
            Command::Copy { to } => builder.copy_to(to.clone()),
            Command::Send => match output.take() {
                Some(out) => builder.send(out),
                None => {
                    return Err(PipelineError::InvalidPipeline(
                        "SEND may appear only once".to_string(),
                    ));
                }
            },
        };
    }

    Ok(builder.build())
}

/// Does `record` contain `pattern` in `field`, or in any field when `None`?
fn contains(record: &Record, field: Option<Field>, pattern: &str) -> bool {
    match field {
        Some(field) => field.get(record).contains(pattern),
        None => [Field::From, Field::To, Field::Body]
            .iter()
            .any(|f| f.get(record).contains(pattern)),
    }
}

/// Parse DSL text into commands.
pub fn parse_commands(text: &str) -> Result<Vec<Command>> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| stage_text(raw).map(|stage| (idx + 1, stage)))
        .map(|(line, stage)| {
            parse_command(stage).map_err(|message| PipelineError::Parse { line, message })
        })
        .collect()
}

/// Strip the framing around one stage: `PIPE` opener, `|` separators and
/// the closing `?`. `None` for lines that hold no stage.
fn stage_text(raw: &str) -> Option<&str> {
    let mut text = raw.trim();
    if text.starts_with('#') {
        return None;
    }

    if let Some(head) = text.get(..4)
        && head.eq_ignore_ascii_case("PIPE")
        && text[4..].chars().next().is_none_or(char::is_whitespace)
    {
        text = text[4..].trim_start();
    }

    let text = text
        .strip_prefix('|')
        .unwrap_or(text)
        .trim_end_matches(['|', '?', ' ', '\t'])
        .trim();
    (!text.is_empty()).then_some(text)
}

/// Parse a single command line.
fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    match keyword.to_uppercase().as_str() {
        "READ" => Ok(Command::Read),
        "SEND" => Ok(Command::Send),
        "FILTER" => parse_filter(rest),
        "LOCATE" => {
            let (pattern, field) = parse_locate(rest, "LOCATE")?;
            Ok(Command::Locate { pattern, field })
        }
        "NLOCATE" => {
            let (pattern, field) = parse_locate(rest, "NLOCATE")?;
            Ok(Command::Nlocate { pattern, field })
        }
        "COPY" => parse_copy(rest),
        _ => Err(format!("Unknown command: {keyword}")),
    }
}

fn parse_field(word: &str) -> std::result::Result<Field, String> {
    Field::parse(word).ok_or_else(|| format!("Unknown field '{word}' (try FROM, TO or BODY)"))
}

/// Parse FILTER arguments: `<field> = "value"` or `<field> != "value"`.
fn parse_filter(rest: &str) -> std::result::Result<Command, String> {
    let (field_word, after_field) = rest
        .split_once(char::is_whitespace)
        .ok_or("FILTER requires a field, an operator and a value")?;
    let field = parse_field(field_word)?;
    let after_field = after_field.trim_start();

    if let Some(value_part) = after_field.strip_prefix("!=") {
        let value = delimited(value_part)?;
        Ok(Command::FilterNe { field, value })
    } else if let Some(value_part) = after_field.strip_prefix('=') {
        let value = delimited(value_part)?;
        Ok(Command::FilterEq { field, value })
    } else {
        Err("FILTER requires = or != operator".to_string())
    }
}

/// Parse LOCATE / NLOCATE arguments: `[<field>] <delimited-pattern>`.
///
/// A leading word made of letters names the field; anything else starts
/// the delimited pattern.
fn parse_locate(
    rest: &str,
    keyword: &str,
) -> std::result::Result<(String, Option<Field>), String> {
    let Some(first) = rest.chars().next() else {
        return Err(format!("{keyword} requires a pattern"));
    };

    if first.is_ascii_alphabetic() {
        let (field_word, pattern_part) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("{keyword} requires a pattern after the field"))?;
        let field = parse_field(field_word)?;
        let pattern = delimited(pattern_part)?;
        Ok((pattern, Some(field)))
    } else {
        let pattern = delimited(rest)?;
        Ok((pattern, None))
    }
}

/// Parse COPY arguments: `"address"`.
fn parse_copy(rest: &str) -> std::result::Result<Command, String> {
    if rest.is_empty() {
        return Err("COPY requires an address".to_string());
    }
    let to = delimited(rest)?;
    if to.is_empty() {
        return Err("COPY address must not be empty".to_string());
    }
    Ok(Command::Copy { to })
}

/// Extract a delimited string: the first non-blank character opens it and
/// its next occurrence closes it, so `/a"b/` and `"a/b"` both work.
/// Nothing but blanks may follow the closing delimiter.
fn delimited(s: &str) -> std::result::Result<String, String> {
    let mut chars = s.trim().chars();
    let delim = chars.next().ok_or("Expected delimited string")?;
    let (inner, trailing) = chars
        .as_str()
        .split_once(delim)
        .ok_or_else(|| format!("Unclosed delimiter '{delim}'"))?;

    if !trailing.trim().is_empty() {
        return Err(format!("Unexpected text after {delim}{inner}{delim}"));
    }
    Ok(inner.to_string())
}
