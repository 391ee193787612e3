//! Block parser for the flow language
//!
//! The language is line oriented. Every non-blank line that does not start
//! with `#` is one statement, a `flow`/`state` header, or a block delimiter
//! of an `if` chain. Condition and expression text is stored verbatim; the
//! executor evaluates it later.
//!
//! ```text
//! flow main
//! state greet
//!   ask name "What is your name?"
//!   if len(name) > 10 {
//!     reply "That is a long name"
//!   } elif name == "Ann" {
//!     goto ann
//!   } else {
//!     reply "Hello {{name}}"
//!   }
//! ```

use crate::types::{Action, Branch, Flow, Program, State};

pub mod semantic_validator;


/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized statement: {content}")]
    UnrecognizedStatement { line: usize, content: String },

    #[error("line {line}: malformed {keyword} statement ({reason}): {content}")]
    Malformed {
        line: usize,
        keyword: &'static str,
        reason: &'static str,
        content: String,
    },

    #[error("line {line}: 'state' must appear inside a flow: {content}")]
    StateOutsideFlow { line: usize, content: String },

    #[error("line {line}: statement must appear inside a state: {content}")]
    StatementOutsideState { line: usize, content: String },

    #[error("line {line}: unexpected block delimiter: {content}")]
    UnexpectedBlockEnd { line: usize, content: String },

    #[error("line {line}: block is never closed: {content}")]
    UnclosedBlock { line: usize, content: String },

    #[error("program must declare at least one flow")]
    EmptyProgram,
}

impl ParseError {
    /// 1-based source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::UnrecognizedStatement { line, .. }
            | ParseError::Malformed { line, .. }
            | ParseError::StateOutsideFlow { line, .. }
            | ParseError::StatementOutsideState { line, .. }
            | ParseError::UnexpectedBlockEnd { line, .. }
            | ParseError::UnclosedBlock { line, .. } => Some(*line),
            ParseError::EmptyProgram => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Line Cursor ===================== */

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

impl<'a> Line<'a> {
    fn malformed(&self, keyword: &'static str, reason: &'static str) -> ParseError {
        ParseError::Malformed {
            line: self.number,
            keyword,
            reason,
            content: self.text.to_string(),
        }
    }

    fn unclosed(&self) -> ParseError {
        ParseError::UnclosedBlock {
            line: self.number,
            content: self.text.to_string(),
        }
    }

    fn unexpected_end(&self) -> ParseError {
        ParseError::UnexpectedBlockEnd {
            line: self.number,
            content: self.text.to_string(),
        }
    }
}

/// Significant lines only: trimmed, with blanks and comments dropped.
struct Cursor<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .map(|(idx, raw)| Line {
                number: idx + 1,
                text: raw.trim(),
            })
            .filter(|line| !line.text.is_empty() && !line.text.starts_with('#'))
            .collect();
        Self { lines, pos: 0 }
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Line<'a>> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }
}

/* ===================== Public API ===================== */

/// Parse flow source text into a [`Program`].
///
/// Fails on the first malformed construct; no partial program is returned.
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut cursor = Cursor::new(source);
    let mut program = Program::default();
    let mut current_flow: Option<String> = None;

    while let Some(line) = cursor.next() {
        if let Some(name) = header_name(line, "flow")? {
            program.flows.insert(name.to_string(), Flow::new(name));
            current_flow = Some(name.to_string());
            continue;
        }

        if let Some(name) = header_name(line, "state")? {
            let flow = current_flow
                .as_ref()
                .and_then(|flow_name| program.flows.get_mut(flow_name))
                .ok_or_else(|| ParseError::StateOutsideFlow {
                    line: line.number,
                    content: line.text.to_string(),
                })?;

            let actions = parse_block(&mut cursor)?;

            // At state level the only legal terminators are headers and EOF
            if let Some(next) = cursor.peek() {
                if is_block_delimiter(next.text) {
                    return Err(next.unexpected_end());
                }
            }

            flow.states.insert(
                name.to_string(),
                State {
                    name: name.to_string(),
                    line: line.number,
                    actions,
                },
            );
            continue;
        }

        if is_block_delimiter(line.text) {
            return Err(line.unexpected_end());
        }

        return Err(ParseError::StatementOutsideState {
            line: line.number,
            content: line.text.to_string(),
        });
    }

    if program.flows.is_empty() {
        return Err(ParseError::EmptyProgram);
    }

    Ok(program)
}

/* ===================== Blocks ===================== */

/// Parse statements until a block terminator at this nesting level.
///
/// The terminator itself is left for the caller to consume.
fn parse_block(cursor: &mut Cursor) -> ParseResult<Vec<Action>> {
    let mut actions = Vec::new();

    while let Some(line) = cursor.peek() {
        if is_block_terminator(line.text) {
            break;
        }
        cursor.next();
        actions.push(parse_statement(line, cursor)?);
    }

    Ok(actions)
}

fn parse_statement(line: Line, cursor: &mut Cursor) -> ParseResult<Action> {
    let text = line.text;

    if let Some(rest) = keyword_rest(text, "reply") {
        return Ok(Action::Reply {
            text: unquote(rest).to_string(),
        });
    }

    if let Some(rest) = keyword_rest(text, "goto") {
        if rest.is_empty() {
            return Err(line.malformed("goto", "missing target state"));
        }
        return Ok(Action::Goto {
            target: rest.to_string(),
        });
    }

    if let Some(rest) = keyword_rest(text, "ask") {
        let (var, prompt) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| line.malformed("ask", "expected ask <var> \"<prompt>\""))?;
        return Ok(Action::Ask {
            var: var.to_string(),
            prompt: unquote(prompt.trim()).to_string(),
        });
    }

    if let Some(rest) = keyword_rest(text, "set") {
        return parse_set(line, rest);
    }

    if let Some(rest) = keyword_rest(text, "if") {
        if text.ends_with('{') {
            return parse_if_chain(line, cursor);
        }
        if rest.contains("==") && text.contains(" goto ") {
            return parse_if_goto(line, rest);
        }
        return Err(line.malformed("if", "expected `if <cond> {` or `if <var> == \"<value>\" goto <state>`"));
    }

    if let Some(rest) = keyword_rest(text, "save") {
        let (var, path) = split_pair(rest, " to ")
            .ok_or_else(|| line.malformed("save", "expected save <var> to \"<path>\""))?;
        return Ok(Action::Save {
            var: var.to_string(),
            path: unquote(path).to_string(),
        });
    }

    if let Some(rest) = keyword_rest(text, "load") {
        let (var, path) = split_pair(rest, " from ")
            .ok_or_else(|| line.malformed("load", "expected load <var> from \"<path>\""))?;
        return Ok(Action::Load {
            var: var.to_string(),
            path: unquote(path).to_string(),
        });
    }

    if is_block_delimiter(text) {
        return Err(line.unexpected_end());
    }

    Err(ParseError::UnrecognizedStatement {
        line: line.number,
        content: text.to_string(),
    })
}

fn parse_set(line: Line, rest: &str) -> ParseResult<Action> {
    let (var, value) = rest
        .split_once('=')
        .ok_or_else(|| line.malformed("set", "expected set <var> = <value>"))?;
    let var = var.trim();
    let value = value.trim();

    if var.is_empty() || var.contains(char::is_whitespace) {
        return Err(line.malformed("set", "invalid variable name"));
    }
    if value.is_empty() {
        return Err(line.malformed("set", "missing value"));
    }

    if is_plain_string_literal(value) {
        Ok(Action::Set {
            var: var.to_string(),
            value: unquote(value).to_string(),
        })
    } else {
        Ok(Action::SetExpr {
            var: var.to_string(),
            expr: value.to_string(),
        })
    }
}

fn parse_if_goto(line: Line, rest: &str) -> ParseResult<Action> {
    let (condition, target) = rest
        .split_once(" goto ")
        .ok_or_else(|| line.malformed("if", "missing goto target"))?;
    let (left, right) = condition
        .split_once("==")
        .ok_or_else(|| line.malformed("if", "legacy form only supports =="))?;
    let target = target.trim();

    if left.trim().is_empty() || target.is_empty() {
        return Err(line.malformed("if", "expected if <var> == \"<value>\" goto <state>"));
    }

    Ok(Action::IfGoto {
        left: left.trim().to_string(),
        right: unquote(right.trim()).to_string(),
        target: target.to_string(),
    })
}

/// Parse an `if … { } elif … { } else { }` chain whose header was just consumed.
fn parse_if_chain(header: Line, cursor: &mut Cursor) -> ParseResult<Action> {
    let mut condition = block_condition(header, "if")?;
    let mut branches = Vec::new();

    loop {
        let actions = parse_block(cursor)?;
        branches.push(Branch {
            condition,
            actions,
        });

        let Some(end) = cursor.next() else {
            return Err(header.unclosed());
        };

        if let Some(rest) = end.text.strip_prefix("} elif") {
            condition = block_condition_rest(end, rest, "elif")?;
            continue;
        }

        if let Some(rest) = end.text.strip_prefix("} else") {
            open_else(end, rest.trim(), cursor)?;
            let else_actions = parse_else_body(header, cursor)?;
            return Ok(Action::IfChain {
                branches,
                else_actions: Some(else_actions),
            });
        }

        if end.text != "}" {
            // `state`/`flow` header reached before the closing brace
            return Err(header.unclosed());
        }

        // Two-line spellings: `}` followed by `elif … {` or `else {`
        let Some(next) = cursor.peek() else {
            break;
        };
        if let Some(rest) = keyword_rest(next.text, "elif") {
            cursor.next();
            condition = block_condition_rest(next, rest, "elif")?;
            continue;
        }
        if next.text == "else" || keyword_rest(next.text, "else").is_some() || next.text == "else{" {
            cursor.next();
            let rest = next.text["else".len()..].trim();
            open_else(next, rest, cursor)?;
            let else_actions = parse_else_body(header, cursor)?;
            return Ok(Action::IfChain {
                branches,
                else_actions: Some(else_actions),
            });
        }
        break;
    }

    Ok(Action::IfChain {
        branches,
        else_actions: None,
    })
}

/// Accept `else {` on one line, or `else` followed by a line that is exactly `{`.
fn open_else(line: Line, rest: &str, cursor: &mut Cursor) -> ParseResult<()> {
    match rest {
        "{" => Ok(()),
        "" => match cursor.next() {
            Some(brace) if brace.text == "{" => Ok(()),
            _ => Err(line.malformed("else", "expected `{` to open the else block")),
        },
        _ => Err(line.malformed("else", "unexpected text after else")),
    }
}

fn parse_else_body(header: Line, cursor: &mut Cursor) -> ParseResult<Vec<Action>> {
    let actions = parse_block(cursor)?;
    match cursor.next() {
        Some(end) if end.text == "}" => Ok(actions),
        Some(end) if is_block_delimiter(end.text) => Err(end.unexpected_end()),
        _ => Err(header.unclosed()),
    }
}

fn block_condition(line: Line, keyword: &'static str) -> ParseResult<String> {
    let rest = keyword_rest(line.text, keyword).unwrap_or_default();
    block_condition_rest(line, rest, keyword)
}

/// Condition text between the keyword and the trailing `{`.
fn block_condition_rest(line: Line, rest: &str, keyword: &'static str) -> ParseResult<String> {
    let condition = rest
        .trim()
        .strip_suffix('{')
        .ok_or_else(|| line.malformed(keyword, "expected `{` at end of line"))?
        .trim();

    if condition.is_empty() {
        return Err(line.malformed(keyword, "missing condition"));
    }

    Ok(condition.to_string())
}

/* ===================== Helpers ===================== */

/// Text after `keyword` when the line is `keyword <whitespace> rest`.
fn keyword_rest<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Name declared by a `flow`/`state` header, or `None` if the line is not one.
fn header_name<'a>(line: Line<'a>, keyword: &'static str) -> ParseResult<Option<&'a str>> {
    if line.text == keyword {
        return Err(line.malformed(keyword, "missing name"));
    }
    Ok(keyword_rest(line.text, keyword))
}

fn is_header(text: &str) -> bool {
    text == "flow"
        || text == "state"
        || keyword_rest(text, "flow").is_some()
        || keyword_rest(text, "state").is_some()
}

fn is_block_delimiter(text: &str) -> bool {
    text == "}" || text.starts_with("} elif") || text.starts_with("} else")
}

fn is_block_terminator(text: &str) -> bool {
    is_block_delimiter(text) || is_header(text)
}

fn split_pair<'a>(rest: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    let (var, path) = rest.split_once(separator)?;
    let var = var.trim();
    let path = path.trim();
    if var.is_empty() || path.is_empty() {
        return None;
    }
    Some((var, path))
}

/// Strip exactly one pair of surrounding double quotes, if present.
pub(crate) fn unquote(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// `"..."` with no quote inside, i.e. a literal rather than an expression.
fn is_plain_string_literal(value: &str) -> bool {
    value.len() >= 2
        && value.starts_with('"')
        && value.ends_with('"')
        && !value[1..value.len() - 1].contains('"')
}
