//! Line-oriented text form of command sequences.
//!
//! Each non-blank, non-comment line is one call such as
//! `SetChoices(4, [("1", "Yes"), ("0", "No")])`. Strings are double-quoted
//! with backslash escapes; numbers and bare identifiers are accepted wherever
//! a string is expected. Arguments may be positional or `name=value`.

use crate::error::{KilnError, Result};
use crate::schema::{Choice, parse_choices};

use super::command::Command;

/// Parse a whole script, skipping blank lines and `#` comments.
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(command) = parse_line(line, i + 1)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// Render commands as a script, one per line.
pub fn render_script(commands: &[Command]) -> String {
    let mut script = String::new();
    for command in commands {
        script.push_str(&command.to_string());
        script.push('\n');
    }
    script
}

/// Parse one script line; `None` for blank and comment lines.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Command>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut cursor = Cursor::new(trimmed, line_no);
    let name = cursor.identifier()?;
    cursor.expect('(')?;
    let args = cursor.arguments()?;
    cursor.skip_ws();
    if let Some(c) = cursor.peek().filter(|c| *c != '#') {
        return Err(cursor.error(format!("unexpected '{}' after ')'", c)));
    }

    build_command(&name, args, line_no).map(Some)
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Bare(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

#[derive(Debug)]
struct Arg {
    key: Option<String>,
    value: Value,
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn new(text: &str, line: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line,
        }
    }

    fn error(&self, message: impl Into<String>) -> KilnError {
        KilnError::ScriptSyntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of line", expected))),
        }
    }

    fn identifier(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a command name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Arguments after the opening parenthesis, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            let key = self.keyword();
            let value = self.value()?;
            args.push(Arg { key, value });

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(args),
                Some(c) => return Err(self.error(format!("expected ',' or ')', found '{}'", c))),
                None => return Err(self.error("unterminated argument list")),
            }
        }
    }

    /// Consume a `name=` prefix if present.
    fn keyword(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        let mut end = start;
        while self
            .chars
            .get(end)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            end += 1;
        }
        if end == start {
            return None;
        }
        let mut after = end;
        while self.chars.get(after).is_some_and(|c| c.is_whitespace()) {
            after += 1;
        }
        if self.chars.get(after) == Some(&'=') {
            self.pos = after + 1;
            Some(self.chars[start..end].iter().collect())
        } else {
            None
        }
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            Some('"') | Some('\'') => self.string().map(Value::Str),
            Some('[') => self.sequence('[', ']').map(Value::List),
            Some('(') => self.sequence('(', ')').map(Value::Tuple),
            Some(_) => self.bare().map(Value::Bare),
            None => Err(self.error("expected a value, found end of line")),
        }
    }

    fn string(&mut self) -> Result<String> {
        let quote_char = self.bump().unwrap_or('"');
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote_char => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Vec<Value>> {
        self.expect(open)?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {
                    // Trailing comma.
                    self.skip_ws();
                    if self.peek() == Some(close) {
                        self.pos += 1;
                        return Ok(items);
                    }
                }
                Some(c) if c == close => return Ok(items),
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)));
                }
                None => return Err(self.error(format!("missing '{}'", close))),
            }
        }
    }

    fn bare(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            let found = self.peek().map(String::from).unwrap_or_default();
            return Err(self.error(format!("unexpected '{}'", found)));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

/// Parameter names of each command, in positional order.
fn parameters(name: &str) -> Option<&'static [&'static str]> {
    let params: &'static [&'static str] = match name {
        "EnsureColumn" => &["column"],
        "RenameColumn" => &["old", "new"],
        "MapColumn" => &["from", "to"],
        "SetFormName" => &["row", "form_name"],
        "SetVariableName" => &["row", "variable_name"],
        "LowercaseVariableName" => &["row"],
        "SetFieldType" => &["row", "field_type"],
        "SetChoices" => &["row", "choices"],
        "SetSlider" => &["row", "min", "min_label", "max", "max_label"],
        "SetFormula" => &["row", "formula"],
        "SetFormat" => &["row", "format"],
        "SetValidation" => &["row", "validation_type", "min", "max"],
        "ClearCell" => &["row", "column"],
        "DeleteRowsIfEmpty" => &["columns"],
        "CreateOutputSheet" => &["name"],
        "ProcessSheet" => &["name", "start_row"],
        "SetCell" => &["row", "column", "value"],
        _ => return None,
    };
    Some(params)
}

/// Resolved arguments of one call, addressed by parameter name.
struct Bound<'a> {
    params: &'static [&'static str],
    values: Vec<Option<Value>>,
    line: usize,
    command: &'a str,
}

impl Bound<'_> {
    fn error(&self, message: impl Into<String>) -> KilnError {
        KilnError::ScriptSyntax {
            line: self.line,
            message: format!("{}: {}", self.command, message.into()),
        }
    }

    fn take(&mut self, param: &str) -> Result<Value> {
        let idx = self
            .params
            .iter()
            .position(|p| *p == param)
            .ok_or_else(|| self.error(format!("no parameter '{}'", param)))?;
        self.values[idx]
            .take()
            .ok_or_else(|| self.error(format!("missing argument '{}'", param)))
    }

    fn text(&mut self, param: &str) -> Result<String> {
        match self.take(param)? {
            Value::Str(s) | Value::Bare(s) => Ok(s),
            _ => Err(self.error(format!("'{}' must be a string", param))),
        }
    }

    fn number(&mut self, param: &str) -> Result<usize> {
        let text = self.text(param)?;
        text.trim()
            .parse::<usize>()
            .map_err(|_| self.error(format!("'{}' must be a row number, got '{}'", param, text)))
    }

    fn columns(&mut self, param: &str) -> Result<Vec<String>> {
        match self.take(param)? {
            Value::Str(s) | Value::Bare(s) => Ok(vec![s]),
            Value::List(items) | Value::Tuple(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Str(s) | Value::Bare(s) => Ok(s),
                    _ => Err(self.error(format!("'{}' must hold column names", param))),
                })
                .collect(),
        }
    }

    fn choices(&mut self, param: &str) -> Result<Vec<Choice>> {
        match self.take(param)? {
            Value::Str(s) => parse_choices(&s).map_err(|e| self.error(e.to_string())),
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Tuple(pair) | Value::List(pair) => match pair.as_slice() {
                        [
                            Value::Str(code) | Value::Bare(code),
                            Value::Str(label) | Value::Bare(label),
                        ] => Ok(Choice::new(code.clone(), label.clone())),
                        _ => Err(self.error("each choice must be a (code, label) pair")),
                    },
                    _ => Err(self.error("each choice must be a (code, label) pair")),
                })
                .collect(),
            _ => Err(self.error(format!("'{}' must be a list of pairs", param))),
        }
    }
}

fn build_command(name: &str, args: Vec<Arg>, line: usize) -> Result<Command> {
    let params = parameters(name).ok_or_else(|| KilnError::ScriptSyntax {
        line,
        message: format!("unknown command '{}'", name),
    })?;

    let mut bound = Bound {
        params,
        values: vec![None; params.len()],
        line,
        command: name,
    };

    let mut next_positional = 0;
    for arg in args {
        let idx = match &arg.key {
            Some(key) => params
                .iter()
                .position(|p| *p == key.as_str())
                .ok_or_else(|| bound.error(format!("unknown argument '{}'", key)))?,
            None => {
                let idx = next_positional;
                next_positional += 1;
                idx
            }
        };
        if idx >= params.len() {
            return Err(bound.error(format!("takes {} argument(s)", params.len())));
        }
        if bound.values[idx].is_some() {
            return Err(bound.error(format!("argument '{}' given twice", params[idx])));
        }
        bound.values[idx] = Some(arg.value);
    }

    let command = match name {
        "EnsureColumn" => Command::EnsureColumn {
            column: bound.text("column")?,
        },
        "RenameColumn" => Command::RenameColumn {
            old: bound.text("old")?,
            new: bound.text("new")?,
        },
        "MapColumn" => Command::MapColumn {
            from: bound.text("from")?,
            to: bound.text("to")?,
        },
        "SetFormName" => Command::SetFormName {
            row: bound.number("row")?,
            form_name: bound.text("form_name")?,
        },
        "SetVariableName" => Command::SetVariableName {
            row: bound.number("row")?,
            variable_name: bound.text("variable_name")?,
        },
        "LowercaseVariableName" => Command::LowercaseVariableName {
            row: bound.number("row")?,
        },
        "SetFieldType" => Command::SetFieldType {
            row: bound.number("row")?,
            field_type: bound.text("field_type")?,
        },
        "SetChoices" => Command::SetChoices {
            row: bound.number("row")?,
            choices: bound.choices("choices")?,
        },
        "SetSlider" => Command::SetSlider {
            row: bound.number("row")?,
            min: bound.text("min")?,
            min_label: bound.text("min_label")?,
            max: bound.text("max")?,
            max_label: bound.text("max_label")?,
        },
        "SetFormula" => Command::SetFormula {
            row: bound.number("row")?,
            formula: bound.text("formula")?,
        },
        "SetFormat" => Command::SetFormat {
            row: bound.number("row")?,
            format: bound.text("format")?,
        },
        "SetValidation" => Command::SetValidation {
            row: bound.number("row")?,
            validation_type: bound.text("validation_type")?,
            min: bound.text("min")?,
            max: bound.text("max")?,
        },
        "ClearCell" => Command::ClearCell {
            row: bound.number("row")?,
            column: bound.text("column")?,
        },
        "DeleteRowsIfEmpty" => Command::DeleteRowsIfEmpty {
            columns: bound.columns("columns")?,
        },
        "CreateOutputSheet" => Command::CreateOutputSheet {
            name: bound.text("name")?,
        },
        "ProcessSheet" => Command::ProcessSheet {
            name: bound.text("name")?,
            start_row: bound.number("start_row")?,
        },
        "SetCell" => Command::SetCell {
            row: bound.number("row")?,
            column: bound.text("column")?,
            value: bound.text("value")?,
        },
        other => {
            return Err(KilnError::ScriptSyntax {
                line,
                message: format!("unknown command '{}'", other),
            });
        }
    };

    Ok(command)
}
