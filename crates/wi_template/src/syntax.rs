//! Template source parsing
//!
//! A template is a block of `Value` declarations, a blank line, then one or
//! more states. Each state is a name at column zero followed by indented
//! rules of the form `^regex [-> actions]`.

use crate::TemplateError;
use regex::Regex;
use std::collections::HashMap;

pub(crate) const START_STATE: &str = "Start";
pub(crate) const END_STATE: &str = "End";
pub(crate) const EOF_STATE: &str = "EOF";

/// Options attached to a `Value` declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueOptions {
    pub filldown: bool,
    pub required: bool,
    pub key: bool,
    pub list: bool,
    pub fillup: bool,
}

impl ValueOptions {
    fn parse(token: &str) -> Option<Self> {
        let mut options = ValueOptions::default();
        for part in token.split(',') {
            match part {
                "Filldown" => options.filldown = true,
                "Required" => options.required = true,
                "Key" => options.key = true,
                "List" => options.list = true,
                "Fillup" => options.fillup = true,
                _ => return None,
            }
        }
        Some(options)
    }
}

/// A declared column
#[derive(Debug, Clone)]
pub struct ValueDef {
    pub name: String,
    pub regex: String,
    pub options: ValueOptions,
}

impl ValueDef {
    /// The value regex as a named capture group
    fn named_group(&self) -> String {
        format!("(?P<{}>{}", self.name, &self.regex[1..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineOp {
    Next,
    Continue,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordOp {
    NoRecord,
    Record,
    Clear,
    Clearall,
}

#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub regex: Regex,
    pub line_op: LineOp,
    pub record_op: RecordOp,
    pub new_state: Option<String>,
    pub error_message: Option<String>,
    /// Value indices captured by this rule
    pub captures: Vec<usize>,
}

/// A compiled template
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) values: Vec<ValueDef>,
    pub(crate) states: HashMap<String, Vec<Rule>>,
}

impl Template {
    /// Compile template source text
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let lines: Vec<&str> = source.lines().collect();
        let mut idx = 0;

        let values = parse_values(&lines, &mut idx)?;
        let states = parse_states(&lines, &mut idx, &values)?;

        if !states.contains_key(START_STATE) {
            return Err(syntax(lines.len(), "missing 'Start' state"));
        }
        if states.get(END_STATE).is_some_and(|rules| !rules.is_empty()) {
            return Err(syntax(lines.len(), "'End' state must not contain rules"));
        }
        for rules in states.values() {
            for rule in rules {
                let Some(target) = &rule.new_state else {
                    continue;
                };
                if target != END_STATE && target != EOF_STATE && !states.contains_key(target) {
                    return Err(syntax(lines.len(), format!("unknown state '{target}'")));
                }
            }
        }

        Ok(Self { values, states })
    }

    /// Column names in declaration order
    pub fn header(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }

    pub fn values(&self) -> &[ValueDef] {
        &self.values
    }

    /// Whether the template declares its own (suppressing) EOF state
    pub(crate) fn has_eof_state(&self) -> bool {
        self.states.contains_key(EOF_STATE)
    }
}

fn syntax(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Syntax {
        line,
        message: message.into(),
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_values(lines: &[&str], idx: &mut usize) -> Result<Vec<ValueDef>, TemplateError> {
    let mut values: Vec<ValueDef> = Vec::new();

    while *idx < lines.len() {
        let line = lines[*idx];
        let line_no = *idx + 1;
        *idx += 1;

        if is_comment(line) {
            continue;
        }
        if line.trim().is_empty() {
            break;
        }

        let Some(rest) = line.strip_prefix("Value ") else {
            return Err(syntax(line_no, "expected 'Value' declaration"));
        };

        let rest = rest.trim_start();
        let (first, after_first) = split_token(rest);
        let (options, name, regex) = match ValueOptions::parse(first) {
            Some(options) => {
                let (name, regex) = split_token(after_first);
                (options, name, regex)
            }
            None => (ValueOptions::default(), first, after_first),
        };

        if !is_valid_name(name) {
            return Err(syntax(line_no, format!("invalid value name '{name}'")));
        }
        if values.iter().any(|v| v.name == name) {
            return Err(syntax(line_no, format!("duplicate value '{name}'")));
        }
        let regex = regex.trim();
        if !(regex.starts_with('(') && regex.ends_with(')')) {
            return Err(syntax(
                line_no,
                format!("value '{name}' regex must be enclosed in parentheses"),
            ));
        }
        Regex::new(regex).map_err(|source| TemplateError::Regex {
            line: line_no,
            source,
        })?;

        values.push(ValueDef {
            name: name.to_string(),
            regex: regex.to_string(),
            options,
        });
    }

    if values.is_empty() {
        return Err(syntax(1, "template declares no values"));
    }
    Ok(values)
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, ""),
    }
}

fn parse_states(
    lines: &[&str],
    idx: &mut usize,
    values: &[ValueDef],
) -> Result<HashMap<String, Vec<Rule>>, TemplateError> {
    let mut states: HashMap<String, Vec<Rule>> = HashMap::new();
    let mut current: Option<String> = None;

    while *idx < lines.len() {
        let line = lines[*idx];
        let line_no = *idx + 1;
        *idx += 1;

        if is_comment(line) {
            continue;
        }
        if line.trim().is_empty() {
            current = None;
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            let name = line.trim_end();
            if !is_valid_name(name) {
                return Err(syntax(line_no, format!("invalid state name '{name}'")));
            }
            if states.contains_key(name) {
                return Err(syntax(line_no, format!("duplicate state '{name}'")));
            }
            states.insert(name.to_string(), Vec::new());
            current = Some(name.to_string());
            continue;
        }

        let Some(state) = current.as_ref() else {
            return Err(syntax(line_no, "rule outside of a state"));
        };
        let rule = parse_rule(line.trim(), line_no, values)?;
        if let Some(rules) = states.get_mut(state) {
            rules.push(rule);
        }
    }

    Ok(states)
}

fn parse_rule(line: &str, line_no: usize, values: &[ValueDef]) -> Result<Rule, TemplateError> {
    if !line.starts_with('^') {
        return Err(syntax(line_no, "rule must start with '^'"));
    }

    let (pattern, action) = match line.rfind(" ->") {
        Some(pos) => (line[..pos].trim_end(), line[pos + 3..].trim()),
        None => (line, ""),
    };

    let (expanded, captures) = expand_values(pattern, line_no, values)?;
    let regex = Regex::new(&expanded).map_err(|source| TemplateError::Regex {
        line: line_no,
        source,
    })?;

    let mut rule = Rule {
        regex,
        line_op: LineOp::Next,
        record_op: RecordOp::NoRecord,
        new_state: None,
        error_message: None,
        captures,
    };
    parse_action(action, line_no, &mut rule)?;
    Ok(rule)
}

/// Replace `${NAME}` / `$NAME` with named groups, `$$` with `$`
fn expand_values(
    pattern: &str,
    line_no: usize,
    values: &[ValueDef],
) -> Result<(String, Vec<usize>), TemplateError> {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut captures = Vec::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name = match chars.peek().map(|&(_, next)| next) {
            Some('$') => {
                chars.next();
                out.push('$');
                continue;
            }
            Some('{') => {
                let start = pos + 2;
                let Some(len) = pattern[start..].find('}') else {
                    return Err(syntax(line_no, "unterminated '${'"));
                };
                let name = &pattern[start..start + len];
                // skip '{', the name and '}'
                for _ in 0..name.chars().count() + 2 {
                    chars.next();
                }
                name
            }
            Some(next) if next.is_ascii_alphabetic() || next == '_' => {
                let start = pos + 1;
                let len = pattern[start..]
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .unwrap_or(pattern.len() - start);
                let name = &pattern[start..start + len];
                for _ in 0..name.chars().count() {
                    chars.next();
                }
                name
            }
            _ => {
                out.push('$');
                continue;
            }
        };

        let Some(index) = values.iter().position(|v| v.name == name) else {
            return Err(syntax(line_no, format!("unknown value '{name}'")));
        };
        if captures.contains(&index) {
            return Err(syntax(line_no, format!("value '{name}' used twice in one rule")));
        }
        out.push_str(&values[index].named_group());
        captures.push(index);
    }

    Ok((out, captures))
}

fn parse_line_op(token: &str) -> Option<LineOp> {
    match token {
        "Next" => Some(LineOp::Next),
        "Continue" => Some(LineOp::Continue),
        "Error" => Some(LineOp::Error),
        _ => None,
    }
}

fn parse_record_op(token: &str) -> Option<RecordOp> {
    match token {
        "NoRecord" => Some(RecordOp::NoRecord),
        "Record" => Some(RecordOp::Record),
        "Clear" => Some(RecordOp::Clear),
        "Clearall" => Some(RecordOp::Clearall),
        _ => None,
    }
}

fn parse_action(action: &str, line_no: usize, rule: &mut Rule) -> Result<(), TemplateError> {
    if action.is_empty() {
        return Ok(());
    }

    let (first, rest) = split_token(action);
    let rest = rest.trim();

    if let Some((line_op, record_op)) = first.split_once('.') {
        rule.line_op =
            parse_line_op(line_op).ok_or_else(|| syntax(line_no, format!("bad line op '{line_op}'")))?;
        rule.record_op = parse_record_op(record_op)
            .ok_or_else(|| syntax(line_no, format!("bad record op '{record_op}'")))?;
    } else if let Some(line_op) = parse_line_op(first) {
        rule.line_op = line_op;
    } else if let Some(record_op) = parse_record_op(first) {
        rule.record_op = record_op;
    } else if rest.is_empty() {
        rule.new_state = Some(first.to_string());
        return Ok(());
    } else {
        return Err(syntax(line_no, format!("bad action '{action}'")));
    }

    if rule.line_op == LineOp::Error {
        if !rest.is_empty() {
            rule.error_message = Some(rest.trim_matches('"').to_string());
        }
        return Ok(());
    }

    if !rest.is_empty() {
        let (state, trailing) = split_token(rest);
        if !trailing.trim().is_empty() {
            return Err(syntax(line_no, format!("bad action '{action}'")));
        }
        if rule.line_op == LineOp::Continue {
            return Err(syntax(line_no, "'Continue' cannot change state"));
        }
        rule.new_state = Some(state.to_string());
    }
    Ok(())
}
