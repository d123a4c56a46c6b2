//! Parser for the function-call expressions embedded in field rules.
//!
//! Grammar:
//!
//! ```text
//! expression := [ output '=' ] [ namespace '.' ] name '(' [ argument (',' argument)* ] ')'
//! output     := '{' ident '}' | ident
//! argument   := '\'' literal '\'' | '{' field '}' | field
//! ```
//!
//! Literals may contain `\'`. The token `{@Name}` is replaced with the
//! current field's name before parsing. Quoted literals are masked out
//! first so that commas, parentheses and `=` inside them are never read
//! as structure.

use std::fmt;

use crate::error::FunctionParseError;
use crate::model::FieldValueType;

/// Placeholder for the current field's name.
pub const NAME_TOKEN: &str = "@Name";

const LITERAL_OPEN: char = '\u{E000}';
const LITERAL_CLOSE: char = '\u{E001}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Quoted text fixed at parse time.
    Literal,
    /// Reference to a field of the current item.
    Field,
}

/// One argument of a parsed call.
///
/// For literals `value` is set by the parser. For field references it is
/// empty until the argument is bound against an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub kind: ArgumentKind,
    /// Literal text, or the referenced field name.
    pub text: String,
    pub value_type: FieldValueType,
    pub value: String,
}

impl Argument {
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Argument {
            kind: ArgumentKind::Literal,
            value: text.clone(),
            text,
            value_type: FieldValueType::String,
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Argument {
            kind: ArgumentKind::Field,
            text: name.into(),
            value_type: FieldValueType::String,
            value: String::new(),
        }
    }

    pub fn is_literal(&self) -> bool {
        self.kind == ArgumentKind::Literal
    }
}

/// A parsed call: `[output =] [namespace.]name(arguments)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// Add-on namespace; `None` for built-in functions.
    pub namespace: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    /// Name the result is bound to.
    pub output: String,
}

impl FunctionCall {
    pub fn is_builtin(&self) -> bool {
        self.namespace.is_none()
    }

    /// `Namespace.Name` or just `Name`.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} = {}(", self.output, self.qualified_name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match arg.kind {
                ArgumentKind::Literal => write!(f, "'{}'", arg.text.replace('\'', "\\'"))?,
                ArgumentKind::Field => write!(f, "{{{}}}", arg.text)?,
            }
        }
        f.write_str(")")
    }
}

/// Parse `expression` for the field called `field_name`.
///
/// `field_name` replaces `{@Name}` and is the output binding when the
/// expression does not name one.
pub fn parse_function_call(
    expression: &str,
    field_name: &str,
) -> Result<FunctionCall, FunctionParseError> {
    let expression = substitute_name_token(expression, field_name);
    let (masked, literals) = mask_literals(&expression)?;
    let masked = masked.trim();
    if masked.is_empty() {
        return Err(FunctionParseError::Empty);
    }

    let (output, call) = match split_output(masked) {
        Some((binding, call)) => (parse_output_binding(binding, &literals)?, call.trim()),
        None => (field_name.to_string(), masked),
    };

    let open = call
        .find('(')
        .ok_or(FunctionParseError::MissingArgumentList)?;
    let (namespace, name) = parse_function_name(call[..open].trim(), &literals)?;

    let close = matching_paren(call, open)?;
    let rest = call[close + 1..].trim();
    if !rest.is_empty() {
        return Err(FunctionParseError::TrailingInput {
            rest: unmask(rest, &literals),
        });
    }

    let arguments = parse_arguments(&call[open + 1..close], &literals)?;

    Ok(FunctionCall {
        namespace,
        name,
        arguments,
        output,
    })
}

/// Replace every `{@Name}` (case-insensitive) with `{field_name}`.
fn substitute_name_token(expression: &str, field_name: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut rest = expression;
    while let Some(start) = rest.find("{@") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if after[..end].eq_ignore_ascii_case(NAME_TOKEN) => {
                out.push('{');
                out.push_str(field_name);
                out.push('}');
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Replace quoted literals with indexed placeholders.
fn mask_literals(src: &str) -> Result<(String, Vec<String>), FunctionParseError> {
    let mut masked = String::with_capacity(src.len());
    let mut literals = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\'' {
            masked.push(c);
            continue;
        }
        let mut text = String::new();
        let mut closed = false;
        while let Some(lc) = chars.next() {
            match lc {
                '\\' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    text.push('\'');
                }
                '\'' => {
                    closed = true;
                    break;
                }
                other => text.push(other),
            }
        }
        if !closed {
            return Err(FunctionParseError::UnterminatedLiteral);
        }
        masked.push(LITERAL_OPEN);
        masked.push_str(&literals.len().to_string());
        masked.push(LITERAL_CLOSE);
        literals.push(text);
    }

    Ok((masked, literals))
}

/// Put literal text back into a masked fragment, for error messages.
fn unmask(fragment: &str, literals: &[String]) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;
    while let Some(start) = rest.find(LITERAL_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + LITERAL_OPEN.len_utf8()..];
        match after.find(LITERAL_CLOSE) {
            Some(end) => {
                let text = after[..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| literals.get(i))
                    .map(String::as_str)
                    .unwrap_or("");
                out.push('\'');
                out.push_str(text);
                out.push('\'');
                rest = &after[end + LITERAL_CLOSE.len_utf8()..];
            }
            None => {
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn literal_index(token: &str) -> Option<usize> {
    token
        .strip_prefix(LITERAL_OPEN)?
        .strip_suffix(LITERAL_CLOSE)?
        .parse()
        .ok()
}

fn has_marker(token: &str) -> bool {
    token.contains(LITERAL_OPEN) || token.contains(LITERAL_CLOSE)
}

/// Split at the first `=` outside parentheses.
fn split_output(masked: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (i, c) in masked.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '=' if depth == 0 => return Some((&masked[..i], &masked[i + 1..])),
            _ => {}
        }
    }
    None
}

fn parse_output_binding(binding: &str, literals: &[String]) -> Result<String, FunctionParseError> {
    let trimmed = binding.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed)
        .trim();
    if !is_identifier(inner) {
        return Err(FunctionParseError::InvalidOutputBinding {
            binding: unmask(trimmed, literals),
        });
    }
    Ok(inner.to_string())
}

fn parse_function_name(
    raw: &str,
    literals: &[String],
) -> Result<(Option<String>, String), FunctionParseError> {
    if raw.is_empty() {
        return Err(FunctionParseError::MissingFunctionName);
    }
    let invalid = || FunctionParseError::InvalidFunctionName {
        name: unmask(raw, literals),
    };
    match raw.split_once('.') {
        Some((ns, name)) => {
            let (ns, name) = (ns.trim(), name.trim());
            if !is_identifier(ns) || !is_identifier(name) {
                return Err(invalid());
            }
            Ok((Some(ns.to_string()), name.to_string()))
        }
        None if is_identifier(raw) => Ok((None, raw.to_string())),
        None => Err(invalid()),
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(call: &str, open: usize) -> Result<usize, FunctionParseError> {
    let mut depth = 0i32;
    for (i, c) in call[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + i);
                }
            }
            _ => {}
        }
    }
    Err(FunctionParseError::UnbalancedParentheses)
}

fn parse_arguments(inner: &str, literals: &[String]) -> Result<Vec<Argument>, FunctionParseError> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|raw| parse_argument(raw.trim(), literals))
        .collect()
}

fn parse_argument(token: &str, literals: &[String]) -> Result<Argument, FunctionParseError> {
    let malformed = || FunctionParseError::MalformedArgument {
        argument: unmask(token, literals),
    };
    if token.is_empty() || token.contains('(') || token.contains(')') {
        return Err(malformed());
    }
    if let Some(idx) = literal_index(token) {
        let text = literals.get(idx).ok_or_else(malformed)?;
        return Ok(Argument::literal(text.clone()));
    }
    if has_marker(token) {
        return Err(malformed());
    }
    let name = match token.strip_prefix('{') {
        Some(braced) => braced.strip_suffix('}').ok_or_else(malformed)?.trim(),
        None => token,
    };
    if name.is_empty() || name.contains(['{', '}']) {
        return Err(malformed());
    }
    Ok(Argument::field(name))
}
