//! Built-in function surface.
//!
//! Functions are looked up by ASCII case-insensitive name and exact arity.
//! Every function receives its already-bound argument values as strings.

use pagemorph_connectors::FunctionValue;

type BuiltinFn = fn(&[&str]) -> FunctionValue;

/// One entry of the built-in table.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    call: BuiltinFn,
}

impl Builtin {
    const fn new(name: &'static str, arity: usize, call: BuiltinFn) -> Self {
        Builtin { name, arity, call }
    }

    /// Run the function. An argument count other than
    /// [`arity`](Self::arity) yields [`FunctionValue::Null`].
    pub fn call(&self, args: &[&str]) -> FunctionValue {
        if args.len() != self.arity {
            return FunctionValue::Null;
        }
        (self.call)(args)
    }
}

const BUILTINS: &[Builtin] = &[
    Builtin::new("Prefix", 3, prefix),
    Builtin::new("Suffix", 3, suffix),
    Builtin::new("Concatenate", 2, concatenate),
    Builtin::new("ConcatenateWithDelimiter", 3, concatenate_with_delimiter),
    Builtin::new("ConcatenateWithSemiColonDelimiter", 2, concatenate_semicolon),
    Builtin::new("ConcatenateWithPipeDelimiter", 2, concatenate_pipe),
    Builtin::new("StaticString", 1, static_string),
    Builtin::new("StaticBool", 1, to_boolean),
    Builtin::new("ToBoolean", 1, to_boolean),
    Builtin::new("HtmlEncode", 1, html_encode_fn),
    Builtin::new("HtmlEncodeForJson", 1, html_encode_for_json),
    Builtin::new("ReturnFileName", 1, return_file_name),
    Builtin::new("ReturnFolderPath", 1, return_folder_path),
    Builtin::new("TextCleanup", 1, text_cleanup),
    Builtin::new("ToUpper", 1, to_upper),
    Builtin::new("ToLower", 1, to_lower),
    Builtin::new("EmptyString", 0, empty_string),
    Builtin::new("RowCount", 1, row_count),
];

/// Find the built-in called `name` taking `arity` arguments.
pub fn lookup(name: &str, arity: usize) -> Option<&'static Builtin> {
    BUILTINS
        .iter()
        .find(|b| b.arity == arity && b.name.eq_ignore_ascii_case(name))
}

/// Names of all built-in functions, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

/// Boolean literal parsing shared by every function taking a flag.
pub fn parse_bool(value: &str) -> bool {
    let v = value.trim();
    ["true", "1", "yes", "on"]
        .iter()
        .any(|t| v.eq_ignore_ascii_case(t))
}

/// Escape the five HTML-significant characters.
pub fn html_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn text(s: impl Into<String>) -> FunctionValue {
    FunctionValue::Text(s.into())
}

fn prefix(args: &[&str]) -> FunctionValue {
    let (prefix, value, if_empty) = (args[0], args[1], args[2]);
    if value.is_empty() && !parse_bool(if_empty) {
        return text("");
    }
    text(format!("{}{}", prefix, value))
}

fn suffix(args: &[&str]) -> FunctionValue {
    let (suffix, value, if_empty) = (args[0], args[1], args[2]);
    if value.is_empty() && !parse_bool(if_empty) {
        return text("");
    }
    text(format!("{}{}", value, suffix))
}

fn concatenate(args: &[&str]) -> FunctionValue {
    text(args.concat())
}

fn join_non_empty(parts: &[&str], delimiter: &str) -> FunctionValue {
    text(
        parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(delimiter),
    )
}

fn concatenate_with_delimiter(args: &[&str]) -> FunctionValue {
    join_non_empty(&args[..2], args[2])
}

fn concatenate_semicolon(args: &[&str]) -> FunctionValue {
    join_non_empty(args, ";")
}

fn concatenate_pipe(args: &[&str]) -> FunctionValue {
    join_non_empty(args, "|")
}

fn static_string(args: &[&str]) -> FunctionValue {
    text(args[0])
}

fn to_boolean(args: &[&str]) -> FunctionValue {
    FunctionValue::Bool(parse_bool(args[0]))
}

fn html_encode_fn(args: &[&str]) -> FunctionValue {
    text(html_encode(args[0]))
}

fn html_encode_for_json(args: &[&str]) -> FunctionValue {
    let encoded = html_encode(args[0]);
    // Serialising a String cannot fail; fall back to the HTML form regardless.
    let quoted = serde_json::to_string(&encoded).unwrap_or_else(|_| format!("\"{}\"", encoded));
    text(&quoted[1..quoted.len() - 1])
}

fn return_file_name(args: &[&str]) -> FunctionValue {
    let path = args[0].trim_end_matches('/');
    text(path.rsplit('/').next().unwrap_or(path))
}

fn return_folder_path(args: &[&str]) -> FunctionValue {
    let path = args[0].trim_end_matches('/');
    match path.rfind('/') {
        Some(idx) => text(&path[..idx]),
        None => text(""),
    }
}

fn text_cleanup(args: &[&str]) -> FunctionValue {
    text(args[0].split_whitespace().collect::<Vec<_>>().join(" "))
}

fn to_upper(args: &[&str]) -> FunctionValue {
    text(args[0].to_uppercase())
}

fn to_lower(args: &[&str]) -> FunctionValue {
    text(args[0].to_lowercase())
}

fn empty_string(_args: &[&str]) -> FunctionValue {
    text("")
}

fn row_count(args: &[&str]) -> FunctionValue {
    let count = args[0].split(';').filter(|e| !e.trim().is_empty()).count();
    FunctionValue::Integer(count as i64)
}
