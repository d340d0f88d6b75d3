// ABOUTME: Dependency inference from a task's declared parameter list
// ABOUTME: Parses function, closure and arrow interface text into ordered dependency names

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static STRIP_COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(//.*$)|(/\*[\s\S]*?\*/)").unwrap());

// `fn name(`, `async fn name<T>(`, `function name(`, `function (`
static FN_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:fn|function)\b\s*\w*\s*(?:<[^(]*>)?\s*\(")
        .unwrap()
});

// Method shorthand: `name(`, closed by `) {` or `) -> T {`
static METHOD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:async\s+)?\w+\s*\(").unwrap());
static METHOD_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:->[^{]*)?\{").unwrap());

// `|a, b| ...`, `move |a| ...`, `async move |a| ...`
static CLOSURE_ARGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?(?:move\s+)?\|([^|]*)\|").unwrap());

// `(a, b) => ...`, `async (a) => ...`
static ARROW_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:async\s+)?\(").unwrap());
static ARROW_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*=>").unwrap());

// `a => ...`, `async a => ...`
static ARROW_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?([A-Za-z_$][\w$]*)\s*=>").unwrap());

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap());

/// How a task signals completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceStyle {
    /// The task returns a future; every parameter is a dependency.
    #[default]
    Async,
    /// The trailing parameter is a continuation and never a dependency.
    Callback,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("no parameter list found in `{source_text}`")]
    NoParameterList { source_text: String },

    #[error("invalid parameter `{parameter}` in `{source_text}`")]
    InvalidParameter {
        parameter: String,
        source_text: String,
    },

    #[error("callback-style interface `{source_text}` declares no continuation parameter")]
    MissingContinuation { source_text: String },
}

/// Infer the ordered dependency names declared by a task interface.
pub fn parse_dependencies(
    interface: &str,
    style: InterfaceStyle,
) -> Result<Vec<String>, SignatureError> {
    let mut params = parse_parameters(interface)?;

    if style == InterfaceStyle::Callback && params.pop().is_none() {
        return Err(SignatureError::MissingContinuation {
            source_text: interface.trim().to_string(),
        });
    }

    Ok(params)
}

/// Extract the cleaned parameter names of an interface, in declaration order.
pub fn parse_parameters(interface: &str) -> Result<Vec<String>, SignatureError> {
    let stripped = STRIP_COMMENTS.replace_all(interface, "");
    let source = stripped.trim();

    let raw = extract_parameter_text(source).ok_or_else(|| SignatureError::NoParameterList {
        source_text: source.to_string(),
    })?;

    let mut params = Vec::new();
    for token in split_top_level(raw) {
        let name = clean_parameter(token);
        if name.is_empty() {
            continue;
        }
        if !IDENTIFIER.is_match(&name) {
            return Err(SignatureError::InvalidParameter {
                parameter: name,
                source_text: source.to_string(),
            });
        }
        params.push(name);
    }

    Ok(params)
}

fn extract_parameter_text(source: &str) -> Option<&str> {
    if let Some(open) = FN_OPEN.find(source) {
        return balanced_list(source, open.end()).map(|(params, _)| params);
    }

    if let Some(open) = METHOD_OPEN.find(source) {
        if let Some((params, rest)) = balanced_list(source, open.end()) {
            if METHOD_BODY.is_match(rest) {
                return Some(params);
            }
        }
    }

    if let Some(captures) = CLOSURE_ARGS.captures(source) {
        return captures.get(1).map(|m| m.as_str());
    }

    if let Some(open) = ARROW_OPEN.find(source) {
        if let Some((params, rest)) = balanced_list(source, open.end()) {
            if ARROW_BODY.is_match(rest) {
                return Some(params);
            }
        }
    }

    ARROW_SINGLE
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Text between an opening paren ending at `start` and its matching close,
/// plus whatever follows the close. `None` when the parens never balance.
fn balanced_list(source: &str, start: usize) -> Option<(&str, &str)> {
    let mut depth = 0usize;

    for (offset, ch) in source[start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => {
                let end = start + offset;
                return Some((&source[start..end], &source[end + 1..]));
            }
            ')' => depth -= 1,
            _ => {}
        }
    }

    None
}

/// Split on commas that are not nested inside brackets, so `HashMap<K, V>` stays whole.
fn split_top_level(raw: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in raw.char_indices() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    tokens.push(&raw[start..]);

    tokens
}

fn clean_parameter(token: &str) -> String {
    let without_default = token.split('=').next().unwrap_or_default();
    let without_type = without_default.split(':').next().unwrap_or_default();

    let binding = without_type.trim();
    let binding = binding
        .strip_prefix("mut")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .unwrap_or(binding);

    binding.chars().filter(|c| !c.is_whitespace()).collect()
}
