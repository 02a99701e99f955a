//! Parser for the static descriptor carried by a tool artifact.
//!
//! ```text
//! /// Doubles a value.
//! fn double(value: int, *, scale: int = 2) -> int
//! ```
//!
//! Comment lines (`///` or `#`) before the declaration form the
//! docstring. The first `fn` line declares the primary callable and its
//! parameter schema; anything after it belongs to the loader.

use serde_json::Value;
use std::collections::HashSet;
use toolsmith_types::{LoadError, ParamKind, ParamSpec, ToolSignature};

/// What a descriptor declares.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Name of the primary callable.
    pub entrypoint: String,
    /// Declared parameters and return annotation.
    pub signature: ToolSignature,
    /// Docstring, if any.
    pub doc: Option<String>,
}

/// Parse the descriptor out of artifact source text.
pub fn parse(source: &str) -> Result<Descriptor, LoadError> {
    let mut doc_lines = Vec::new();
    for line in source.lines() {
        let line = line.trim();
        if let Some(decl) = declaration(line) {
            let (entrypoint, signature) = parse_declaration(decl)?;
            let doc = doc_lines.join("\n").trim().to_string();
            return Ok(Descriptor {
                entrypoint,
                signature,
                doc: (!doc.is_empty()).then_some(doc),
            });
        }
        if let Some(text) = comment_text(line) {
            doc_lines.push(text.trim_end());
        }
    }
    Err(LoadError::new(
        "no primary callable: expected a `fn name(...)` declaration",
    ))
}

fn declaration(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("pub ").map_or(line, str::trim_start);
    let rest = rest.strip_prefix("async ").map_or(rest, str::trim_start);
    rest.strip_prefix("fn ")
}

fn comment_text(line: &str) -> Option<&str> {
    let text = match line.strip_prefix("///") {
        Some(text) => text,
        None if line.starts_with("#!") || line.starts_with("#[") => return None,
        None => line.strip_prefix('#')?,
    };
    Some(text.strip_prefix(' ').unwrap_or(text))
}

fn parse_declaration(decl: &str) -> Result<(String, ToolSignature), LoadError> {
    let open = decl
        .find('(')
        .ok_or_else(|| LoadError::new("declaration has no parameter list"))?;
    let entrypoint = decl[..open].trim();
    check_ident(entrypoint, "callable")?;

    let after = &decl[open + 1..];
    let close = top_level(after)
        .into_iter()
        .find(|&(_, ch)| ch == ')')
        .map(|(i, _)| i)
        .ok_or_else(|| LoadError::new(format!("unclosed parameter list for {entrypoint}")))?;
    let params = parse_params(&after[..close])?;

    let tail = after[close + 1..]
        .trim()
        .trim_end_matches(['{', ':'])
        .trim_end();
    let returns = if tail.is_empty() {
        None
    } else {
        let annotation = tail
            .strip_prefix("->")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                LoadError::new(format!("unexpected text after parameters of {entrypoint}: {tail}"))
            })?;
        Some(annotation.to_string())
    };

    Ok((entrypoint.to_string(), ToolSignature { params, returns }))
}

fn parse_params(list: &str) -> Result<Vec<ParamSpec>, LoadError> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut pieces = split_top_level(list, ',');
    if pieces.len() > 1 && pieces.last().is_some_and(|p| p.trim().is_empty()) {
        pieces.pop();
    }

    let mut params: Vec<ParamSpec> = Vec::new();
    let mut seen = HashSet::new();
    let mut keyword_only = false;
    let mut saw_default = false;
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(LoadError::new("empty parameter in parameter list"));
        }
        if piece == "*" {
            if keyword_only {
                return Err(LoadError::new("`*` may appear only once"));
            }
            keyword_only = true;
            continue;
        }
        if piece.starts_with('*') {
            return Err(LoadError::new(format!(
                "variadic parameter {piece} is not supported"
            )));
        }

        let (head, default_text) = match find_top_level(piece, '=') {
            Some(i) => (&piece[..i], Some(piece[i + 1..].trim())),
            None => (piece, None),
        };
        let (name, annotation) = match head.split_once(':') {
            Some((name, annotation)) => (name.trim(), Some(annotation.trim())),
            None => (head.trim(), None),
        };
        check_ident(name, "parameter")?;
        if !seen.insert(name.to_string()) {
            return Err(LoadError::new(format!("duplicate parameter '{name}'")));
        }

        let mut param = ParamSpec::new(name);
        if let Some(annotation) = annotation {
            if annotation.is_empty() {
                return Err(LoadError::new(format!(
                    "empty annotation for parameter '{name}'"
                )));
            }
            param = param.annotated(annotation);
        }
        if let Some(text) = default_text {
            let default: Value = serde_json::from_str(text).map_err(|e| {
                LoadError::new(format!("invalid default for parameter '{name}': {e}"))
            })?;
            param = param.with_default(default);
        }

        if keyword_only {
            param = param.keyword();
        } else if param.default.is_some() {
            saw_default = true;
        } else if saw_default {
            return Err(LoadError::new(format!(
                "parameter '{name}' without a default follows a parameter with one"
            )));
        }
        params.push(param);
    }

    if keyword_only && !params.iter().any(|p| p.kind == ParamKind::Keyword) {
        return Err(LoadError::new("`*` must be followed by a named parameter"));
    }
    Ok(params)
}

fn check_ident(ident: &str, what: &str) -> Result<(), LoadError> {
    let mut chars = ident.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(LoadError::new(format!("invalid {what} name {ident:?}")))
    }
}

/// Positions of characters outside brackets and string literals. An
/// unmatched closing bracket is reported at top level.
fn top_level(text: &str) -> Vec<(usize, char)> {
    let mut positions = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => {
                if depth == 0 {
                    positions.push((i, ch));
                }
                depth += 1;
            }
            ')' | ']' | '}' if depth == 0 => positions.push((i, ch)),
            ')' | ']' | '}' => depth -= 1,
            _ if depth == 0 => positions.push((i, ch)),
            _ => {}
        }
    }
    positions
}

fn find_top_level(text: &str, target: char) -> Option<usize> {
    top_level(text)
        .into_iter()
        .find(|&(_, ch)| ch == target)
        .map(|(i, _)| i)
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, ch) in top_level(text) {
        if ch == sep {
            pieces.push(&text[start..i]);
            start = i + ch.len_utf8();
        }
    }
    pieces.push(&text[start..]);
    pieces
}
