//! Expression resolution against the active loop-scope stack.
//!
//! Accessor paths in templates are dotted identifier chains. A path whose
//! leading segment names a loop variable anywhere on the scope stack stays
//! relative to that variable; every other path is anchored at the view-model
//! root. Matching deliberately consults the whole stack, not just the
//! innermost entry — two nested loops reusing a variable name resolve the
//! same either way, and downstream templates rely on that.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::ast::normalize_text;
use crate::error::CompileError;

lazy_static! {
    /// `{{ path }}` or `{{ path | alias }}`, whitespace-tolerant.
    static ref INTERPOLATION_RE: Regex =
        Regex::new(r"\{\{\s*([\w.]+)\s*(?:\|\s*([\w.]+)\s*)?\}\}").unwrap();

    /// `<ItemType> <var> in <collection>`.
    static ref LOOP_QUERY_RE: Regex =
        Regex::new(r"^\s*([\w.]+)\s+(\w+)\s+in\s+([\w.]+)\s*$").unwrap();
}

/// Accessor prefix for paths not bound to a loop variable.
pub const VIEW_MODEL_ROOT: &str = "viewModel";

/// The placeholder a pipeline snippet substitutes the piped accessor into.
pub const PIPELINE_PLACEHOLDER: &str = "$0";

/// One live loop variable. Entries form a stack; an entry's lifetime spans
/// exactly the subtree of the construct that pushed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    pub item_var: String,
    pub item_type: String,
    /// Resolved accessor for the collection being iterated.
    pub collection: String,
}

/// Result of scanning a text value for interpolation tokens: the format
/// string with `$N` slot placeholders, and one resolved accessor per
/// distinct slot. An empty expression list means nothing to bind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextTemplate {
    pub format: String,
    pub expressions: Vec<String>,
}

/// A parsed `foreach`/`for` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopQuery {
    pub item_type: String,
    pub item_var: String,
    /// Resolved accessor for the collection, anchored at parse time against
    /// the scope stack as it was outside the loop.
    pub collection: String,
}

fn in_scope(path: &str, scopes: &[ScopeEntry]) -> bool {
    scopes.iter().any(|entry| {
        path == entry.item_var
            || (path.starts_with(&entry.item_var) && path[entry.item_var.len()..].starts_with('.'))
    })
}

/// Resolves a dotted path to an accessor expression. Paths led by a scope
/// variable stay unqualified; everything else is anchored at
/// [`VIEW_MODEL_ROOT`]. A registered pipeline alias wraps the accessor in
/// its snippet; an unregistered alias passes the accessor through unchanged.
pub fn resolve_accessor(
    path: &str,
    alias: Option<&str>,
    scopes: &[ScopeEntry],
    pipelines: &HashMap<String, String>,
) -> String {
    if path.is_empty() {
        return String::new();
    }

    let accessor = if in_scope(path, scopes) {
        path.to_string()
    } else {
        format!("{}.{}", VIEW_MODEL_ROOT, path)
    };

    match alias.and_then(|a| pipelines.get(a)) {
        Some(snippet) => snippet.replacen(PIPELINE_PLACEHOLDER, &accessor, 1),
        None => accessor,
    }
}

/// Scans `text` for `{{ … }}` tokens, resolving each expression to an
/// accessor and assigning it a positional slot. Slots are deduplicated by
/// resolved accessor string: a recurring expression reuses the slot of its
/// first occurrence. The format string is normalized the same way element
/// text is.
pub fn parse_interpolations(
    text: &str,
    scopes: &[ScopeEntry],
    pipelines: &HashMap<String, String>,
) -> TextTemplate {
    let mut expressions: Vec<String> = Vec::new();

    let format = INTERPOLATION_RE.replace_all(text, |caps: &Captures| {
        let alias = caps.get(2).map(|m| m.as_str());
        let accessor = resolve_accessor(&caps[1], alias, scopes, pipelines);
        let slot = match expressions.iter().position(|e| *e == accessor) {
            Some(slot) => slot,
            None => {
                expressions.push(accessor);
                expressions.len() - 1
            }
        };
        format!("${}", slot)
    });

    TextTemplate {
        format: normalize_text(&format),
        expressions,
    }
}

/// Parses `<ItemType> <var> in <collection>`, resolving the collection path
/// against the current scope stack.
pub fn parse_loop_query(
    query: &str,
    scopes: &[ScopeEntry],
    pipelines: &HashMap<String, String>,
) -> Result<LoopQuery, CompileError> {
    let caps = LOOP_QUERY_RE
        .captures(query)
        .ok_or_else(|| CompileError::MalformedQuery {
            query: query.to_string(),
        })?;

    Ok(LoopQuery {
        item_type: caps[1].to_string(),
        item_var: caps[2].to_string(),
        collection: resolve_accessor(&caps[3], None, scopes, pipelines),
    })
}
