//! Code emitter state machine and the dialect protocol.
//!
//! A [`Dialect`] is a stateless set of line templates plus wrapping
//! boilerplate; the [`Emitter`] owns every piece of per-compilation mutable
//! state (output rows, indentation, the container counter, the loop-scope
//! stack and the pipeline registry) and formats one output line per
//! operation. The hierarchy builder drives the emitter exclusively through
//! these operations and never touches the buffer directly.
//!
//! Container naming invariant: pushing an element increments a single
//! counter and names the new nesting container `container{N}`; operations
//! executed inside that scope receive the previous counter value as their
//! parent reference. Popping decrements counter and indentation
//! symmetrically, so container names are unique and stable for a given AST
//! shape regardless of dialect.

use std::collections::HashMap;

use crate::error::CompileError;
use crate::resolve::{self, LoopQuery, ScopeEntry, TextTemplate};

/// Indentation unit: four columns per nesting level.
const INDENT_UNIT: &str = "    ";

/// The eleven line templates every dialect supplies. Placeholders are `$N`,
/// substituted positionally; arguments are inserted verbatim and never
/// rescanned for placeholders.
pub struct LineTemplates {
    pub begin_layout: &'static str,
    pub end_layout: &'static str,
    pub push_element: &'static str,
    pub pop_element: &'static str,
    pub render_literal: &'static str,
    pub render_content: &'static str,
    pub render_component: &'static str,
    pub push_loop_scope: &'static str,
    pub pop_loop_scope: &'static str,
    pub update_property: &'static str,
    pub declare_viewmodel: &'static str,
}

/// A code-generation target. Implementations are stateless template sets;
/// all mutable state lives on the [`Emitter`].
pub trait Dialect {
    /// Identifies which `pipeline` directive attribute this dialect reads.
    fn tag(&self) -> &'static str;

    fn templates(&self) -> &'static LineTemplates;

    /// Fallback component name for an empty one.
    fn default_component_name(&self) -> &'static str;

    /// Indentation level of the begin/end-layout lines; the layout body
    /// starts one level deeper.
    fn layout_indent(&self) -> usize;

    /// Wrapping lines written before the begin-layout line, as
    /// `(indent, line)` pairs.
    fn preamble(&self, component_name: &str) -> Vec<(usize, String)>;

    /// Wrapping lines written after the end-layout line.
    fn postamble(&self) -> Vec<(usize, String)>;
}

/// Substitutes `$N` placeholders in `template` with `args[N]` in a single
/// left-to-right pass. A placeholder without a matching argument becomes
/// empty.
pub(crate) fn fill_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('$') {
        let digits = rest[start + 1..]
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            out.push_str(&rest[..start + 1]);
            rest = &rest[start + 1..];
            continue;
        }
        out.push_str(&rest[..start]);
        let index: usize = rest[start + 1..start + 1 + digits].parse().unwrap_or(0);
        out.push_str(args.get(index).copied().unwrap_or(""));
        rest = &rest[start + 1 + digits..];
    }

    out.push_str(rest);
    out
}

/// Per-compilation code writer. One emitter serves exactly one compilation
/// at a time; `initialize` resets every piece of state for reuse.
pub struct Emitter {
    dialect: Box<dyn Dialect>,
    rows: Vec<String>,
    indent: usize,
    containers: usize,
    scopes: Vec<ScopeEntry>,
    pipelines: HashMap<String, String>,
}

impl Emitter {
    pub fn new(dialect: Box<dyn Dialect>) -> Self {
        Emitter {
            dialect,
            rows: Vec::new(),
            indent: 0,
            containers: 0,
            scopes: Vec::new(),
            pipelines: HashMap::new(),
        }
    }

    /// Resets all state and writes the dialect's opening boilerplate plus
    /// the begin-layout line for `component_name`.
    pub fn initialize(&mut self, component_name: &str) {
        self.rows.clear();
        self.indent = 0;
        self.containers = 0;
        self.scopes.clear();
        self.pipelines.clear();

        let name = if component_name.is_empty() {
            self.dialect.default_component_name()
        } else {
            component_name
        }
        .to_string();

        for (indent, line) in self.dialect.preamble(&name) {
            self.write_at(indent, line);
        }

        let layout_indent = self.dialect.layout_indent();
        let root = self.container(0);
        let line = fill_template(self.dialect.templates().begin_layout, &[&name, &root]);
        self.write_at(layout_indent, line);
        self.indent = layout_indent + 1;
    }

    /// Writes the end-layout line and closing boilerplate, then returns the
    /// assembled output. Call `initialize` before reusing the emitter.
    pub fn finish(&mut self) -> String {
        let layout_indent = self.dialect.layout_indent();
        let line = fill_template(self.dialect.templates().end_layout, &[]);
        self.write_at(layout_indent, line);
        for (indent, line) in self.dialect.postamble() {
            self.write_at(indent, line);
        }
        self.indent = 0;
        self.rows.join("\n")
    }

    pub fn backend_tag(&self) -> &'static str {
        self.dialect.tag()
    }

    /// Registers a pipeline snippet for `alias`. Aliases are write-once
    /// within a compilation: a second registration is ignored.
    pub fn register_pipeline(&mut self, alias: &str, snippet: &str) {
        self.pipelines
            .entry(alias.to_string())
            .or_insert_with(|| snippet.to_string());
    }

    pub fn declare_viewmodel(&mut self, type_name: &str) {
        let line = fill_template(self.dialect.templates().declare_viewmodel, &[type_name]);
        self.write(line);
    }

    /// Opens a nested container for `tag`. `visible` is an already-resolved
    /// accessor; `None` renders as the dialect's null literal.
    pub fn push_element(&mut self, tag: &str, index: usize, visible: Option<&str>) {
        self.containers += 1;
        let parent = self.container(-1);
        let own = self.container(0);
        let index = index.to_string();
        let visible = visible.unwrap_or("null");
        let line = fill_template(
            self.dialect.templates().push_element,
            &[&parent, tag, &index, visible, &own],
        );
        self.write(line);
        self.indent += 1;
    }

    pub fn pop_element(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.containers = self.containers.saturating_sub(1);
        let line = fill_template(self.dialect.templates().pop_element, &[]);
        self.write(line);
    }

    pub fn render_literal(&mut self, index: usize, text: &TextTemplate) {
        let container = self.container(0);
        let index = index.to_string();
        let expressions = text.expressions.join(", ");
        let line = fill_template(
            self.dialect.templates().render_literal,
            &[&container, &index, &text.format, &expressions],
        );
        self.write(line);
    }

    pub fn render_content(&mut self, index: usize, accessor: &str) {
        let container = self.container(0);
        let index = index.to_string();
        let line = fill_template(
            self.dialect.templates().render_content,
            &[&container, &index, accessor],
        );
        self.write(line);
    }

    pub fn render_component(&mut self, index: usize, type_name: &str, args: &[String]) {
        let container = self.container(0);
        let index = index.to_string();
        let args = args.join(", ");
        let line = fill_template(
            self.dialect.templates().render_component,
            &[&container, &index, type_name, &args],
        );
        self.write(line);
    }

    /// Opens a loop over `query.collection`, bringing `query.item_var` into
    /// scope for the subtree.
    pub fn push_loop_scope(&mut self, index: usize, query: &LoopQuery) {
        let container = self.container(0);
        let index = index.to_string();
        let line = fill_template(
            self.dialect.templates().push_loop_scope,
            &[&container, &index, &query.collection, &query.item_var],
        );
        self.write(line);
        self.scopes.push(ScopeEntry {
            item_var: query.item_var.clone(),
            item_type: query.item_type.clone(),
            collection: query.collection.clone(),
        });
        self.indent += 1;
    }

    pub fn pop_loop_scope(&mut self) {
        self.scopes.pop();
        self.indent = self.indent.saturating_sub(1);
        let line = fill_template(self.dialect.templates().pop_loop_scope, &[]);
        self.write(line);
    }

    pub fn update_property(&mut self, name: &str, text: &TextTemplate) {
        let container = self.container(0);
        let expressions = text.expressions.join(", ");
        let line = fill_template(
            self.dialect.templates().update_property,
            &[&container, name, &text.format, &expressions],
        );
        self.write(line);
    }

    /// Resolves an accessor path against the emitter's scope stack and
    /// pipeline registry.
    pub fn resolve_accessor(&self, path: &str, alias: Option<&str>) -> String {
        resolve::resolve_accessor(path, alias, &self.scopes, &self.pipelines)
    }

    pub fn parse_interpolations(&self, text: &str) -> TextTemplate {
        resolve::parse_interpolations(text, &self.scopes, &self.pipelines)
    }

    pub fn parse_loop_query(&self, query: &str) -> Result<LoopQuery, CompileError> {
        resolve::parse_loop_query(query, &self.scopes, &self.pipelines)
    }

    /// Number of loop scopes currently open.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Current indentation depth.
    pub fn indent_depth(&self) -> usize {
        self.indent
    }

    /// Emitted lines so far.
    pub fn lines(&self) -> &[String] {
        &self.rows
    }

    fn container(&self, offset: isize) -> String {
        format!("container{}", self.containers as isize + offset)
    }

    fn write(&mut self, line: String) {
        self.write_at(self.indent, line);
    }

    fn write_at(&mut self, indent: usize, line: String) {
        if line.is_empty() {
            self.rows.push(line);
        } else {
            self.rows.push(format!("{}{}", INDENT_UNIT.repeat(indent), line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template() {
        assert_eq!(fill_template("f($0, \"$1\");", &["a", "b"]), "f(a, \"b\");");
        assert_eq!(fill_template("no placeholders", &["a"]), "no placeholders");
        // Missing arguments become empty; arguments are never rescanned.
        assert_eq!(fill_template("f($0, $3);", &["a"]), "f(a, );");
        assert_eq!(fill_template("f($0);", &["$1"]), "f($1);");
        // A dollar sign without a digit is literal text.
        assert_eq!(fill_template("cost: $x $0", &["1"]), "cost: $x 1");
    }

    #[test]
    fn test_fill_template_multi_digit() {
        let args: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        assert_eq!(fill_template("$11|$1", &refs), "11|1");
    }

    fn emitter() -> Emitter {
        let mut emitter = Emitter::new(Box::new(crate::dialects::JavascriptDialect));
        emitter.initialize("X");
        emitter
    }

    #[test]
    fn test_scope_affects_resolution_until_popped() {
        let mut emitter = emitter();
        let query = emitter.parse_loop_query("T item1 in Items").unwrap();
        emitter.push_loop_scope(0, &query);

        assert_eq!(emitter.resolve_accessor("item1.Field2", None), "item1.Field2");
        assert_eq!(emitter.resolve_accessor("Field1", None), "viewModel.Field1");

        emitter.pop_loop_scope();
        assert_eq!(
            emitter.resolve_accessor("item1.Field2", None),
            "viewModel.item1.Field2"
        );
    }

    #[test]
    fn test_container_counter_symmetry() {
        let mut emitter = emitter();
        emitter.push_element("div", 0, None);
        emitter.push_element("span", 0, None);
        emitter.pop_element();
        emitter.pop_element();
        // A sibling after a closed subtree reuses the container number.
        emitter.push_element("p", 1, None);
        emitter.pop_element();

        let lines = emitter.lines().join("\n");
        assert!(lines.contains(r#"this.renderElement(container0, "div", 0, null, function(container1) {"#));
        assert!(lines.contains(r#"this.renderElement(container1, "span", 0, null, function(container2) {"#));
        assert!(lines.contains(r#"this.renderElement(container0, "p", 1, null, function(container1) {"#));
    }

    #[test]
    fn test_initialize_resets_state() {
        let mut emitter = emitter();
        emitter.register_pipeline("p", "wrap($0)");
        let query = emitter.parse_loop_query("T x in Items").unwrap();
        emitter.push_loop_scope(0, &query);

        emitter.initialize("Y");
        assert_eq!(emitter.scope_depth(), 0);
        assert_eq!(emitter.resolve_accessor("A", Some("p")), "viewModel.A");
        assert_eq!(emitter.resolve_accessor("x.B", None), "viewModel.x.B");
    }
}
