//! Recursive directive-dispatching tree walker.
//!
//! The builder owns a compilation from markup text to assembled output: it
//! initializes the emitter, parses the fragment and walks the nodes in
//! document order, dispatching namespaced directives and decorations and
//! driving scope push/pop. Scope pushes are matched by exactly one pop on
//! every path, including the paths where processing a descendant fails.

use crate::ast::{Attribute, Element, Node};
use crate::emit::Emitter;
use crate::error::CompileError;
use crate::parse::parse_fragment;

/// Namespace prefix under which directives and decorations are recognized.
pub const DEFAULT_DIRECTIVE_NAMESPACE: &str = "dx";

#[derive(Debug, Clone)]
pub struct BuilderOptions {
    pub directive_namespace: String,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        BuilderOptions {
            directive_namespace: DEFAULT_DIRECTIVE_NAMESPACE.to_string(),
        }
    }
}

/// A processed decoration attribute: the push-argument slots it overrides
/// and whether it registered a scope pop to run after the element closes.
/// Slots a decoration does not define stay untouched.
#[derive(Debug, Default)]
struct Decoration {
    index_override: Option<usize>,
    visible_override: Option<String>,
    pops_scope: bool,
}

pub struct HierarchyBuilder {
    emitter: Emitter,
    options: BuilderOptions,
}

impl HierarchyBuilder {
    pub fn new(emitter: Emitter) -> Self {
        Self::with_options(emitter, BuilderOptions::default())
    }

    pub fn with_options(emitter: Emitter, options: BuilderOptions) -> Self {
        HierarchyBuilder { emitter, options }
    }

    /// Compiles `markup` into the emitter's output dialect. Fails only on
    /// malformed markup or a malformed loop query; every other oddity is
    /// resolved with a lenient default.
    pub fn build(&mut self, markup: &str, component_name: &str) -> Result<String, CompileError> {
        self.emitter.initialize(component_name);
        let nodes = parse_fragment(markup)?;
        self.process_nodes(&nodes)?;
        Ok(self.emitter.finish())
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn process_nodes(&mut self, nodes: &[Node]) -> Result<(), CompileError> {
        for (index, node) in nodes.iter().enumerate() {
            self.process_node(node, index)?;
        }
        Ok(())
    }

    fn process_node(&mut self, node: &Node, index: usize) -> Result<(), CompileError> {
        match node {
            Node::Element(el) if el.namespace == self.options.directive_namespace => {
                self.process_directive(el, index)
            }
            Node::Element(el) => self.process_element(el, index),
            Node::Text(text) => {
                self.process_text(text, index);
                Ok(())
            }
        }
    }

    fn process_directive(&mut self, el: &Element, index: usize) -> Result<(), CompileError> {
        match el.local_name.as_str() {
            "viewmodel" => {
                self.emitter.declare_viewmodel(el.attribute("type"));
            }
            "content" => {
                let accessor = self.emitter.resolve_accessor(el.attribute("html"), None);
                self.emitter.render_content(index, &accessor);
            }
            "component" => {
                let args = self.resolve_component_args(el.attribute("args"));
                self.emitter
                    .render_component(index, el.attribute("type"), &args);
            }
            "foreach" => {
                let query = self.emitter.parse_loop_query(el.attribute("expression"))?;
                self.emitter.push_loop_scope(index, &query);
                let walked = self.process_nodes(&el.children);
                self.emitter.pop_loop_scope();
                walked?;
            }
            "pipeline" => {
                let snippet = el.attribute(self.emitter.backend_tag());
                self.emitter.register_pipeline(el.attribute("alias"), snippet);
            }
            other => {
                log::debug!(
                    "ignoring unrecognized directive <{}:{}>",
                    self.options.directive_namespace,
                    other
                );
            }
        }
        Ok(())
    }

    fn process_element(&mut self, el: &Element, index: usize) -> Result<(), CompileError> {
        let mut decorations = Vec::new();
        let mut failed = None;
        for attr in &el.attributes {
            if attr.namespace != self.options.directive_namespace {
                continue;
            }
            match self.process_decoration(attr, index) {
                Ok(decoration) => decorations.push(decoration),
                Err(e) => {
                    failed = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failed {
            // Scopes pushed by earlier decorations still get their pop.
            self.run_cleanups(&decorations);
            return Err(e);
        }

        // Fold the ordered decorations over the base push arguments; each
        // decoration only touches the slots it defines.
        let mut push_index = index;
        let mut visible = None;
        for decoration in &decorations {
            if let Some(i) = decoration.index_override {
                push_index = i;
            }
            if let Some(v) = &decoration.visible_override {
                visible = Some(v.clone());
            }
        }

        let visible = visible.map(|v| self.emitter.resolve_accessor(&v, None));
        self.emitter
            .push_element(&el.local_name, push_index, visible.as_deref());

        for attr in &el.attributes {
            if attr.namespace != self.options.directive_namespace {
                self.process_attribute(attr);
            }
        }

        let walked = self.process_nodes(&el.children);
        self.emitter.pop_element();
        self.run_cleanups(&decorations);
        walked
    }

    fn process_decoration(
        &mut self,
        attr: &Attribute,
        index: usize,
    ) -> Result<Decoration, CompileError> {
        match attr.local_name.as_str() {
            "for" => {
                let query = self.emitter.parse_loop_query(&attr.value)?;
                self.emitter.push_loop_scope(index, &query);
                Ok(Decoration {
                    // Inside the loop body the element is the sole root of
                    // each iteration.
                    index_override: Some(0),
                    visible_override: None,
                    pops_scope: true,
                })
            }
            "visible" => Ok(Decoration {
                index_override: None,
                visible_override: Some(attr.value.clone()),
                pops_scope: false,
            }),
            other => {
                log::debug!(
                    "ignoring unrecognized decoration {}:{}",
                    self.options.directive_namespace,
                    other
                );
                Ok(Decoration::default())
            }
        }
    }

    fn run_cleanups(&mut self, decorations: &[Decoration]) {
        for decoration in decorations {
            if decoration.pops_scope {
                self.emitter.pop_loop_scope();
            }
        }
    }

    fn process_attribute(&mut self, attr: &Attribute) {
        let text = self.emitter.parse_interpolations(&attr.value);
        // A value with no interpolation tokens binds nothing and emits
        // nothing.
        if !text.expressions.is_empty() {
            self.emitter.update_property(&attr.local_name, &text);
        }
    }

    fn process_text(&mut self, content: &str, index: usize) {
        let text = self.emitter.parse_interpolations(content);
        if !text.expressions.is_empty() {
            self.emitter.render_literal(index, &text);
        }
    }

    fn resolve_component_args(&self, args: &str) -> Vec<String> {
        args.split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| self.emitter.resolve_accessor(segment, None))
            .collect()
    }
}
