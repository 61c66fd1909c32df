//! # Trellis Component Compiler
//!
//! Compiles Trellis component markup into source code that builds the
//! component's render tree at runtime, for one or more output dialects.
//!
//! ## Pipeline
//!
//! 1. **Parse** (`parse`): the markup fragment is wrapped in a synthetic
//!    root, handed to the external XML parser and normalized into the
//!    two-variant [`Node`] AST. Malformed markup aborts the compilation.
//! 2. **Walk** (`builder`): the hierarchy builder visits nodes in document
//!    order, dispatching `dx:`-namespaced directives (`viewmodel`,
//!    `content`, `component`, `foreach`, `pipeline`) and element
//!    decorations (`for`, `visible`), and driving the emitter.
//! 3. **Resolve** (`resolve`): accessor paths are qualified against the
//!    loop-scope stack, `{{ … }}` interpolations become positional slots,
//!    pipeline aliases wrap accessors in dialect-specific snippets.
//! 4. **Emit** (`emit`, `dialects`): a fixed protocol of eleven line-template
//!    operations, implemented per dialect, assembles the output.
//!
//! ## Invariants
//!
//! - Scope pushes and pops are symmetric on every path, including failed
//!   subtrees; after `build` returns, scope and indentation depth are back
//!   at their pre-call values.
//! - Container names `container{N}` are unique and stable for a given AST
//!   shape regardless of dialect.
//! - Compilation is a pure function of its input: identical markup and
//!   component name yield byte-identical output for a given dialect.
//!
//! The `discovery` module is filesystem glue around the core: it finds
//! previously generated outputs and rewrites the project manifests that
//! list them.

mod ast;
mod builder;
mod dialects;
mod discovery;
mod emit;
mod error;
mod parse;
mod resolve;

pub use ast::{normalize_text, split_qualified, Attribute, Element, Node};
pub use builder::{BuilderOptions, HierarchyBuilder, DEFAULT_DIRECTIVE_NAMESPACE};
pub use dialects::{CSharpDialect, JavascriptDialect};
pub use discovery::{load_settings, ComponentOutput, ComponentsGenerator, GeneratorSettings};
pub use emit::{Dialect, Emitter, LineTemplates};
pub use error::{CompileError, DiscoveryError};
pub use parse::parse_fragment;
pub use resolve::{
    parse_interpolations, parse_loop_query, resolve_accessor, LoopQuery, ScopeEntry, TextTemplate,
    PIPELINE_PLACEHOLDER, VIEW_MODEL_ROOT,
};
