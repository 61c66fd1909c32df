//! C# output dialect.
//!
//! Emits a partial `ComponentBase` subclass whose `CreateLayout` override
//! builds the render tree server-side. The preamble also declares the
//! generated css/js resource names for the component so the assembly can
//! register them.

use crate::emit::{Dialect, LineTemplates};

static TEMPLATES: LineTemplates = LineTemplates {
    begin_layout: "public override void CreateLayout(LayoutControl $1) {",
    end_layout: "}",
    push_element: r#"CreateElement($0, "$1", $2, $3, ($4) => {"#,
    pop_element: "});",
    render_literal: r#"CreateLiteral($0, $1, "$2", [$3]);"#,
    render_content: "CreateContent($0, $1, $2);",
    render_component: "CreateComponent($0, $1, $2, [$3]);",
    push_loop_scope: "Iterate($0, $1, $2, ($3) => {",
    pop_loop_scope: "});",
    update_property: r#"UpdateProperty($0, "$1", "$2", [$3]);"#,
    declare_viewmodel: "var viewModel = ResolveViewModel<$0>();",
};

pub struct CSharpDialect;

impl Dialect for CSharpDialect {
    fn tag(&self) -> &'static str {
        "cs"
    }

    fn templates(&self) -> &'static LineTemplates {
        &TEMPLATES
    }

    fn default_component_name(&self) -> &'static str {
        "NewComponent"
    }

    fn layout_indent(&self) -> usize {
        2
    }

    fn preamble(&self, component_name: &str) -> Vec<(usize, String)> {
        vec![
            (0, "using Trellis.Web.Components.Core;".to_string()),
            (0, String::new()),
            (0, "namespace Trellis.Web.Components {".to_string()),
            (
                1,
                format!("public partial class {}: ComponentBase {{", component_name),
            ),
            (2, "public const string".to_string()),
            (
                3,
                format!(
                    "{0}CssResourceName = GeneratedFolder + \"{0}.generated.css\",",
                    component_name
                ),
            ),
            (
                3,
                format!(
                    "{0}ScriptResourceName = GeneratedFolder + \"{0}.generated.js\";",
                    component_name
                ),
            ),
            (
                2,
                format!(
                    "public override string GetCssResourceName() {{ return {}CssResourceName; }}",
                    component_name
                ),
            ),
            (
                2,
                format!(
                    "public override string GetScriptResourceName() {{ return {}ScriptResourceName; }}",
                    component_name
                ),
            ),
            (2, String::new()),
        ]
    }

    fn postamble(&self) -> Vec<(usize, String)> {
        vec![(1, "}".to_string()), (0, "}".to_string())]
    }
}
