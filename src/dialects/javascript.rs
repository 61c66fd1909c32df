//! JavaScript output dialect.
//!
//! Emits a layout-registration call against the Trellis client runtime.

use crate::emit::{Dialect, LineTemplates};

static TEMPLATES: LineTemplates = LineTemplates {
    begin_layout: r#"Trellis.Components.registerLayout("$0", function($1) {"#,
    end_layout: "});",
    push_element: r#"this.renderElement($0, "$1", $2, $3, function($4) {"#,
    pop_element: "});",
    render_literal: r#"this.renderLiteral($0, $1, "$2", [$3]);"#,
    render_content: "this.renderContent($0, $1, $2);",
    render_component: r#"this.renderComponent($0, $1, "$2", [$3]);"#,
    push_loop_scope: "this.iterate($0, $1, $2, function($3) {",
    pop_loop_scope: "});",
    update_property: r#"this.updateProperty($0, "$1", "$2", [$3]);"#,
    declare_viewmodel: r#"var viewModel = this.resolveViewModel("$0");"#,
};

pub struct JavascriptDialect;

impl Dialect for JavascriptDialect {
    fn tag(&self) -> &'static str {
        "js"
    }

    fn templates(&self) -> &'static LineTemplates {
        &TEMPLATES
    }

    fn default_component_name(&self) -> &'static str {
        "Component"
    }

    fn layout_indent(&self) -> usize {
        1
    }

    fn preamble(&self, _component_name: &str) -> Vec<(usize, String)> {
        vec![
            (0, "var Trellis;".to_string()),
            (0, "(function(Trellis) {".to_string()),
        ]
    }

    fn postamble(&self) -> Vec<(usize, String)> {
        vec![(0, "})(Trellis || (Trellis = {}));".to_string())]
    }
}
