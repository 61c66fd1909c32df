//! Generated-output discovery and project manifest rewriting.
//!
//! Scans the components output folder for previously generated files
//! (`<name>[-postfix].<ext>`, by default `*.generated.*`) and rewrites the
//! two project manifests that list them: the assembly resources file and the
//! project references file. This is filesystem glue around the compiler
//! core, which itself performs no I/O.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::builder::HierarchyBuilder;
use crate::dialects::{CSharpDialect, JavascriptDialect};
use crate::emit::Emitter;
use crate::error::DiscoveryError;

lazy_static! {
    /// Registration lines owned by this tool in the resources manifest.
    static ref RESOURCE_LINE_RE: Regex = Regex::new(r"WebResource\(Components\.\w+\.").unwrap();
}

/// Discovery settings. Deserializable so a project can keep them in a JSON
/// settings file next to the manifests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorSettings {
    pub components_folder: String,
    pub component_pattern: String,
    pub references_file: String,
    pub resources_file: String,
    pub postfixes: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        GeneratorSettings {
            components_folder: "components".to_string(),
            component_pattern: "*.generated.*".to_string(),
            references_file: "projectsettings.csproj".to_string(),
            resources_file: "properties/assemblyInfo.cs".to_string(),
            postfixes: vec!["-v3".to_string(), "-v4".to_string()],
        }
    }
}

/// One discovered generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOutput {
    /// Component id: the file stem with postfixes stripped.
    pub id: String,
    /// File stem as found on disk, postfix included.
    pub name: String,
    pub extension: String,
    /// Path relative to the working folder.
    pub path: String,
}

pub struct ComponentsGenerator {
    working_folder: PathBuf,
    settings: GeneratorSettings,
}

impl ComponentsGenerator {
    pub fn new(working_folder: impl Into<PathBuf>) -> Self {
        Self::with_settings(working_folder, GeneratorSettings::default())
    }

    pub fn with_settings(working_folder: impl Into<PathBuf>, settings: GeneratorSettings) -> Self {
        ComponentsGenerator {
            working_folder: working_folder.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Compiles markup to the JavaScript dialect.
    pub fn client_code(&self, name: &str, markup: &str) -> Result<String, DiscoveryError> {
        let mut builder = HierarchyBuilder::new(Emitter::new(Box::new(JavascriptDialect)));
        Ok(builder.build(markup, name)?)
    }

    /// Compiles markup to the C# dialect.
    pub fn server_code(&self, name: &str, markup: &str) -> Result<String, DiscoveryError> {
        let mut builder = HierarchyBuilder::new(Emitter::new(Box::new(CSharpDialect)));
        Ok(builder.build(markup, name)?)
    }

    /// Scans the components folder for generated outputs, sorted by path.
    /// A missing folder yields an empty list.
    pub fn component_outputs(&self) -> Result<Vec<ComponentOutput>, DiscoveryError> {
        let folder = self.working_folder.join(&self.settings.components_folder);
        if !folder.exists() {
            return Ok(Vec::new());
        }

        let pattern = self.pattern_regex()?;
        let mut outputs = Vec::new();

        for entry in WalkDir::new(&folder) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.path().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if let Some(caps) = pattern.captures(&file_name) {
                let name = caps[1].to_string();
                let extension = caps[2].to_string();
                let id = self
                    .settings
                    .postfixes
                    .iter()
                    .fold(name.clone(), |stem, postfix| stem.replace(postfix, ""));
                let path = entry
                    .path()
                    .strip_prefix(&self.working_folder)
                    .unwrap_or_else(|_| entry.path())
                    .display()
                    .to_string();
                outputs.push(ComponentOutput {
                    id,
                    name,
                    extension,
                    path,
                });
            }
        }

        outputs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(outputs)
    }

    /// Rewrites the assembly resources manifest: stale registration lines
    /// are dropped and one line per non-C# output is appended.
    pub fn update_project_resources(&self) -> Result<(), DiscoveryError> {
        let outputs = self.component_outputs()?;
        let path = self.working_folder.join(&self.settings.resources_file);
        let content = fs::read_to_string(&path)?;

        let mut rows: Vec<String> = content
            .lines()
            .filter(|row| !RESOURCE_LINE_RE.is_match(row) && !row.trim().is_empty())
            .map(str::to_string)
            .collect();

        rows.extend(
            outputs
                .iter()
                .filter(|output| output.extension != "cs")
                .map(|output| {
                    let mime = if output.extension == "js" { "Javascript" } else { "Css" };
                    format!(
                        "[assembly: WebResource(Components.{}.{}_{}ResourceName, \"text/{}\")]",
                        output.id,
                        output.name.replace('-', "_"),
                        mime,
                        mime.to_lowercase()
                    )
                }),
        );

        fs::write(&path, rows.join("\n"))?;
        Ok(())
    }

    /// Rewrites the project references manifest: stale generated-content
    /// entries are dropped and one entry per output is re-inserted before
    /// the closing project tag.
    pub fn update_project_references(&self) -> Result<(), DiscoveryError> {
        let outputs = self.component_outputs()?;
        let pattern = self.pattern_regex()?;
        let path = self.working_folder.join(&self.settings.references_file);
        let content = fs::read_to_string(&path)?;

        let mut rows: Vec<String> = content
            .lines()
            .filter(|row| !(row.contains("Include=") && pattern.is_match(row)))
            .map(str::to_string)
            .collect();

        let close = rows
            .iter()
            .position(|row| row.trim() == "</Project>")
            .unwrap_or(rows.len());
        for (offset, output) in outputs.iter().enumerate() {
            rows.insert(
                close + offset,
                format!("  <Content Include=\"{}\" />", output.path),
            );
        }

        fs::write(&path, rows.join("\n"))?;
        Ok(())
    }

    fn pattern_regex(&self) -> Result<Regex, DiscoveryError> {
        let source = self
            .settings
            .component_pattern
            .replace('.', r"\.")
            .replace('*', r"([\w-]+)");
        Regex::new(&source).map_err(|e| DiscoveryError::Pattern {
            pattern: self.settings.component_pattern.clone(),
            message: e.to_string(),
        })
    }
}

/// Loads generator settings from a JSON file, falling back to defaults for
/// absent fields.
pub fn load_settings(path: &Path) -> Result<GeneratorSettings, DiscoveryError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| DiscoveryError::Settings {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_outputs(dir: &Path) {
        let components = dir.join("components");
        fs::create_dir_all(&components).unwrap();
        fs::write(components.join("Grid-v3.generated.css"), "/* css */").unwrap();
        fs::write(components.join("Grid-v4.generated.css"), "/* css */").unwrap();
        fs::write(components.join("Grid.generated.js"), "// js").unwrap();
        fs::write(components.join("Grid.generated.cs"), "// cs").unwrap();
        fs::write(components.join("readme.txt"), "not generated").unwrap();
    }

    #[test]
    fn test_component_outputs() {
        let dir = tempfile::tempdir().unwrap();
        seed_outputs(dir.path());

        let generator = ComponentsGenerator::new(dir.path());
        let outputs = generator.component_outputs().unwrap();

        assert_eq!(outputs.len(), 4);
        assert!(outputs.iter().all(|o| o.id == "Grid"));
        assert_eq!(outputs[0].name, "Grid-v3");
        assert_eq!(outputs[0].extension, "css");
        assert_eq!(outputs[0].path, "components/Grid-v3.generated.css");
        assert_eq!(outputs[3].extension, "js");
    }

    #[test]
    fn test_missing_folder_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ComponentsGenerator::new(dir.path());
        assert!(generator.component_outputs().unwrap().is_empty());
    }

    #[test]
    fn test_update_project_resources() {
        let dir = tempfile::tempdir().unwrap();
        seed_outputs(dir.path());
        fs::create_dir_all(dir.path().join("properties")).unwrap();
        let resources = dir.path().join("properties/assemblyInfo.cs");
        fs::write(
            &resources,
            "using System.Web.UI;\n\n[assembly: WebResource(Components.Old.Old_CssResourceName, \"text/css\")]\n",
        )
        .unwrap();

        let generator = ComponentsGenerator::new(dir.path());
        generator.update_project_resources().unwrap();

        let content = fs::read_to_string(&resources).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(
            rows,
            vec![
                "using System.Web.UI;",
                "[assembly: WebResource(Components.Grid.Grid_v3_CssResourceName, \"text/css\")]",
                "[assembly: WebResource(Components.Grid.Grid_v4_CssResourceName, \"text/css\")]",
                "[assembly: WebResource(Components.Grid.Grid_JavascriptResourceName, \"text/javascript\")]",
            ]
        );
    }

    #[test]
    fn test_update_project_references() {
        let dir = tempfile::tempdir().unwrap();
        seed_outputs(dir.path());
        let csproj = dir.path().join("projectsettings.csproj");
        fs::write(
            &csproj,
            "<Project>\n  <Content Include=\"components/Old.generated.js\" />\n  <Compile Include=\"Program.cs\" />\n</Project>",
        )
        .unwrap();

        let generator = ComponentsGenerator::new(dir.path());
        generator.update_project_references().unwrap();

        let content = fs::read_to_string(&csproj).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(
            rows,
            vec![
                "<Project>",
                "  <Compile Include=\"Program.cs\" />",
                "  <Content Include=\"components/Grid-v3.generated.css\" />",
                "  <Content Include=\"components/Grid-v4.generated.css\" />",
                "  <Content Include=\"components/Grid.generated.cs\" />",
                "  <Content Include=\"components/Grid.generated.js\" />",
                "</Project>",
            ]
        );
    }

    #[test]
    fn test_settings_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generator.json");
        fs::write(&path, r#"{ "componentsFolder": "out", "postfixes": ["-dark"] }"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.components_folder, "out");
        assert_eq!(settings.postfixes, vec!["-dark".to_string()]);
        // Unspecified fields keep their defaults.
        assert_eq!(settings.component_pattern, "*.generated.*");
    }
}
