//! The project being built, as described by its `pom.xml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use roxmltree::Node;

pub const POM_FILE: &str = "pom.xml";

/// Read-only facts about the project under verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub name: String,
    pub base_dir: PathBuf,
    pub build_directory: PathBuf,
    pub final_name: String,
}

impl ProjectInfo {
    /// Read a pom. The project directory is the pom's directory, made absolute.
    pub fn load(pom_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(pom_path)
            .with_context(|| format!("failed to read {}", pom_path.display()))?;
        let pom_path = std::path::absolute(pom_path)
            .with_context(|| format!("failed to resolve {}", pom_path.display()))?;
        let base_dir = match pom_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::from_pom_str(&content, &base_dir)
            .with_context(|| format!("failed to parse {}", pom_path.display()))
    }

    pub fn from_pom_str(xml: &str, base_dir: &Path) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml).context("invalid XML")?;
        let root = doc.root_element();
        if root.tag_name().name() != "project" {
            bail!(
                "expected <project> root element, found <{}>",
                root.tag_name().name()
            );
        }

        let parent = child(root, "parent");
        let artifact_id =
            child_text(root, "artifactId").context("<artifactId> is required")?;
        let group_id = child_text(root, "groupId")
            .or_else(|| parent.and_then(|p| child_text(p, "groupId")))
            .context("<groupId> is required (directly or via <parent>)")?;
        let version = child_text(root, "version")
            .or_else(|| parent.and_then(|p| child_text(p, "version")))
            .context("<version> is required (directly or via <parent>)")?;

        let mut vars: BTreeMap<String, String> = child(root, "properties")
            .map(|props| {
                props
                    .children()
                    .filter(Node::is_element)
                    .filter_map(|n| {
                        n.text()
                            .map(|t| (n.tag_name().name().to_string(), t.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        vars.insert("basedir".to_string(), base_dir.display().to_string());
        vars.insert("project.basedir".to_string(), base_dir.display().to_string());

        // Properties first: `<version>${revision}</version>` is common.
        let group_id = interpolate(&group_id, &vars);
        let artifact_id = interpolate(&artifact_id, &vars);
        let version = interpolate(&version, &vars);
        vars.insert("project.groupId".to_string(), group_id.clone());
        vars.insert("project.artifactId".to_string(), artifact_id.clone());
        vars.insert("project.version".to_string(), version.clone());

        let packaging = child_text(root, "packaging").unwrap_or_else(|| "jar".to_string());
        let name = child_text(root, "name")
            .map(|n| interpolate(&n, &vars))
            .unwrap_or_else(|| artifact_id.clone());

        let build = child(root, "build");
        let build_directory = build
            .and_then(|b| child_text(b, "directory"))
            .map(|d| PathBuf::from(interpolate(&d, &vars)))
            .map(|d| if d.is_absolute() { d } else { base_dir.join(d) })
            .unwrap_or_else(|| base_dir.join("target"));
        vars.insert(
            "project.build.directory".to_string(),
            build_directory.display().to_string(),
        );
        let final_name = build
            .and_then(|b| child_text(b, "finalName"))
            .map(|n| interpolate(&n, &vars))
            .unwrap_or_else(|| format!("{artifact_id}-{version}"));

        Ok(Self {
            group_id,
            artifact_id,
            version,
            packaging,
            name,
            base_dir: base_dir.to_path_buf(),
            build_directory,
            final_name,
        })
    }

    /// The freshly built jar: `<build directory>/<finalName>.jar`.
    pub fn artifact_file(&self) -> PathBuf {
        self.build_directory.join(format!("{}.jar", self.final_name))
    }

    pub fn coordinate_string(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Replaces `${key}` references; unknown keys are left as written.
fn interpolate(value: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(v) => out.push_str(v),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
