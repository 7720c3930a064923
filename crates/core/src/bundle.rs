//! Version bundles: the static descriptor of one engine generation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangelogKind {
    Added,
    Changed,
    Deprecated,
    Fixed,
    Removed,
    Security,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Changelog {
    pub component: String,
    pub description: String,
    pub kind: ChangelogKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub version: String,
}

/// Identifies which engine generation understands a given cluster spec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionBundle {
    pub name: String,
    pub version: String,
    pub components: Vec<Component>,
    pub changelogs: Vec<Changelog>,
}

impl VersionBundle {
    /// Exact string match, no normalization and no ranges.
    pub fn matches(&self, recorded_version: &str) -> bool {
        self.version == recorded_version
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_config("bundle name must not be empty"));
        }
        if !is_semver(&self.version) {
            return Err(Error::invalid_config(format!(
                "bundle {} version {:?} must be MAJOR.MINOR.PATCH",
                self.name, self.version
            )));
        }
        if self.components.is_empty() {
            return Err(Error::invalid_config(format!("bundle {} must list at least one component", self.name)));
        }
        for c in &self.components {
            if c.name.is_empty() || c.version.is_empty() {
                return Err(Error::invalid_config(format!("bundle {} has a component without name or version", self.name)));
            }
        }
        for cl in &self.changelogs {
            if cl.component.is_empty() || cl.description.is_empty() {
                return Err(Error::invalid_config(format!("bundle {} has an incomplete changelog entry", self.name)));
            }
        }
        Ok(())
    }
}

fn is_semver(v: &str) -> bool {
    let parts: Vec<&str> = v.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}
