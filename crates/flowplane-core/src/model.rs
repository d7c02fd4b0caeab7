//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Template and workflow records exchanged with callers."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable, versioned manifest describing a runnable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Identifier shared by every version of the template.
    pub uid: String,
    /// Human readable name.
    pub name: String,
    /// Store-assigned version, starting at 1.
    pub version: i32,
    /// Opaque manifest body handed to the orchestration engine.
    pub manifest: String,
    /// Whether this is the newest version for `uid`.
    pub is_latest: bool,
    /// Whether the template has been archived.
    pub is_archived: bool,
    /// Creation time of this version.
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// Reference pointing at this exact version.
    pub fn reference(&self) -> TemplateRef {
        TemplateRef::new(self.uid.clone(), self.version)
    }

    /// Copy of the record with the manifest body cleared.
    ///
    /// Manifests can be arbitrarily large; responses that only need identity
    /// and version information carry this form.
    pub fn without_manifest(&self) -> Self {
        Self {
            manifest: String::new(),
            ..self.clone()
        }
    }

    pub fn manifest_bytes(&self) -> &[u8] {
        self.manifest.as_bytes()
    }
}

/// Input for creating the first version of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub manifest: String,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manifest: manifest.into(),
        }
    }
}

/// `(uid, version)` pair binding an instance to the template it was created from.
///
/// A version of `0` selects the latest version when used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub uid: String,
    pub version: i32,
}

impl TemplateRef {
    pub fn new(uid: impl Into<String>, version: i32) -> Self {
        Self {
            uid: uid.into(),
            version,
        }
    }

    /// Reference that resolves to whichever version is currently latest.
    pub fn latest(uid: impl Into<String>) -> Self {
        Self::new(uid, 0)
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.uid, self.version)
    }
}

/// Named input forwarded verbatim to the orchestration engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Execution phase reported by the orchestration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Terminated,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Succeeded | Phase::Failed | Phase::Error | Phase::Terminated
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
            Phase::Error => "Error",
            Phase::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Phase::Pending),
            "running" => Ok(Phase::Running),
            "succeeded" => Ok(Phase::Succeeded),
            "failed" => Ok(Phase::Failed),
            "error" => Ok(Phase::Error),
            "terminated" => Ok(Phase::Terminated),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// One execution created from a specific template version.
///
/// Which fields are populated depends on the operation: list results carry
/// only `name` and `uid`, watch snapshots carry status and the template
/// reference, `get` carries everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Engine status serialised as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<TemplateRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
}

impl Workflow {
    /// Whether the snapshot describes an instance that will never change again.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// One line of container output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            content: content.into(),
        }
    }
}

/// Named measurement a workflow step reported about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    /// Display hint such as `%` or `{:.2}`; opaque to the control plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template {
            uid: "tpl-1".into(),
            name: "train".into(),
            version: 3,
            manifest: "entrypoint: main".into(),
            is_latest: true,
            is_archived: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn without_manifest_keeps_identity() {
        let full = template();
        let trimmed = full.without_manifest();
        assert!(trimmed.manifest.is_empty());
        assert_eq!(trimmed.uid, full.uid);
        assert_eq!(trimmed.version, full.version);
        assert_eq!(trimmed.reference(), TemplateRef::new("tpl-1", 3));
    }

    #[test]
    fn terminal_phases() {
        assert!(!Phase::Pending.is_terminal());
        assert!(!Phase::Running.is_terminal());
        for phase in [
            Phase::Succeeded,
            Phase::Failed,
            Phase::Error,
            Phase::Terminated,
        ] {
            assert!(phase.is_terminal(), "{phase} should be terminal");
        }
    }

    #[test]
    fn phase_parses_case_insensitively() {
        assert_eq!("succeeded".parse::<Phase>(), Ok(Phase::Succeeded));
        assert_eq!(" Running ".parse::<Phase>(), Ok(Phase::Running));
        assert!("done".parse::<Phase>().is_err());
    }
}
