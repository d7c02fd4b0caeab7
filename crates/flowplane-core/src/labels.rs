//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Template identity carried on instances through metadata labels."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! The orchestration engine has no typed field for an application-level
//! template reference, so the `(uid, version)` pair travels as two labels.
//! Readers must cope with instances created by other tooling, which may
//! carry neither label or a garbled version.

use flowplane_common::config::LabelConfig;

use crate::collab::Labels;
use crate::error::{ManagerError, Result};
use crate::model::TemplateRef;

pub const TEMPLATE_UID_SUFFIX: &str = "workflow-template-uid";
pub const TEMPLATE_VERSION_SUFFIX: &str = "workflow-template-version";

/// Fully qualified correlation label keys for one label prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationLabels {
    uid_key: String,
    version_key: String,
}

impl Default for CorrelationLabels {
    fn default() -> Self {
        Self::new("")
    }
}

impl CorrelationLabels {
    pub fn new(prefix: &str) -> Self {
        Self {
            uid_key: format!("{}{}", prefix, TEMPLATE_UID_SUFFIX),
            version_key: format!("{}{}", prefix, TEMPLATE_VERSION_SUFFIX),
        }
    }

    pub fn from_config(config: &LabelConfig) -> Self {
        Self::new(&config.key_prefix)
    }

    pub fn uid_key(&self) -> &str {
        &self.uid_key
    }

    pub fn version_key(&self) -> &str {
        &self.version_key
    }

    /// Write the template reference into `labels`, replacing earlier values.
    pub fn stamp(&self, labels: &mut Labels, template_uid: &str, template_version: i32) {
        labels.insert(self.uid_key.clone(), template_uid.to_owned());
        labels.insert(self.version_key.clone(), template_version.to_string());
    }

    /// Read the template reference back.
    pub fn resolve(&self, labels: &Labels) -> Result<TemplateRef> {
        let uid = labels
            .get(&self.uid_key)
            .map(|uid| uid.trim())
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| ManagerError::invalid_argument("Missing workflow template uid."))?;
        let version = labels
            .get(&self.version_key)
            .and_then(|raw| raw.parse::<i32>().ok())
            .filter(|version| *version >= 1)
            .ok_or_else(|| ManagerError::invalid_argument("Invalid version number."))?;
        Ok(TemplateRef::new(uid, version))
    }

    /// Equality selector narrowing a listing to one template, optionally one version.
    ///
    /// The uid is spliced into selector syntax, so anything that is not a
    /// plain label value is rejected rather than allowed to add terms.
    pub fn selector(&self, template_uid: &str, template_version: Option<i32>) -> Result<String> {
        if !is_label_value(template_uid) {
            return Err(ManagerError::invalid_argument(
                "Invalid workflow template uid.",
            ));
        }
        Ok(match template_version {
            Some(version) => format!(
                "{}={},{}={}",
                self.uid_key, template_uid, self.version_key, version
            ),
            None => format!("{}={}", self.uid_key, template_uid),
        })
    }
}

fn is_label_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
