//! ---
//! fp_section: "03-external-collaborators"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Contract consumed from the versioned template store."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use async_trait::async_trait;
use thiserror::Error;

use crate::model::{NewTemplate, Template};

/// Failures reported by a template store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a template named '{0}' already exists")]
    Conflict(String),
    #[error("template {0} is archived")]
    Archived(String),
    #[error("invalid template record: {0}")]
    Invalid(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Persistence contract for immutable, versioned templates.
///
/// Lookups return `Ok(None)` for records that do not exist so callers can map
/// absence to a uniform not-found condition.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Persist version 1 of a new template.
    async fn create_template(
        &self,
        namespace: &str,
        template: NewTemplate,
    ) -> Result<Template, StoreError>;

    /// Append version N+1 for `uid` and make it the latest.
    async fn create_template_version(
        &self,
        namespace: &str,
        uid: &str,
        manifest: String,
    ) -> Result<Option<Template>, StoreError>;

    /// Fetch one version; `version <= 0` selects the latest.
    async fn get_template(
        &self,
        namespace: &str,
        uid: &str,
        version: i32,
    ) -> Result<Option<Template>, StoreError>;

    /// All versions of `uid` in ascending version order.
    async fn list_versions(&self, namespace: &str, uid: &str) -> Result<Vec<Template>, StoreError>;

    /// Latest version of every non-archived template, oldest template first.
    async fn list_templates(&self, namespace: &str) -> Result<Vec<Template>, StoreError>;

    /// Mark every version of `uid` archived and return the resulting flag.
    async fn archive_template(&self, namespace: &str, uid: &str)
        -> Result<Option<bool>, StoreError>;
}
