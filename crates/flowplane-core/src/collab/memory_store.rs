//! ---
//! fp_section: "03-external-collaborators"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "In-memory template store used by tests and the CLI."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::collab::store::{StoreError, TemplateStore};
use crate::model::{NewTemplate, Template};

#[derive(Debug)]
struct TemplateEntry {
    archived: bool,
    versions: Vec<Template>,
}

impl TemplateEntry {
    fn latest(&self) -> Option<&Template> {
        self.versions.last()
    }
}

/// Namespace -> uid -> versions, uids kept in creation order.
type Namespaces = HashMap<String, IndexMap<String, TemplateEntry>>;

/// Template store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    inner: Mutex<Namespaces>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn create_template(
        &self,
        namespace: &str,
        template: NewTemplate,
    ) -> Result<Template, StoreError> {
        let name = template.name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("template name must not be empty".into()));
        }

        let mut inner = self.inner.lock();
        let entries = inner.entry(namespace.to_owned()).or_default();
        let duplicate = entries.values().any(|entry| {
            !entry.archived && entry.latest().map(|t| t.name.as_str()) == Some(name)
        });
        if duplicate {
            return Err(StoreError::Conflict(name.to_owned()));
        }

        let record = Template {
            uid: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            version: 1,
            manifest: template.manifest,
            is_latest: true,
            is_archived: false,
            created_at: Utc::now(),
        };
        entries.insert(
            record.uid.clone(),
            TemplateEntry {
                archived: false,
                versions: vec![record.clone()],
            },
        );
        debug!(namespace, template_uid = %record.uid, name = %record.name, "template created");
        Ok(record)
    }

    async fn create_template_version(
        &self,
        namespace: &str,
        uid: &str,
        manifest: String,
    ) -> Result<Option<Template>, StoreError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.get_mut(namespace).and_then(|e| e.get_mut(uid)) else {
            return Ok(None);
        };
        if entry.archived {
            return Err(StoreError::Archived(uid.to_owned()));
        }
        let Some(previous) = entry.versions.last_mut() else {
            return Err(StoreError::Backend(format!("template {uid} has no versions")));
        };
        previous.is_latest = false;
        let record = Template {
            uid: previous.uid.clone(),
            name: previous.name.clone(),
            version: previous.version + 1,
            manifest,
            is_latest: true,
            is_archived: false,
            created_at: Utc::now(),
        };
        entry.versions.push(record.clone());
        debug!(namespace, template_uid = %uid, version = record.version, "template version created");
        Ok(Some(record))
    }

    async fn get_template(
        &self,
        namespace: &str,
        uid: &str,
        version: i32,
    ) -> Result<Option<Template>, StoreError> {
        let inner = self.inner.lock();
        let Some(entry) = inner.get(namespace).and_then(|e| e.get(uid)) else {
            return Ok(None);
        };
        let found = if version <= 0 {
            entry.latest()
        } else {
            entry.versions.iter().find(|t| t.version == version)
        };
        Ok(found.cloned())
    }

    async fn list_versions(&self, namespace: &str, uid: &str) -> Result<Vec<Template>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .get(namespace)
            .and_then(|e| e.get(uid))
            .map(|entry| entry.versions.clone())
            .unwrap_or_default())
    }

    async fn list_templates(&self, namespace: &str) -> Result<Vec<Template>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .get(namespace)
            .map(|entries| {
                entries
                    .values()
                    .filter(|entry| !entry.archived)
                    .filter_map(|entry| entry.latest().cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn archive_template(
        &self,
        namespace: &str,
        uid: &str,
    ) -> Result<Option<bool>, StoreError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.get_mut(namespace).and_then(|e| e.get_mut(uid)) else {
            return Ok(None);
        };
        entry.archived = true;
        for version in &mut entry.versions {
            version.is_archived = true;
        }
        Ok(Some(entry.archived))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "default";

    #[tokio::test]
    async fn versions_increase_and_latest_moves() {
        let store = InMemoryTemplateStore::new();
        let first = store
            .create_template(NS, NewTemplate::new("train", "v1"))
            .await
            .unwrap();
        assert_eq!(first.version, 1);
        assert!(first.is_latest);

        let mut last_version = first.version;
        for body in ["v2", "v3", "v4"] {
            let next = store
                .create_template_version(NS, &first.uid, body.into())
                .await
                .unwrap()
                .expect("uid exists");
            assert!(next.version > last_version);
            last_version = next.version;

            let versions = store.list_versions(NS, &first.uid).await.unwrap();
            let latest: Vec<_> = versions.iter().filter(|t| t.is_latest).collect();
            assert_eq!(latest.len(), 1);
            assert_eq!(latest[0].version, next.version);
        }
        assert_eq!(last_version, 4);
    }

    #[tokio::test]
    async fn version_zero_resolves_latest() {
        let store = InMemoryTemplateStore::new();
        let first = store
            .create_template(NS, NewTemplate::new("etl", "a"))
            .await
            .unwrap();
        store
            .create_template_version(NS, &first.uid, "b".into())
            .await
            .unwrap();

        let latest = store.get_template(NS, &first.uid, 0).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.manifest, "b");
        let pinned = store.get_template(NS, &first.uid, 1).await.unwrap().unwrap();
        assert_eq!(pinned.manifest, "a");
        assert!(!pinned.is_latest);
        assert!(store.get_template(NS, &first.uid, 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_uid_is_absent_not_error() {
        let store = InMemoryTemplateStore::new();
        assert_eq!(store.get_template(NS, "nope", 1).await, Ok(None));
        assert_eq!(
            store.create_template_version(NS, "nope", "x".into()).await,
            Ok(None)
        );
        assert_eq!(store.archive_template(NS, "nope").await, Ok(None));
    }

    #[tokio::test]
    async fn duplicate_names_conflict_within_namespace() {
        let store = InMemoryTemplateStore::new();
        store
            .create_template(NS, NewTemplate::new("train", "a"))
            .await
            .unwrap();
        let err = store
            .create_template(NS, NewTemplate::new("train", "b"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Conflict("train".into()));
        store
            .create_template("other", NewTemplate::new("train", "b"))
            .await
            .expect("names are scoped to a namespace");
    }

    #[tokio::test]
    async fn archive_is_idempotent_and_hides_from_listing() {
        let store = InMemoryTemplateStore::new();
        let kept = store
            .create_template(NS, NewTemplate::new("kept", "a"))
            .await
            .unwrap();
        let gone = store
            .create_template(NS, NewTemplate::new("gone", "a"))
            .await
            .unwrap();

        assert_eq!(store.archive_template(NS, &gone.uid).await, Ok(Some(true)));
        assert_eq!(store.archive_template(NS, &gone.uid).await, Ok(Some(true)));

        let listed = store.list_templates(NS).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uid, kept.uid);

        let archived = store.get_template(NS, &gone.uid, 1).await.unwrap().unwrap();
        assert!(archived.is_archived);
        let err = store
            .create_template_version(NS, &gone.uid, "b".into())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Archived(gone.uid.clone()));
    }
}
