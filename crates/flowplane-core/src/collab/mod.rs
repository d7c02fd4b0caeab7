//! ---
//! fp_section: "03-external-collaborators"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Contracts for the external collaborators and their in-memory implementations."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! The template store and the orchestration engine are external systems.
//! Only the capabilities the lifecycle manager needs are modelled here.

pub mod engine;
pub mod memory_engine;
pub mod memory_store;
pub mod store;

pub use engine::{
    EngineError, EngineStatus, EngineWorkflow, LabelSelector, Labels, ListOptions, LogOptions,
    LogSubscription, ObjectMeta, OrchestrationClient, WatchEvent, WatchEventKind, WatchSubscription, WorkflowOptions,
};
pub use memory_engine::InMemoryEngine;
pub use memory_store::InMemoryTemplateStore;
pub use store::{StoreError, TemplateStore};
