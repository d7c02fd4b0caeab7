//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "crate-root"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Workflow lifecycle and template versioning core."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! Binds workflow instances running on an external orchestration engine to
//! immutable, versioned templates kept in an external store, bridges engine
//! watch events into terminating snapshot streams, follows container logs, and
//! paginates listings.

pub mod collab;
pub mod error;
pub mod labels;
pub mod logs;
pub mod manager;
pub mod model;
pub mod paging;
pub mod watch;

pub use error::{ErrorCode, ManagerError, Result};
pub use labels::CorrelationLabels;
pub use logs::LogStream;
pub use manager::WorkflowManager;
pub use model::{
    LogEntry, Metric, NewTemplate, Parameter, Phase, Template, TemplateRef, Workflow,
};
pub use paging::{paginate, paginate_with, Page, PageDefaults, PageRequest};
pub use watch::{BridgeStream, WatchSettings, WorkflowWatch};
