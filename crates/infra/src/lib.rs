//! Infrastructure layer: entity stores, workflows that orchestrate them, and
//! CSV and XLSX export.

pub mod export;
pub mod store;
pub mod workflows;

pub use export::{ExportError, ExportFormat, ExportRequest, Exporter, RenderedExport};
pub use store::{FiscalModuleStore, InMemoryStore, PostgresStore, StoreError, TerminalStore, UserStore};
pub use workflows::{
    FiscalModuleActivation, FiscalModuleRegistry, TerminalDirectory, TerminalMutation, TerminalProvisioning,
    UserAccounts, UserChanges, UserDraft, WorkflowError,
};
