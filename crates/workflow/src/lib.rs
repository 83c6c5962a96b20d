//! Try-on workflow for BananaFit.
//!
//! [`WorkflowCoordinator`] walks a session through three stages:
//!
//! ```text
//! SelectPerson ──choose/upload person──▶ SelectClothing ──generate result──▶ Result
//!      ▲                                                                       │
//!      └────────────────────────────────── reset ──────────────────────────────┘
//! ```
//!
//! Collaborator failures never escape an operation: they become a [`Notice`]
//! and an [`OperationOutcome::Failed`], with the session rolled back.

pub mod candidates;
pub mod coordinator;
pub mod history;
pub mod snapshot;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use candidates::ClothingCandidates;
pub use coordinator::WorkflowCoordinator;
pub use history::{HistoryEntry, HistoryLog};
pub use snapshot::{BusyFlags, Notice, Operation, OperationOutcome, WorkflowSnapshot};
