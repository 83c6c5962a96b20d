//! Read-only views of the session handed to the presentation layer.

use bananafit_core::{ImageAsset, InlineImage, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow operations that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ChoosePerson,
    UploadPerson,
    ChooseClothing,
    UploadClothing,
    GenerateClothing,
    GenerateResult,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChoosePerson => "choose_person",
            Self::UploadPerson => "upload_person",
            Self::ChooseClothing => "choose_clothing",
            Self::UploadClothing => "upload_clothing",
            Self::GenerateClothing => "generate_clothing",
            Self::GenerateResult => "generate_result",
        }
    }

    /// The message shown to the user when this operation fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::ChoosePerson | Self::UploadPerson => "Could not load that image, please try again.",
            Self::ChooseClothing | Self::UploadClothing => "Could not load that clothing image.",
            Self::GenerateClothing => "Clothing generation failed, please try again later.",
            Self::GenerateResult => "Try-on generation failed, please try again later.",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered failure surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub operation: Operation,
    pub message: String,
    /// The underlying error, for the curious.
    pub detail: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(operation: Operation, detail: impl std::fmt::Display) -> Self {
        Self {
            operation,
            message: operation.failure_message().to_string(),
            detail: detail.to_string(),
            raised_at: Utc::now(),
        }
    }
}

/// In-flight generation calls, one flag per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyFlags {
    pub generating_clothing: bool,
    pub generating_result: bool,
}

impl BusyFlags {
    pub fn any(&self) -> bool {
        self.generating_clothing || self.generating_result
    }
}

/// Everything the presentation layer needs to render the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub person: Option<InlineImage>,
    pub clothing: Option<InlineImage>,
    /// Id of the candidate the clothing slot came from. `None` for uploads.
    pub selected_clothing_id: Option<String>,
    pub result: Option<InlineImage>,
    pub candidates: Vec<ImageAsset>,
    pub busy: BusyFlags,
    pub notice: Option<Notice>,
    pub history_len: usize,
}

/// How a workflow operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation's effects were applied.
    Applied,
    /// The precondition was false (or became false while awaiting); nothing changed.
    Rejected,
    /// A collaborator failed; the notice was raised and effects rolled back.
    Failed(Notice),
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Failed(notice) => Some(notice),
            _ => None,
        }
    }

    /// Stable label used by the HTTP API.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}
