//! The three workflow stages.

use serde::{Deserialize, Serialize};

/// The active step of the try-on workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Pick or upload a person photo (initial).
    #[default]
    SelectPerson,
    /// Pick, upload, or generate a garment.
    SelectClothing,
    /// Composite shown (or loading).
    Result,
}

impl Stage {
    /// One-based step number, as shown on the step cards.
    pub fn step_number(self) -> u8 {
        match self {
            Self::SelectPerson => 1,
            Self::SelectClothing => 2,
            Self::Result => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SelectPerson => "select_person",
            Self::SelectClothing => "select_clothing",
            Self::Result => "result",
        })
    }
}
