use serde::{Deserialize, Serialize};
use std::fmt;

/// All actions the filter editor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Action {
    // Navigation
    MoveUp,
    MoveDown,
    NextField,
    PrevField,

    // Clause editing
    AddFilter,
    RemoveFilter,
    NextChoice,
    PrevChoice,
    ToggleChoice,
    Confirm,
    Cancel,

    // Cell
    ToggleEditMode,
    ToggleExpanded,
    ToggleHaving,
    RefreshChoices,

    // Application
    ToggleHelp,
    Quit,
}

impl Action {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Action::MoveUp => "Select previous filter",
            Action::MoveDown => "Select next filter",
            Action::NextField => "Focus next field",
            Action::PrevField => "Focus previous field",
            Action::AddFilter => "Add filter",
            Action::RemoveFilter => "Remove selected filter",
            Action::NextChoice => "Next column/operator/value choice",
            Action::PrevChoice => "Previous column/operator/value choice",
            Action::ToggleChoice => "Toggle highlighted value",
            Action::Confirm => "Apply typed value",
            Action::Cancel => "Discard typed value",
            Action::ToggleEditMode => "Toggle edit mode",
            Action::ToggleExpanded => "Toggle slice description",
            Action::ToggleHaving => "Toggle having (metric) filters",
            Action::RefreshChoices => "Reload value choices",
            Action::ToggleHelp => "Toggle help",
            Action::Quit => "Quit",
        }
    }

    /// Get category for grouping in help screen
    pub fn category(&self) -> ActionCategory {
        match self {
            Action::MoveUp | Action::MoveDown | Action::NextField | Action::PrevField => {
                ActionCategory::Navigation
            }

            Action::AddFilter
            | Action::RemoveFilter
            | Action::NextChoice
            | Action::PrevChoice
            | Action::ToggleChoice
            | Action::Confirm
            | Action::Cancel => ActionCategory::Editing,

            Action::ToggleEditMode
            | Action::ToggleExpanded
            | Action::ToggleHaving
            | Action::RefreshChoices => ActionCategory::Cell,

            Action::ToggleHelp | Action::Quit => ActionCategory::Application,
        }
    }

    /// Get all possible actions (for validation)
    pub fn all() -> Vec<Action> {
        vec![
            Action::MoveUp,
            Action::MoveDown,
            Action::NextField,
            Action::PrevField,
            Action::AddFilter,
            Action::RemoveFilter,
            Action::NextChoice,
            Action::PrevChoice,
            Action::ToggleChoice,
            Action::Confirm,
            Action::Cancel,
            Action::ToggleEditMode,
            Action::ToggleExpanded,
            Action::ToggleHaving,
            Action::RefreshChoices,
            Action::ToggleHelp,
            Action::Quit,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    Navigation,
    Editing,
    Cell,
    Application,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCategory::Navigation => write!(f, "Navigation"),
            ActionCategory::Editing => write!(f, "Editing"),
            ActionCategory::Cell => write!(f, "Cell"),
            ActionCategory::Application => write!(f, "Application"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_actions_have_descriptions() {
        for action in Action::all() {
            assert!(!action.description().is_empty());
        }
    }

    #[test]
    fn test_editing_actions_are_grouped() {
        assert_eq!(Action::AddFilter.category(), ActionCategory::Editing);
        assert_eq!(Action::ToggleHaving.category(), ActionCategory::Cell);
        assert_eq!(ActionCategory::Editing.to_string(), "Editing");
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&Action::RemoveFilter).unwrap();
        assert_eq!(json, "\"RemoveFilter\"");

        let restored: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Action::RemoveFilter);
    }
}
