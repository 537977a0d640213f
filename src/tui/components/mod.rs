pub mod filter_editor;
pub mod help_overlay;

pub use filter_editor::{EditorField, FilterEditor, StatusMessage};
pub use help_overlay::HelpOverlay;
