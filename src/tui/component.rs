use crate::tui::action::Action;
use color_eyre::Result;
use ratatui::{layout::Rect, Frame};

/// Base trait for terminal components
///
/// A component consumes editor actions, draws itself into the area it is
/// given, and may do background bookkeeping on every tick.
pub trait Component {
    /// Handle an action
    ///
    /// Returns Ok(true) if the action was consumed, Ok(false) if it should
    /// propagate to the caller.
    fn handle_action(&mut self, action: Action) -> Result<bool>;

    /// Render the component within `area`
    fn render(&mut self, frame: &mut Frame, area: Rect);

    /// Actions this component reacts to, used for the help overlay
    fn supported_actions(&self) -> &[Action];

    /// Component name for logging
    fn name(&self) -> &str;

    /// Called once per tick of the event loop
    fn update(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: usize,
        actions: Vec<Action>,
    }

    impl Component for Counter {
        fn handle_action(&mut self, action: Action) -> Result<bool> {
            Ok(self.supported_actions().contains(&action))
        }

        fn render(&mut self, _frame: &mut Frame, _area: Rect) {}

        fn supported_actions(&self) -> &[Action] {
            &self.actions
        }

        fn name(&self) -> &str {
            "Counter"
        }

        fn update(&mut self) -> Result<()> {
            self.ticks += 1;
            Ok(())
        }
    }

    #[test]
    fn test_unsupported_actions_propagate() {
        let mut comp = Counter {
            ticks: 0,
            actions: vec![Action::AddFilter],
        };
        assert!(comp.handle_action(Action::AddFilter).unwrap());
        assert!(!comp.handle_action(Action::Quit).unwrap());
    }

    #[test]
    fn test_update_runs_per_tick() {
        let mut comp = Counter {
            ticks: 0,
            actions: vec![],
        };
        comp.update().unwrap();
        comp.update().unwrap();
        assert_eq!(comp.ticks, 2);
        assert_eq!(comp.name(), "Counter");
    }
}
