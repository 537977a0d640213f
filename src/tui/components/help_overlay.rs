//! Help overlay listing every action and the keys bound to it

use crate::tui::{Action, ActionCategory, Component, KeyBindings, Theme};
use color_eyre::Result;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

pub struct HelpOverlay {
    lines: Vec<(ActionCategory, String, &'static str)>,
}

impl HelpOverlay {
    pub fn new(keybindings: &KeyBindings) -> Self {
        let lines = Action::all()
            .into_iter()
            .map(|action| {
                let keys = keybindings.keys_for(action);
                let keys = if keys.is_empty() {
                    "unbound".to_string()
                } else {
                    keys.join(" / ")
                };
                (action.category(), keys, action.description())
            })
            .collect();
        Self { lines }
    }
}

impl Component for HelpOverlay {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        // Any key besides Quit closes the overlay
        Ok(action != Action::Quit)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let theme = Theme::default();
        frame.render_widget(Clear, area);

        let mut text = Vec::new();
        let mut category = None;
        for (cat, keys, description) in &self.lines {
            if category != Some(*cat) {
                if category.is_some() {
                    text.push(Line::raw(""));
                }
                text.push(Line::styled(cat.to_string(), theme.header_style()));
                category = Some(*cat);
            }
            text.push(Line::from(vec![
                Span::styled(format!("  {keys:<18}"), theme.chosen_style()),
                Span::raw(*description),
            ]));
        }

        let paragraph = Paragraph::new(text).block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(theme.border_style(true)),
        );
        frame.render_widget(paragraph, area);
    }

    fn supported_actions(&self) -> &[Action] {
        &[Action::ToggleHelp, Action::Cancel]
    }

    fn name(&self) -> &str {
        "HelpOverlay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_bound_keys_per_action() {
        let help = HelpOverlay::new(&KeyBindings::default());
        let (category, keys, _) = help
            .lines
            .iter()
            .find(|(_, _, d)| *d == Action::RefreshChoices.description())
            .unwrap();
        assert_eq!(*category, ActionCategory::Cell);
        assert_eq!(keys, "Ctrl+r");
    }

    #[test]
    fn quit_passes_through() {
        let mut help = HelpOverlay::new(&KeyBindings::default());
        assert!(help.handle_action(Action::Cancel).unwrap());
        assert!(!help.handle_action(Action::Quit).unwrap());
    }
}
