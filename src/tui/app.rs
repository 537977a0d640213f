use crate::cell::{CellController, Unmeasured};
use crate::services::FetchCompletion;
use crate::tui::components::{FilterEditor, HelpOverlay};
use crate::tui::{Action, Component, KeyBindings, Theme};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// Application state
///
/// Routes key events to the filter editor and draws the cell around it.
pub struct App {
    editor: FilterEditor,

    /// Help overlay (when shown)
    help: Option<HelpOverlay>,

    keybindings: KeyBindings,
    theme: Theme,
    should_quit: bool,
}

impl App {
    pub fn new(
        cell: CellController,
        completions: UnboundedReceiver<FetchCompletion>,
        keybindings: KeyBindings,
    ) -> Self {
        Self {
            editor: FilterEditor::new(cell, completions),
            help: None,
            keybindings,
            theme: Theme::default(),
            should_quit: false,
        }
    }

    pub fn editor(&self) -> &FilterEditor {
        &self.editor
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_help_shown(&self) -> bool {
        self.help.is_some()
    }

    /// Per-tick bookkeeping: apply finished value lookups
    pub fn tick(&mut self) -> Result<()> {
        self.editor.update()
    }

    /// Handle a key event
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Only handle key press events, ignore release/repeat
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Typed characters go to the value buffer before any binding
        if self.help.is_none() && self.editor.accepts_text() {
            let plain = !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
            match key.code {
                KeyCode::Char(' ') if self.editor.input().is_empty() => {}
                KeyCode::Char(c) if plain => {
                    self.editor.insert_char(c);
                    return Ok(());
                }
                KeyCode::Backspace => {
                    self.editor.backspace();
                    return Ok(());
                }
                _ => {}
            }
        }

        if let Some(action) = self.keybindings.get_action(&key) {
            self.handle_action(action)?;
        }
        Ok(())
    }

    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        debug!(?action, "action");
        if let Some(help) = &mut self.help {
            if help.handle_action(action)? {
                self.help = None;
                return Ok(());
            }
        }

        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp => self.help = Some(HelpOverlay::new(&self.keybindings)),
            other => {
                self.editor.handle_action(other)?;
            }
        }
        Ok(())
    }

    /// Render the app
    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let cell = self.editor.cell();
        let description = cell
            .is_expanded()
            .then(|| cell.slice().description_markeddown.clone())
            .flatten();

        let description_height = if description.is_some() { 4 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(description_height),
                Constraint::Min(0),
            ])
            .split(area);

        self.render_header(frame, chunks[0]);
        if let Some(text) = description {
            let paragraph = Paragraph::new(text)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(self.theme.border_style(false)),
                );
            frame.render_widget(paragraph, chunks[1]);
        }
        self.editor.render(frame, chunks[2]);

        if let Some(help) = &mut self.help {
            help.render(frame, Self::centered_rect(70, 80, area));
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let cell = self.editor.cell();
        let geometry = cell.geometry(&Unmeasured);
        let mode = if cell.is_edit_mode() { "edit" } else { "view" };
        let line = Line::from(vec![
            Span::styled(cell.slice().slice_name.clone(), self.theme.header_style()),
            Span::styled(
                format!(
                    "  [{}] chart {}x{}  {mode}  ? help",
                    cell.chart_key(),
                    geometry.width,
                    geometry.height
                ),
                self.theme.muted_style(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Helper to create centered rectangle
    fn centered_rect(percent_w: u16, percent_h: u16, area: Rect) -> Rect {
        let width = (area.width * percent_w) / 100;
        let height = (area.height * percent_h) / 100;
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }
}
