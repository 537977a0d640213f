use ratatui::style::{Color, Modifier, Style};

/// Colour scheme for the filter editor
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub border_focused: Color,

    pub header_fg: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    /// Field with keyboard focus inside the selected row
    pub focus_fg: Color,
    pub focus_bg: Color,

    pub chosen: Color,
    pub loading: Color,
    pub error: Color,
    pub info: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "Dark".to_string(),
            foreground: Color::Gray,
            muted: Color::DarkGray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            header_fg: Color::Cyan,
            selected_fg: Color::White,
            selected_bg: Color::Rgb(30, 40, 60),
            focus_fg: Color::Black,
            focus_bg: Color::Yellow,
            chosen: Color::Green,
            loading: Color::Yellow,
            error: Color::Red,
            info: Color::Blue,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            foreground: Color::Black,
            muted: Color::Gray,
            border: Color::Gray,
            border_focused: Color::Blue,
            header_fg: Color::Blue,
            selected_fg: Color::Black,
            selected_bg: Color::Rgb(220, 230, 245),
            focus_fg: Color::White,
            focus_bg: Color::Blue,
            chosen: Color::Rgb(0, 120, 0),
            loading: Color::Rgb(200, 150, 0),
            error: Color::Red,
            info: Color::Blue,
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn selected_row_style(&self) -> Style {
        Style::default().fg(self.selected_fg).bg(self.selected_bg)
    }

    pub fn focused_field_style(&self) -> Style {
        Style::default()
            .fg(self.focus_fg)
            .bg(self.focus_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    pub fn chosen_style(&self) -> Style {
        Style::default().fg(self.chosen).add_modifier(Modifier::BOLD)
    }

    pub fn loading_style(&self) -> Style {
        Style::default().fg(self.loading).add_modifier(Modifier::ITALIC)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }
}
