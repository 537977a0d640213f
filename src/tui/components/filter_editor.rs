//! Filter Editor Component
//!
//! Edits a cell's filter clauses: one table row per clause with column,
//! operator and value fields, plus a panel listing the looked-up value
//! choices for the selected clause.

use crate::cell::{CellController, ValueControl};
use crate::core::{CellError, ClauseEdit, FilterValue, ValueShape};
use crate::services::FetchCompletion;
use crate::tui::{Action, Component, Theme};
use color_eyre::Result;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

/// Field of the selected clause that has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Column,
    Operator,
    Value,
}

impl EditorField {
    fn next(self) -> Self {
        match self {
            Self::Column => Self::Operator,
            Self::Operator => Self::Value,
            Self::Value => Self::Column,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Column => Self::Value,
            Self::Operator => Self::Column,
            Self::Value => Self::Operator,
        }
    }
}

/// Message shown under the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

pub struct FilterEditor {
    cell: CellController,
    completions: UnboundedReceiver<FetchCompletion>,
    selected: usize,
    field: EditorField,
    choice_cursor: usize,
    input: String,
    status: Option<StatusMessage>,
    supported_actions: Vec<Action>,
}

impl FilterEditor {
    pub fn new(cell: CellController, completions: UnboundedReceiver<FetchCompletion>) -> Self {
        Self {
            cell,
            completions,
            selected: 0,
            field: EditorField::Column,
            choice_cursor: 0,
            input: String::new(),
            status: None,
            supported_actions: vec![
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
            ],
        }
    }

    pub fn cell(&self) -> &CellController {
        &self.cell
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn field(&self) -> EditorField {
        self.field
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Whether typed characters should go into the value buffer
    pub fn accepts_text(&self) -> bool {
        self.cell.is_edit_mode()
            && self.field == EditorField::Value
            && !matches!(self.selected_control(), None | Some(ValueControl::Hidden))
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Apply lookup completions that have arrived since the last tick
    pub fn pump(&mut self) -> usize {
        let applied = self.cell.pump(&mut self.completions);
        if applied > 0 {
            debug!(applied, "value choices loaded");
            self.clamp_choice_cursor();
        }
        applied
    }

    fn selected_control(&self) -> Option<ValueControl> {
        self.cell.value_control(self.selected)
    }

    fn select_row(&mut self, row: usize) {
        self.selected = row;
        self.choice_cursor = 0;
        self.input.clear();
    }

    fn clamp_choice_cursor(&mut self) {
        let len = match self.selected_control() {
            Some(ValueControl::Select { choices, .. }) => choices.len(),
            _ => 0,
        };
        self.choice_cursor = self.choice_cursor.min(len.saturating_sub(1));
    }

    fn step(current: Option<usize>, len: usize, forward: bool) -> usize {
        match (current, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        }
    }

    fn cycle_column(&mut self, forward: bool) -> Result<(), CellError> {
        let columns = self.cell.column_choices();
        let Some(clause) = self.cell.clauses().get(self.selected) else {
            return Ok(());
        };
        if columns.is_empty() {
            return Ok(());
        }
        let current = clause.col.as_deref();
        let position = columns.iter().position(|(value, _)| Some(value.as_str()) == current);
        let next = columns[Self::step(position, columns.len(), forward)].0.clone();
        self.cell
            .change_filter(self.selected, ClauseEdit::Column(Some(next)))?;
        self.choice_cursor = 0;
        Ok(())
    }

    fn cycle_operator(&mut self, forward: bool) -> Result<(), CellError> {
        let operators = self.cell.operator_choices();
        let Some(current) = self.cell.clauses().get(self.selected).map(|c| c.op) else {
            return Ok(());
        };
        if operators.is_empty() {
            return Ok(());
        }
        let position = operators.iter().position(|op| *op == current);
        let next = operators[Self::step(position, operators.len(), forward)];
        self.cell.switch_operator(self.selected, next)?;
        Ok(())
    }

    fn cycle_choice(&mut self, forward: bool) {
        if let Some(ValueControl::Select { choices, .. }) = self.selected_control()
            && !choices.is_empty()
        {
            self.choice_cursor = Self::step(Some(self.choice_cursor), choices.len(), forward);
        }
    }

    fn toggle_choice(&mut self) -> Result<(), CellError> {
        let Some(ValueControl::Select {
            multi,
            choices,
            mut selected,
            ..
        }) = self.selected_control()
        else {
            return Ok(());
        };
        let Some(choice) = choices.get(self.choice_cursor) else {
            return Ok(());
        };
        let choice = choice.as_str().to_string();
        let value = if multi {
            match selected.iter().position(|v| *v == choice) {
                Some(i) => {
                    selected.remove(i);
                }
                None => selected.push(choice),
            }
            FilterValue::List(selected)
        } else if selected.first() == Some(&choice) {
            FilterValue::Scalar(String::new())
        } else {
            FilterValue::Scalar(choice)
        };
        self.cell.change_filter(self.selected, ClauseEdit::Value(value))?;
        Ok(())
    }

    /// Commit the typed buffer as the selected clause's value
    fn commit_input(&mut self) -> Result<(), CellError> {
        if self.input.is_empty() {
            return Ok(());
        }
        let typed = std::mem::take(&mut self.input);
        let Some(clause) = self.cell.clauses().get(self.selected) else {
            return Ok(());
        };
        let value = match (clause.op.value_shape(), &clause.val) {
            (ValueShape::None, _) => return Ok(()),
            (ValueShape::Scalar, _) => FilterValue::Scalar(typed),
            (ValueShape::List, FilterValue::List(existing)) => {
                let mut values = existing.clone();
                values.extend(
                    typed
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty() && !existing.iter().any(|e| e == v))
                        .map(str::to_string),
                );
                FilterValue::List(values)
            }
            (ValueShape::List, _) => FilterValue::List(
                typed
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        };
        self.cell.change_filter(self.selected, ClauseEdit::Value(value))?;
        Ok(())
    }

    fn apply(&mut self, action: Action) -> Result<bool, CellError> {
        match action {
            Action::ToggleEditMode => {
                let edit = !self.cell.is_edit_mode();
                self.cell.set_edit_mode(edit);
                self.input.clear();
                return Ok(true);
            }
            Action::ToggleExpanded => {
                let expanded = !self.cell.is_expanded();
                self.cell.set_expanded(expanded);
                return Ok(true);
            }
            Action::MoveUp => {
                if self.selected > 0 {
                    self.select_row(self.selected - 1);
                }
                return Ok(true);
            }
            Action::MoveDown => {
                if self.selected + 1 < self.cell.clauses().len() {
                    self.select_row(self.selected + 1);
                }
                return Ok(true);
            }
            _ => {}
        }

        if !self.cell.is_edit_mode() {
            return Ok(false);
        }

        match action {
            Action::NextField => self.field = self.field.next(),
            Action::PrevField => self.field = self.field.prev(),
            Action::AddFilter => {
                self.cell.add_filter()?;
                self.select_row(self.cell.clauses().len() - 1);
                self.field = EditorField::Column;
            }
            Action::RemoveFilter => {
                if self.cell.clauses().is_empty() {
                    return Ok(true);
                }
                self.cell.remove_filter(self.selected)?;
                let last = self.cell.clauses().len().saturating_sub(1);
                self.select_row(self.selected.min(last));
            }
            Action::NextChoice | Action::PrevChoice => {
                let forward = action == Action::NextChoice;
                match self.field {
                    EditorField::Column => self.cycle_column(forward)?,
                    EditorField::Operator => self.cycle_operator(forward)?,
                    EditorField::Value => self.cycle_choice(forward),
                }
            }
            Action::ToggleChoice if self.field == EditorField::Value => self.toggle_choice()?,
            Action::Confirm if self.field == EditorField::Value => self.commit_input()?,
            Action::Cancel => {
                self.input.clear();
                self.status = None;
            }
            Action::ToggleHaving => {
                let having = !self.cell.is_having();
                self.cell.set_having(having);
                self.status = Some(StatusMessage::Info(if having {
                    "Filtering on metrics (having)".to_string()
                } else {
                    "Filtering on columns".to_string()
                }));
            }
            Action::RefreshChoices => {
                if !self.cell.clauses().is_empty() {
                    self.cell.refresh_choices(self.selected)?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn value_text(&self, control: &ValueControl) -> (String, bool) {
        match control {
            ValueControl::Hidden => (String::new(), false),
            ValueControl::Text { value } => (value.clone(), false),
            ValueControl::Select {
                loading, selected, ..
            } => (selected.join(", "), *loading),
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let views = self.cell.clause_views();
        let header = Row::new(vec![
            Cell::from("Column"),
            Cell::from("Operator"),
            Cell::from("Value"),
        ])
        .style(theme.header_style());

        let rows: Vec<Row> = views
            .iter()
            .map(|view| {
                let is_selected = view.index == self.selected;
                let (mut value, loading) = self.value_text(&view.control);
                if is_selected && self.field == EditorField::Value && !self.input.is_empty() {
                    value = format!("{value} > {}", self.input);
                }
                let fields = [
                    (
                        EditorField::Column,
                        view.column_label
                            .clone()
                            .or_else(|| view.column.clone())
                            .unwrap_or_else(|| "(none)".to_string()),
                    ),
                    (EditorField::Operator, view.operator.to_string()),
                    (
                        EditorField::Value,
                        if loading {
                            format!("{value} (loading...)")
                        } else {
                            value
                        },
                    ),
                ];
                let cells: Vec<Cell> = fields
                    .into_iter()
                    .map(|(field, text)| {
                        let cell = Cell::from(text);
                        if is_selected && field == self.field {
                            cell.style(theme.focused_field_style())
                        } else if field == EditorField::Value && loading {
                            cell.style(theme.loading_style())
                        } else {
                            cell
                        }
                    })
                    .collect();
                Row::new(cells)
            })
            .collect();

        let title = format!(
            "Filters{} [{}]",
            if self.cell.is_having() { " (having)" } else { "" },
            views.len()
        );
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(20),
                Constraint::Percentage(50),
            ],
        )
        .header(header)
        .row_highlight_style(theme.selected_row_style())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(theme.border_style(true)),
        );

        let mut state = TableState::default();
        if !views.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_choices(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Values")
            .border_style(theme.border_style(self.field == EditorField::Value));

        let items: Vec<ListItem> = match self.selected_control() {
            Some(ValueControl::Select {
                loading: true,
                choices,
                ..
            }) if choices.is_empty() => {
                vec![ListItem::new(Span::styled("Loading...", theme.loading_style()))]
            }
            Some(ValueControl::Select {
                multi,
                choices,
                selected,
                ..
            }) => choices
                .iter()
                .map(|choice| {
                    let chosen = selected.iter().any(|s| s == choice.as_str());
                    let mark = match (multi, chosen) {
                        (true, true) => "[x] ",
                        (true, false) => "[ ] ",
                        (false, true) => "(*) ",
                        (false, false) => "( ) ",
                    };
                    let style = if chosen {
                        theme.chosen_style()
                    } else {
                        theme.normal_style()
                    };
                    ListItem::new(Line::from(vec![
                        Span::raw(mark),
                        Span::styled(choice.as_str().to_string(), style),
                    ]))
                })
                .collect(),
            Some(ValueControl::Text { .. }) => {
                vec![ListItem::new(Span::styled("Type a value, Enter to apply", theme.muted_style()))]
            }
            _ => vec![],
        };

        let has_choices = !items.is_empty();
        let list = List::new(items)
            .block(block)
            .highlight_style(theme.selected_row_style());
        let mut state = ListState::default();
        if has_choices && self.field == EditorField::Value {
            state.select(Some(self.choice_cursor));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    /// Read-only summary, one `column: value` line per clause
    fn render_summary(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let lines: Vec<Line> = self
            .cell
            .clause_views()
            .into_iter()
            .map(|view| {
                let label = view
                    .column_label
                    .or(view.column)
                    .unwrap_or_else(|| "(none)".to_string());
                let (value, _) = self.value_text(&view.control);
                Line::from(vec![
                    Span::styled(format!("{label}: "), theme.header_style()),
                    Span::raw(format!("{} {value}", view.operator)),
                ])
            })
            .collect();
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Filters")
                .border_style(theme.border_style(false)),
        );
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let line = match &self.status {
            Some(StatusMessage::Error(msg)) => Line::styled(msg.clone(), theme.error_style()),
            Some(StatusMessage::Info(msg)) => Line::styled(msg.clone(), theme.info_style()),
            None => {
                let filters = self
                    .cell
                    .query_config()
                    .ok()
                    .and_then(|q| q.get("filters").map(|f| f.to_string()))
                    .unwrap_or_default();
                Line::styled(format!("filters: {filters}"), theme.muted_style())
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

impl Component for FilterEditor {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match self.apply(action) {
            Ok(handled) => Ok(handled),
            Err(err) => {
                warn!(?action, error = %err, "filter edit rejected");
                self.status = Some(StatusMessage::Error(err.to_string()));
                Ok(true)
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let theme = Theme::default();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        if self.cell.is_edit_mode() {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(chunks[0]);
            self.render_table(frame, panes[0], &theme);
            self.render_choices(frame, panes[1], &theme);
        } else {
            self.render_summary(frame, chunks[0], &theme);
        }
        self.render_status(frame, chunks[1], &theme);
    }

    fn supported_actions(&self) -> &[Action] {
        &self.supported_actions
    }

    fn name(&self) -> &str {
        "FilterEditor"
    }

    fn update(&mut self) -> Result<()> {
        self.pump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{
        CellProps, Collaborators, FormData, GeometrySettings, InMemoryFilterApi, QueryConfig,
        QueryRunner, Slice,
    };
    use crate::core::{Datasource, DatasourceType, FilterClause, Operator, SliceId};
    use crate::services::StaticValueLookup;
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingRunner {
        queries: Mutex<Vec<QueryConfig>>,
    }

    impl QueryRunner for CountingRunner {
        fn run_query(&self, query: QueryConfig, _force: bool, _timeout: u64, _key: &str) {
            self.queries.lock().unwrap().push(query);
        }
    }

    fn editor(initial_filters: Vec<FilterClause>) -> (FilterEditor, Arc<CountingRunner>) {
        let runner = Arc::new(CountingRunner::default());
        let props = CellProps {
            slice: Slice {
                slice_id: SliceId::new(3),
                slice_name: "Revenue".into(),
                form_data: FormData::default(),
                description_markeddown: None,
            },
            chart_key: "slice_3".into(),
            datasource: Some(Datasource {
                id: 9,
                datasource_type: DatasourceType::Table,
                filter_select: false,
                filterable_cols: vec![
                    ("region".into(), "Region".into()),
                    ("country".into(), "Country".into()),
                ],
                metrics_combo: vec![("sum__num".into(), "SUM(num)".into())],
            }),
            timeout_secs: 30,
            widget_width: 400,
            widget_height: 300,
            is_expanded: false,
            edit_mode: true,
            initial_filters,
        };
        let collaborators = Collaborators {
            query_runner: runner.clone(),
            filter_api: Arc::new(InMemoryFilterApi::new()),
            value_lookup: Arc::new(StaticValueLookup::default()),
        };
        let (cell, rx) = CellController::new(props, collaborators, GeometrySettings::default());
        (FilterEditor::new(cell, rx), runner)
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn add_filter_selects_new_row_with_default_column() {
        let (mut editor, runner) = editor(vec![]);
        editor.handle_action(Action::AddFilter).unwrap();

        assert_eq!(editor.selected(), 0);
        assert_eq!(editor.field(), EditorField::Column);
        assert_eq!(editor.cell().clauses()[0].col.as_deref(), Some("region"));
        assert_eq!(runner.queries.lock().unwrap().len(), 1);
    }

    #[test]
    fn cycling_column_and_operator() {
        let (mut editor, _runner) = editor(vec![]);
        editor.handle_action(Action::AddFilter).unwrap();

        editor.handle_action(Action::NextChoice).unwrap();
        assert_eq!(editor.cell().clauses()[0].col.as_deref(), Some("country"));
        editor.handle_action(Action::NextChoice).unwrap();
        assert_eq!(editor.cell().clauses()[0].col.as_deref(), Some("region"));

        editor.handle_action(Action::NextField).unwrap();
        editor.handle_action(Action::NextChoice).unwrap();
        assert_eq!(editor.cell().clauses()[0].op, Operator::NotIn);
        editor.handle_action(Action::PrevChoice).unwrap();
        editor.handle_action(Action::PrevChoice).unwrap();
        assert_ne!(editor.cell().clauses()[0].op, Operator::In);
    }

    #[test]
    fn typed_text_commits_by_operator_shape() {
        let (mut editor, _runner) = editor(vec![]);
        editor.handle_action(Action::AddFilter).unwrap();
        editor.handle_action(Action::PrevField).unwrap();
        assert!(editor.accepts_text());

        for c in "east, west".chars() {
            editor.insert_char(c);
        }
        editor.handle_action(Action::Confirm).unwrap();
        assert_eq!(
            editor.cell().clauses()[0].val,
            FilterValue::List(vec!["east".into(), "west".into()])
        );
        assert_eq!(editor.input(), "");

        editor.cell.switch_operator(0, Operator::Gt).unwrap();
        editor.insert_char('7');
        editor.handle_action(Action::Confirm).unwrap();
        assert_eq!(editor.cell().clauses()[0].val, FilterValue::Scalar("7".into()));
    }

    #[test]
    fn remove_clamps_selection_and_invalid_edits_set_status() {
        let (mut editor, _runner) = editor(vec![]);
        editor.handle_action(Action::AddFilter).unwrap();
        editor.handle_action(Action::AddFilter).unwrap();
        assert_eq!(editor.selected(), 1);

        editor.handle_action(Action::RemoveFilter).unwrap();
        assert_eq!(editor.selected(), 0);
        assert_eq!(editor.cell().clauses().len(), 1);

        editor.selected = 5;
        editor.handle_action(Action::RefreshChoices).unwrap();
        assert!(matches!(editor.status(), Some(StatusMessage::Error(_))));
    }

    #[test]
    fn read_only_mode_ignores_edits() {
        let (mut editor, runner) = editor(vec![]);
        editor.handle_action(Action::ToggleEditMode).unwrap();

        assert!(!editor.handle_action(Action::AddFilter).unwrap());
        assert!(editor.cell().clauses().is_empty());
        assert!(runner.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn renders_rows_and_read_only_summary() {
        let (mut editor, _runner) = editor(vec![FilterClause {
            col: Some("region".into()),
            op: Operator::In,
            val: FilterValue::List(vec!["east".into()]),
        }]);
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();

        terminal.draw(|f| editor.render(f, f.area())).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Filters [1]"));
        assert!(text.contains("Region"));
        assert!(text.contains("east"));
        assert!(text.contains(r#"filters: [{"col":"region","op":"in","val":["east"]}]"#));

        editor.handle_action(Action::ToggleEditMode).unwrap();
        terminal.draw(|f| editor.render(f, f.area())).unwrap();
        assert!(buffer_text(&terminal).contains("Region: in east"));
    }
}
