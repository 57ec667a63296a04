use super::ui;
use chrono::NaiveDate;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use pipeline_tracker::core::{
    FieldValue, Indicator, OpportunityField, OpportunityStatus, Phase, StatusParse,
};
use pipeline_tracker::session::{LoadState, StagedCompany, StagedWrite, TrackerSession};
use pipeline_tracker::store::{PendingDelete, RemoteStore};
use pipeline_tracker::view::{SelectionMode, TableColumn};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
    widgets::{Block, Borders},
};
use std::io;
use tui_textarea::TextArea;

/// Pixels of persisted column width per terminal cell.
const PIXELS_PER_CELL: u16 = 6;
const RESIZE_STEP: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ViewMode {
    Table,
    Timeline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerValue {
    Field(FieldValue),
    Company(String),
}

#[derive(Debug, Clone)]
pub struct Picker {
    pub record_id: String,
    pub field: OpportunityField,
    pub options: Vec<(String, PickerValue)>,
    pub index: usize,
}

pub enum Mode {
    Browse,
    /// Text or numeric draft in the edit box.
    Editing,
    /// Date typed as `YYYY-MM-DD`; empty clears it.
    DatePrompt { record_id: String },
    Picker(Picker),
    ConfirmDelete(PendingDelete),
}

/// Change already drawn, waiting for its remote write(s).
enum PendingWrite {
    Field(StagedWrite),
    Company(StagedCompany),
}

pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

pub struct App<'a, S: RemoteStore> {
    pub session: TrackerSession<S>,
    pub view: ViewMode,
    pub mode: Mode,
    pub textarea: TextArea<'a>,
    pub row: usize,
    pub column: usize,
    pub notice: Option<Notice>,
    pub exit: bool,
    pending: Option<PendingWrite>,
}

impl<'a, S: RemoteStore> App<'a, S> {
    pub fn new(session: TrackerSession<S>, view: ViewMode) -> Self {
        Self {
            session,
            view,
            mode: Mode::Browse,
            textarea: TextArea::default(),
            row: 0,
            column: 0,
            notice: None,
            exit: false,
            pending: None,
        }
    }

    pub fn into_session(self) -> TrackerSession<S> {
        self.session
    }

    pub fn current_column(&self) -> TableColumn {
        TableColumn::ALL[self.column.min(TableColumn::ALL.len() - 1)]
    }

    /// Terminal cells for a column, from its persisted pixel width.
    pub fn column_cells(&self, column: TableColumn) -> u16 {
        (self.session.app_state().column_width(column.width_key()) / PIXELS_PER_CELL).max(3)
    }

    fn edit_box(title: &str, draft: &str) -> TextArea<'static> {
        let mut textarea = TextArea::new(vec![draft.to_string()]);
        textarea.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} (Enter to save, Esc to cancel) ", title)),
        );
        textarea
    }

    fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: false,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: true,
        });
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        res
    }

    async fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        if self.session.refetch().await.is_err() {
            self.session.take_error();
        }

        loop {
            terminal.draw(|f| ui::draw(f, self))?;

            // The optimistic value is on screen; now wait for the store.
            if self.pending.is_some() {
                self.finish_pending().await;
                continue;
            }

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key).await;
                }
            }
            if self.exit {
                return Ok(());
            }
        }
    }

    async fn finish_pending(&mut self) {
        let Some(write) = self.pending.take() else {
            return;
        };
        let result = match write {
            PendingWrite::Field(staged) => self.session.complete(staged).await,
            PendingWrite::Company(staged) => self.session.complete_company(staged).await,
        };
        match result {
            Ok(()) => self.report_reload_error("Saved"),
            Err(err) => {
                self.session.take_error();
                self.error(format!("Save failed, change reverted: {}", err));
            }
        }
        self.clamp_cursor();
    }

    /// A write that succeeded can still leave a failed reload behind.
    fn report_reload_error(&mut self, done: &str) {
        if let Some(err) = self.session.take_error() {
            self.error(format!("{}, but reload failed: {}", done, err));
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => self.handle_browse_key(key).await,
            Mode::Editing => self.handle_edit_key(key),
            Mode::DatePrompt { record_id } => self.handle_date_key(key, record_id).await,
            Mode::Picker(picker) => self.handle_picker_key(key, picker).await,
            Mode::ConfirmDelete(pending) => self.handle_confirm_key(key, pending).await,
        }
    }

    async fn handle_browse_key(&mut self, key: KeyEvent) {
        if matches!(self.session.load_state(), LoadState::Failed { .. }) {
            match key.code {
                KeyCode::Char('r') => self.refetch().await,
                KeyCode::Char('q') | KeyCode::Esc => self.exit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.exit = true,
            KeyCode::Char('r') => self.refetch().await,
            KeyCode::Char('t') => {
                self.view = match self.view {
                    ViewMode::Table => ViewMode::Timeline,
                    ViewMode::Timeline => ViewMode::Table,
                };
            }
            KeyCode::Char('c') => {
                self.session.filters_mut().clear();
                self.row = 0;
                self.info("Filters cleared");
            }
            KeyCode::Char('f') => {
                let filters = self.session.filters_mut();
                filters.set_opportunity_mode(filters.opportunity_mode.toggled());
                let label = match filters.opportunity_mode {
                    SelectionMode::All => "Showing all opportunities",
                    SelectionMode::Select => "Showing selected opportunities",
                };
                self.clamp_cursor();
                self.info(label);
            }
            _ if self.view == ViewMode::Timeline => {}
            KeyCode::Up => self.row = self.row.saturating_sub(1),
            KeyCode::Down => {
                self.row += 1;
                self.clamp_cursor();
            }
            KeyCode::Left => self.column = self.column.saturating_sub(1),
            KeyCode::Right => self.column = (self.column + 1).min(TableColumn::ALL.len() - 1),
            KeyCode::Char('s') => {
                if let Some(field) = self.current_column().sort_field() {
                    self.session.toggle_sort(field);
                }
            }
            KeyCode::Char('<') | KeyCode::Char('>') => {
                let key_name = self.current_column().width_key();
                let width = self.session.app_state().column_width(key_name);
                let width = if key.code == KeyCode::Char('<') {
                    width.saturating_sub(RESIZE_STEP)
                } else {
                    width.saturating_add(RESIZE_STEP)
                };
                self.session
                    .app_state_mut()
                    .set_column_width(key_name, width);
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_id() {
                    self.session.filters_mut().toggle_opportunity(&id);
                }
            }
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Enter => self.activate_cell(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.session.cancel_edit();
            }
            KeyCode::Enter => match self.session.stage_commit() {
                Ok(staged) => self.pending = Some(PendingWrite::Field(staged)),
                Err(err) => {
                    self.error(err.to_string());
                    self.mode = Mode::Editing;
                }
            },
            _ => {
                self.textarea.input(key);
                let draft = self.textarea.lines().join(" ");
                if let Err(err) = self.session.set_draft(draft) {
                    self.error(err.to_string());
                    return;
                }
                self.notice = None;
                self.mode = Mode::Editing;
            }
        }
    }

    async fn handle_date_key(&mut self, key: KeyEvent, record_id: String) {
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let raw = self.textarea.lines().join("");
                let value = match raw.trim() {
                    "" => FieldValue::Null,
                    text => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                        Ok(date) => FieldValue::Date(date),
                        Err(_) => {
                            self.error(format!("'{}' is not a YYYY-MM-DD date", text));
                            self.mode = Mode::DatePrompt { record_id };
                            return;
                        }
                    },
                };
                self.stage_select(&record_id, OpportunityField::TargetDate, value);
            }
            _ => {
                self.textarea.input(key);
                self.mode = Mode::DatePrompt { record_id };
            }
        }
    }

    async fn handle_picker_key(&mut self, key: KeyEvent, mut picker: Picker) {
        let len = picker.options.len().max(1);
        match key.code {
            KeyCode::Down => picker.index = (picker.index + 1) % len,
            KeyCode::Up => picker.index = (picker.index + len - 1) % len,
            KeyCode::Esc => return,
            KeyCode::Enter => {
                let Some((_, value)) = picker.options.get(picker.index).cloned() else {
                    return;
                };
                match value {
                    PickerValue::Field(value) => {
                        self.stage_select(&picker.record_id, picker.field, value)
                    }
                    PickerValue::Company(company_id) => {
                        match self.session.stage_company(&picker.record_id, &company_id) {
                            Ok(staged) => self.pending = Some(PendingWrite::Company(staged)),
                            Err(err) => self.error(err.to_string()),
                        }
                    }
                }
                return;
            }
            _ => {}
        }
        self.mode = Mode::Picker(picker);
    }

    async fn handle_confirm_key(&mut self, key: KeyEvent, pending: PendingDelete) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let confirmed = pending.confirm();
                match self.session.delete(confirmed).await {
                    Ok(()) => {
                        self.info("Opportunity deleted");
                        self.report_reload_error("Deleted");
                    }
                    Err(err) => {
                        self.session.take_error();
                        self.error(format!("Delete failed: {}", err));
                    }
                }
                self.clamp_cursor();
            }
            _ => {
                pending.decline();
                self.info("Delete cancelled");
            }
        }
    }

    fn stage_select(&mut self, record_id: &str, field: OpportunityField, value: FieldValue) {
        match self.session.stage_select(record_id, field, value) {
            Ok(staged) => self.pending = Some(PendingWrite::Field(staged)),
            Err(err) => self.error(err.to_string()),
        }
    }

    async fn refetch(&mut self) {
        match self.session.refetch().await {
            Ok(()) => self.info("Reloaded"),
            Err(err) => {
                self.session.take_error();
                self.error(format!("Reload failed: {}", err));
            }
        }
        self.clamp_cursor();
    }

    fn request_delete(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.session.request_delete(&id) {
            Ok(pending) => self.mode = Mode::ConfirmDelete(pending),
            Err(err) => self.error(err.to_string()),
        }
    }

    fn activate_cell(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let Some(field) = self.current_column().field() else {
            return;
        };

        if field.is_draft_editable() {
            match self.session.begin_edit(&id, field) {
                Ok(_) => {
                    let draft = self
                        .session
                        .edit_state()
                        .session()
                        .map(|session| session.draft.clone())
                        .unwrap_or_default();
                    self.textarea = Self::edit_box(self.current_column().header(), &draft);
                    self.textarea.move_cursor(tui_textarea::CursorMove::End);
                    self.mode = Mode::Editing;
                }
                Err(err) => self.error(err.to_string()),
            }
            return;
        }

        if field == OpportunityField::TargetDate {
            let current = self
                .session
                .record(&id)
                .and_then(|record| record.target_date)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            self.textarea = Self::edit_box("Target date (YYYY-MM-DD)", &current);
            self.textarea.move_cursor(tui_textarea::CursorMove::End);
            self.mode = Mode::DatePrompt { record_id: id };
            return;
        }

        let options = self.picker_options(field);
        if options.is_empty() {
            self.error("Nothing to choose from");
            return;
        }
        let current = self.current_choice(&id, field);
        let index = options
            .iter()
            .position(|(_, value)| Some(value) == current.as_ref())
            .unwrap_or(0);
        self.mode = Mode::Picker(Picker {
            record_id: id,
            field,
            options,
            index,
        });
    }

    /// The record's value in picker terms; `None` when no option matches it.
    fn current_choice(&self, id: &str, field: OpportunityField) -> Option<PickerValue> {
        let record = self.session.record(id)?;
        match field {
            OpportunityField::CompanyId | OpportunityField::Company => {
                record.company_id.clone().map(PickerValue::Company)
            }
            OpportunityField::Status => match StatusParse::parse(&record.status) {
                StatusParse::Known(status) => {
                    Some(PickerValue::Field(FieldValue::Text(status.key().to_string())))
                }
                StatusParse::Unknown(_) => None,
            },
            other => Some(PickerValue::Field(record.field_value(other))),
        }
    }

    fn picker_options(&self, field: OpportunityField) -> Vec<(String, PickerValue)> {
        match field {
            OpportunityField::Phase => Phase::ALL
                .iter()
                .map(|phase| {
                    (
                        format!("{} {}", phase.short_name(), phase.name()),
                        PickerValue::Field(FieldValue::Integer(phase.number())),
                    )
                })
                .collect(),
            OpportunityField::Status => OpportunityStatus::ALL
                .iter()
                .map(|status| {
                    (
                        status.label().to_string(),
                        PickerValue::Field(FieldValue::Text(status.key().to_string())),
                    )
                })
                .collect(),
            OpportunityField::Indicator(_) => Indicator::ALL
                .iter()
                .map(|indicator| {
                    (
                        indicator.key().to_string(),
                        PickerValue::Field(FieldValue::Text(indicator.key().to_string())),
                    )
                })
                .collect(),
            OpportunityField::CompanyId | OpportunityField::Company => self
                .session
                .companies()
                .iter()
                .map(|company| (company.name.clone(), PickerValue::Company(company.id.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.session
            .visible()
            .get(self.row)
            .map(|record| record.id.clone())
    }

    fn clamp_cursor(&mut self) {
        let len = self.session.visible().len();
        self.row = self.row.min(len.saturating_sub(1));
    }
}
