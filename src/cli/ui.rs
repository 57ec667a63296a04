use super::app::{App, Mode, ViewMode};
use pipeline_tracker::core::Indicator;
use pipeline_tracker::session::LoadState;
use pipeline_tracker::store::RemoteStore;
use pipeline_tracker::view::{SortDirection, TableColumn, TableRow, TimelineColumn};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

pub fn draw<S: RemoteStore>(f: &mut Frame, app: &App<S>) {
    match app.session.load_state() {
        LoadState::Loading => {
            let loading = Paragraph::new("Loading opportunities...")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" Pipeline "));
            f.render_widget(loading, f.area());
            return;
        }
        LoadState::Failed { message } => {
            draw_load_error(f, message);
            return;
        }
        LoadState::Ready => {}
    }

    let editing = matches!(app.mode, Mode::Editing | Mode::DatePrompt { .. });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(3),                                   // Table or timeline
                Constraint::Length(if editing { 3 } else { 0 }),      // Edit box
                Constraint::Length(1),                                // Status line
            ]
            .as_ref(),
        )
        .split(f.area());

    match app.view {
        ViewMode::Table => draw_table(f, app, chunks[0]),
        ViewMode::Timeline => draw_timeline(f, &app.session.timeline(), chunks[0]),
    }

    if editing {
        f.render_widget(&app.textarea, chunks[1]);
    }
    draw_status(f, app, chunks[2]);

    match &app.mode {
        Mode::Picker(picker) => {
            let height = (picker.options.len() as u16 + 2).min(12);
            let area = centered(f.area(), 32, height);
            f.render_widget(Clear, area);

            let items: Vec<ListItem> = picker
                .options
                .iter()
                .map(|(label, _)| ListItem::new(label.as_str()))
                .collect();

            let mut state = ListState::default();
            state.select(Some(picker.index));

            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} ", picker.field)),
                )
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol(">> ");

            f.render_stateful_widget(list, area, &mut state);
        }
        Mode::ConfirmDelete(pending) => {
            let area = centered(f.area(), 50, 5);
            f.render_widget(Clear, area);
            let dialog = Paragraph::new(vec![
                Line::from(pending.prompt()),
                Line::from(Span::styled(
                    "y: delete   any other key: keep",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Delete ")
                    .border_style(Style::default().fg(Color::Red)),
            );
            f.render_widget(dialog, area);
        }
        _ => {}
    }
}

fn draw_load_error(f: &mut Frame, message: &str) {
    let area = centered(f.area(), 60, 7);
    let page = Paragraph::new(vec![
        Line::from(Span::styled(
            "Failed to load opportunities",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("Press r to retry, q to quit."),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(page, area);
}

fn draw_table<S: RemoteStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let sort = app.session.sort();
    let header = Row::new(TableColumn::ALL.iter().map(|column| {
        let mut title = column.header().to_string();
        if column.sort_field() == Some(sort.field) {
            title.push_str(match sort.direction {
                SortDirection::Asc => " ▲",
                SortDirection::Desc => " ▼",
            });
        }
        Cell::from(title)
    }))
    .style(Style::default().add_modifier(Modifier::BOLD))
    .bottom_margin(1);

    let rows: Vec<TableRow> = app.session.table_rows();
    let selected = &app.session.app_state().filters.selected_opportunity_ids;
    let body = rows.iter().map(|row| {
        let cells = TableColumn::ALL.iter().map(|column| {
            let text = row.cell(*column);
            match column {
                TableColumn::Indicator(_) => {
                    let color = Indicator::parse(&text).map(indicator_color).unwrap_or(Color::Red);
                    Cell::from(Span::styled("●", Style::default().fg(color)))
                }
                _ if row.editing.is_some() && row.editing == column.field() => Cell::from(Span::styled(
                    text,
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
                )),
                _ => Cell::from(text),
            }
        });
        let mut table_row = Row::new(cells);
        if selected.contains(&row.id) {
            table_row = table_row.style(Style::default().fg(Color::Cyan));
        }
        table_row
    });

    let widths: Vec<Constraint> = TableColumn::ALL
        .iter()
        .map(|column| Constraint::Length(app.column_cells(*column)))
        .collect();

    let title = format!(
        " Pipeline ({}){} ",
        rows.len(),
        if app.session.app_state().filters.is_active() { " [filtered]" } else { "" }
    );
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .cell_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !rows.is_empty() {
        state.select(Some(app.row));
        state.select_column(Some(app.column));
    }
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_timeline(f: &mut Frame, columns: &[TimelineColumn], area: Rect) {
    let constraints = vec![Constraint::Ratio(1, columns.len().max(1) as u32); columns.len()];
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (column, area) in columns.iter().zip(areas.iter()) {
        let cards: Vec<ListItem> = column
            .cards
            .iter()
            .map(|card| {
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled(card.company.clone(), Style::default().fg(Color::DarkGray)),
                        Span::raw("  "),
                        Span::styled(card.status.clone(), Style::default().fg(Color::Cyan)),
                    ]),
                    Line::from(Span::styled(
                        card.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                ];
                let mut meta: Vec<Span> = card
                    .indicators
                    .iter()
                    .map(|indicator| Span::styled("● ", Style::default().fg(indicator_color(*indicator))))
                    .collect();
                if let Some(som) = &card.som {
                    meta.push(Span::raw(format!(" {}", som)));
                }
                if let Some(target) = &card.target {
                    meta.push(Span::raw(format!(" {}", target)));
                }
                lines.push(Line::from(meta));
                lines.push(Line::from(""));
                ListItem::new(lines)
            })
            .collect();

        let title = format!(" {} · {} ", column.phase.name(), column.count_label());
        let list = List::new(cards).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, *area);
    }
}

fn draw_status<S: RemoteStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let line = if let Some(error) = app
        .session
        .edit_state()
        .session()
        .and_then(|session| session.error.as_ref())
    {
        Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
    } else if app.session.records().unconfirmed_len() > 0 {
        Line::from(Span::styled("Saving...", Style::default().fg(Color::Yellow)))
    } else if let Some(notice) = &app.notice {
        let color = if notice.is_error { Color::Red } else { Color::Green };
        Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
    } else {
        Line::from(Span::styled(
            "Enter edit  s sort  d delete  space select  f filter  c clear  </> width  t view  r reload  q quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn indicator_color(indicator: Indicator) -> Color {
    match indicator {
        Indicator::Green => Color::Green,
        Indicator::Amber => Color::Yellow,
        Indicator::Red => Color::Red,
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
