mod types;

pub use types::{Focus, Overlay};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;

use crate::api::RestoreMode;
use crate::browser::{Dialog, Mode, CONFIRM_KEYWORD};
use crate::coordinator::{Page, ViewCoordinator};
use crate::format::{format_size, format_time};

pub struct App {
    coord: ViewCoordinator,
    auto_list_state: ListState,
    manual_list_state: ListState,
    focus: Focus,
    overlay: Overlay,
    /// Track if 'g' was pressed for 'gg' sequence
    g_pressed: bool,
}

impl App {
    pub fn new(coord: ViewCoordinator) -> Self {
        Self {
            coord,
            auto_list_state: ListState::default(),
            manual_list_state: ListState::default(),
            focus: Focus::List,
            overlay: Overlay::None,
            g_pressed: false,
        }
    }

    pub fn coordinator(&self) -> &ViewCoordinator {
        &self.coord
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.coord.start().await;
        self.clamp_selection();

        let result = self.run_event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<()> {
        loop {
            self.coord.drain_upload_updates();
            terminal.draw(|f| self.render(f))?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if !self.handle_key(key).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn list_state_mut(&mut self, mode: Mode) -> &mut ListState {
        match mode {
            Mode::Auto => &mut self.auto_list_state,
            Mode::Manual => &mut self.manual_list_state,
        }
    }

    fn selected(&self) -> Option<usize> {
        match self.coord.tab() {
            Mode::Auto => self.auto_list_state.selected(),
            Mode::Manual => self.manual_list_state.selected(),
        }
    }

    /// Keep each pane's selection inside its entries.
    fn clamp_selection(&mut self) {
        for mode in [Mode::Auto, Mode::Manual] {
            let len = self.coord.library().pane(mode).entries.len();
            let state = self.list_state_mut(mode);
            match state.selected() {
                _ if len == 0 => state.select(None),
                Some(idx) if idx < len => {}
                Some(_) => state.select(Some(len - 1)),
                None => state.select(Some(0)),
            }
        }
    }

    fn move_selection(&mut self, offset: isize) {
        let mode = self.coord.tab();
        let len = self.coord.library().pane(mode).entries.len();
        if len == 0 {
            return;
        }
        let state = self.list_state_mut(mode);
        let current = state.selected().unwrap_or(0) as isize;
        let next = (current + offset).clamp(0, len as isize - 1);
        state.select(Some(next as usize));
    }

    fn select_edge(&mut self, bottom: bool) {
        let mode = self.coord.tab();
        let len = self.coord.library().pane(mode).entries.len();
        if len == 0 {
            return;
        }
        let idx = if bottom { len - 1 } else { 0 };
        self.list_state_mut(mode).select(Some(idx));
    }

    /// Handle one key press. Returns false when the app should exit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.overlay {
            Overlay::Help => {
                self.overlay = Overlay::None;
                return true;
            }
            Overlay::ConfirmRestart | Overlay::ConfirmRestore(_) | Overlay::ConfirmDbReset => {
                let overlay = std::mem::replace(&mut self.overlay, Overlay::None);
                if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    return true;
                }
                match overlay {
                    Overlay::ConfirmRestart => self.coord.restart().await,
                    Overlay::ConfirmRestore(mode) => self.coord.restore_backup(mode).await,
                    Overlay::ConfirmDbReset => self.coord.reset_database().await,
                    Overlay::Help | Overlay::None => {}
                }
                return true;
            }
            Overlay::None => {}
        }

        if !self.coord.library().actions().is_idle() {
            self.handle_dialog_key(key).await;
            return true;
        }

        if let Focus::Crumbs(idx) = self.focus {
            self.handle_crumb_key(key, idx).await;
            return true;
        }

        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('?') => self.overlay = Overlay::Help,
            KeyCode::Char(c @ '1'..='5') => {
                let page = Page::ALL[(c as usize) - ('1' as usize)];
                self.coord.show_page(page).await;
                self.clamp_selection();
            }
            _ => match self.coord.page() {
                Page::Library => self.handle_library_key(key).await,
                Page::Settings => self.handle_settings_key(key).await,
                Page::Logs => {
                    if key.code == KeyCode::Char('r') {
                        self.coord.reload_logs().await;
                    }
                }
                Page::Upload | Page::Import => {}
            },
        }
        true
    }

    async fn handle_library_key(&mut self, key: KeyEvent) {
        let mode = self.coord.tab();
        if key.code != KeyCode::Char('g') {
            self.g_pressed = false;
        }
        match key.code {
            KeyCode::Tab => {
                self.coord.toggle_library_tab().await;
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Char('d') => self.move_selection(10),
            KeyCode::Char('u') => self.move_selection(-10),
            KeyCode::Char('g') => {
                if self.g_pressed {
                    self.select_edge(false);
                    self.g_pressed = false;
                } else {
                    self.g_pressed = true;
                }
            }
            KeyCode::Char('G') => self.select_edge(true),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                if let Some(idx) = self.selected() {
                    if self.coord.library_mut().open_entry(mode, idx).await {
                        self.list_state_mut(mode).select(Some(0));
                    }
                }
            }
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => {
                self.coord.library_mut().go_up(mode).await;
                self.list_state_mut(mode).select(Some(0));
            }
            KeyCode::Char('a') | KeyCode::Char('x') => {
                if let Some(idx) = self.selected() {
                    self.coord.library_mut().request_action(mode, idx);
                }
            }
            KeyCode::Char('c') => {
                let crumbs = self.coord.library().pane(mode).crumbs.len();
                if crumbs > 0 {
                    self.focus = Focus::Crumbs(crumbs - 1);
                }
            }
            KeyCode::Char('r') => self.coord.library_mut().refresh(mode).await,
            _ => {}
        }
        self.clamp_selection();
    }

    async fn handle_crumb_key(&mut self, key: KeyEvent, idx: usize) {
        let mode = self.coord.tab();
        let crumbs = &self.coord.library().pane(mode).crumbs;
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.focus = Focus::Crumbs(idx.saturating_sub(1)),
            KeyCode::Right | KeyCode::Char('l') => {
                let last = crumbs.len().saturating_sub(1);
                self.focus = Focus::Crumbs((idx + 1).min(last));
            }
            KeyCode::Enter => {
                let target = crumbs.get(idx).map(|c| c.target.clone());
                self.focus = Focus::List;
                if let Some(target) = target {
                    self.coord.library_mut().navigate(&target).await;
                    self.list_state_mut(mode).select(Some(0));
                    self.clamp_selection();
                }
            }
            KeyCode::Esc | KeyCode::Char('c') => self.focus = Focus::List,
            _ => {}
        }
    }

    async fn handle_dialog_key(&mut self, key: KeyEvent) {
        let actions = self.coord.library_mut().actions_mut();
        if matches!(actions.dialog(), Dialog::Confirming { .. }) {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => actions.answer(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => actions.answer(false),
                _ => {}
            }
        } else {
            match key.code {
                KeyCode::Esc => actions.cancel(),
                KeyCode::Enter => actions.submit(),
                KeyCode::Backspace => {
                    if let Some(input) = actions.input_mut() {
                        input.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(input) = actions.input_mut() {
                        input.push(c);
                    }
                }
                _ => {}
            }
        }

        if self.coord.library().actions().ready().is_some() {
            self.coord.library_mut().run_pending_action().await;
            self.clamp_selection();
        }
    }

    async fn handle_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') => self.coord.reload_settings().await,
            KeyCode::Char('b') => self.coord.run_backup().await,
            KeyCode::Char('R') => self.overlay = Overlay::ConfirmRestart,
            KeyCode::Down | KeyCode::Char('j') => self.coord.select_backup(1),
            KeyCode::Up | KeyCode::Char('k') => self.coord.select_backup(-1),
            KeyCode::Char('a') | KeyCode::Char('d') | KeyCode::Char('c') => {
                // nothing to confirm without a backup to restore
                if self.coord.data().selected_backup_name().is_some() {
                    let mode = match key.code {
                        KeyCode::Char('a') => RestoreMode::Full,
                        KeyCode::Char('d') => RestoreMode::DatabaseOnly,
                        _ => RestoreMode::ConfigOnly,
                    };
                    self.overlay = Overlay::ConfirmRestore(mode);
                }
            }
            KeyCode::Char('Z') => self.overlay = Overlay::ConfirmDbReset,
            _ => {}
        }
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Page tabs
                Constraint::Min(0),    // Page content
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_page_tabs(f, chunks[0]);

        match self.coord.page() {
            Page::Library => self.render_library(f, chunks[1]),
            Page::Upload => self.render_json(
                f,
                chunks[1],
                "Upload (2)",
                self.coord.data().upload.as_ref(),
                "Waiting for upload status...",
            ),
            Page::Import => self.render_import(f, chunks[1]),
            Page::Settings => self.render_settings(f, chunks[1]),
            Page::Logs => self.render_json(
                f,
                chunks[1],
                "Logs (5) | r: reload",
                self.coord.data().logs.as_ref(),
                "No jobs loaded",
            ),
        }

        self.render_status_bar(f, chunks[2]);

        if !self.coord.library().actions().is_idle() {
            self.render_dialog(f, f.area());
        }
        match self.overlay {
            Overlay::Help => self.render_help(f, f.area()),
            Overlay::ConfirmRestart => {
                render_confirm(f, f.area(), "Confirm Restart", &["Restart the server?"])
            }
            Overlay::ConfirmRestore(mode) => {
                let name = self.coord.data().selected_backup_name().unwrap_or("?");
                let question = format!("Restore backup {}?", name);
                let detail = format!("Mode: {}. The server will restart.", mode.label());
                render_confirm(
                    f,
                    f.area(),
                    "Confirm Restore",
                    &[question.as_str(), detail.as_str()],
                );
            }
            Overlay::ConfirmDbReset => render_confirm(
                f,
                f.area(),
                "Confirm DB Reset",
                &[
                    "Erase ONLY the database?",
                    "Imports, overrides and jobs are lost.",
                    "Configuration is kept. The server restarts.",
                ],
            ),
            Overlay::None => {}
        }
    }

    fn render_page_tabs(&self, f: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Page::ALL
            .iter()
            .enumerate()
            .map(|(i, p)| Line::from(format!("{} {}", i + 1, p.title())))
            .collect();
        let selected = Page::ALL
            .iter()
            .position(|p| *p == self.coord.page())
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .divider("|");
        f.render_widget(tabs, area);
    }

    fn render_library(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Auto / Manual
                Constraint::Length(1), // Crumbs
                Constraint::Min(0),    // Entries
            ])
            .split(area);

        let mode = self.coord.tab();
        let sub_tabs = Tabs::new(vec![
            Line::from(Mode::Auto.display_name()),
            Line::from(Mode::Manual.display_name()),
        ])
        .select(if mode == Mode::Auto { 0 } else { 1 })
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .divider("|");
        f.render_widget(sub_tabs, chunks[0]);

        let pane = self.coord.library().pane(mode);

        let mut crumb_spans = Vec::new();
        for (i, crumb) in pane.crumbs.iter().enumerate() {
            if i > 0 {
                crumb_spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
            }
            let style = if self.focus == Focus::Crumbs(i) {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Cyan)
            };
            crumb_spans.push(Span::styled(crumb.label.clone(), style));
        }
        f.render_widget(Paragraph::new(Line::from(crumb_spans)), chunks[1]);

        let items: Vec<ListItem> = pane
            .entries
            .iter()
            .map(|entry| {
                let icon = if entry.is_dir { "DIR " } else { "FILE" };
                let size = entry.size.map(format_size).unwrap_or_default();
                let modified = entry.modified.as_deref().map(format_time).unwrap_or_default();
                let name_style = if entry.is_dir {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", icon), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("{:<48}", entry.name), name_style),
                    Span::styled(format!("{:>10}  ", size), Style::default().fg(Color::Gray)),
                    Span::styled(modified, Style::default().fg(Color::Gray)),
                ]))
            })
            .collect();

        let title = format!(
            "{} | Enter: open | -: up | c: crumbs | a: actions | Tab: switch | r: refresh",
            mode.display_name()
        );
        let list = List::new(items)
            .block(Block::default().borders(Borders::TOP).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");

        let state = match mode {
            Mode::Auto => &mut self.auto_list_state,
            Mode::Manual => &mut self.manual_list_state,
        };
        f.render_stateful_widget(list, chunks[2], state);
    }

    fn render_json(
        &self,
        f: &mut Frame,
        area: Rect,
        title: &str,
        value: Option<&serde_json::Value>,
        empty: &str,
    ) {
        let text = value
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| empty.to_string());
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_import(&self, f: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from("Imports are queued and reviewed on the server."),
            Line::from("Finished imports show up in the Library page."),
        ])
        .block(Block::default().borders(Borders::ALL).title("Import (3)"));
        f.render_widget(paragraph, area);
    }

    fn render_settings(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(10)])
            .split(area);

        self.render_json(
            f,
            chunks[0],
            "Settings (4) | r: reload | R: restart | Z: reset DB",
            self.coord.data().settings.as_ref(),
            "Settings not loaded",
        );

        let items: Vec<ListItem> = self
            .coord
            .data()
            .backups
            .iter()
            .map(|b| {
                let cfg = if b.config_present { " +config" } else { "" };
                let time = b.time.as_deref().map(format_time).unwrap_or_default();
                ListItem::new(format!("{}{} ({})", b.name, cfg, time))
            })
            .collect();
        let data = self.coord.data();
        let title = format!(
            "Backups | b: run | j/k: select | restore a: DB+config, d: DB, c: config | {}",
            data.backup_status
        );
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");
        let mut state = ListState::default();
        if !data.backups.is_empty() {
            state.select(Some(data.selected_backup));
        }
        f.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status = match self.coord.page() {
            Page::Library => self.coord.library().pane(self.coord.tab()).status.as_str(),
            _ => self.coord.data().status.as_str(),
        };
        let help_text = match self.focus {
            Focus::Crumbs(_) => "←→: pick crumb | Enter: go | Esc: back",
            Focus::List => "q: quit | 1-5: pages | ?: help",
        };

        let status_line = if status.is_empty() {
            Line::from(vec![Span::styled(help_text, Style::default().fg(Color::Gray))])
        } else {
            Line::from(vec![
                Span::styled(status, Style::default().fg(Color::Yellow)),
                Span::raw(" | "),
                Span::styled(help_text, Style::default().fg(Color::Gray)),
            ])
        };
        f.render_widget(Paragraph::new(vec![status_line]), area);
    }

    fn render_dialog(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 40, area);
        let dim = Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC);
        let mut lines = vec![Line::from("")];
        let title = match self.coord.library().actions().dialog() {
            Dialog::Idle => return,
            Dialog::MenuShown {
                entry,
                choices,
                input,
                ..
            } => {
                lines.push(Line::from(vec![Span::styled(
                    entry.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )]));
                lines.push(Line::from(""));
                for (i, kind) in choices.iter().enumerate() {
                    lines.push(Line::from(format!("  {} = {}", i + 1, kind.label())));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(format!("Choice: {}█", input)));
                lines.push(Line::from(vec![Span::styled(
                    "Enter: choose | Esc: cancel",
                    dim,
                )]));
                "Action"
            }
            Dialog::Prompting { action, input } => {
                let prompt = action.kind.input_prompt().unwrap_or("Value");
                lines.push(Line::from(format!("{}: {}█", prompt, input)));
                lines.push(Line::from(""));
                lines.push(Line::from(vec![Span::styled(
                    "Enter: continue | Esc: cancel",
                    dim,
                )]));
                action.kind.label()
            }
            Dialog::Confirming { action } => {
                let warn = if action.kind.requires_keyword() {
                    Color::Red
                } else {
                    Color::Yellow
                };
                lines.push(Line::from(vec![Span::styled(
                    action.kind.question(),
                    Style::default().fg(warn).add_modifier(Modifier::BOLD),
                )]));
                lines.push(Line::from(format!("  {}", action.entry.name)));
                if let Some(input) = &action.input {
                    lines.push(Line::from(format!("  -> {}", input)));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(vec![Span::styled("y: confirm | n/Esc: cancel", dim)]));
                "Confirm"
            }
            Dialog::TypedConfirmPending { input, .. } => {
                lines.push(Line::from(vec![Span::styled(
                    format!("Type {} to confirm", CONFIRM_KEYWORD),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )]));
                lines.push(Line::from(format!("> {}█", input)));
                lines.push(Line::from(""));
                lines.push(Line::from(vec![Span::styled(
                    "Enter: confirm | Esc: cancel",
                    dim,
                )]));
                "Full delete"
            }
            Dialog::Executing { action } => {
                lines.push(Line::from(format!("{}...", action.kind.label())));
                "Working"
            }
        };

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let heading = Style::default().fg(Color::Yellow);
        let help_text = vec![
            Line::from(vec![Span::styled(
                "Librarian - Keyboard Shortcuts",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled("Pages:", heading)]),
            Line::from("  1-5         Library, Upload, Import, Settings, Logs"),
            Line::from(""),
            Line::from(vec![Span::styled("Library:", heading)]),
            Line::from("  Tab         Switch Auto / Manual"),
            Line::from("  j/k ↑/↓     Move selection"),
            Line::from("  gg / G      Jump to top / bottom"),
            Line::from("  Enter/l     Open folder"),
            Line::from("  -/h/Bksp    Go up"),
            Line::from("  c           Pick a breadcrumb"),
            Line::from("  a/x         Actions on selected row"),
            Line::from("  r           Refresh"),
            Line::from(""),
            Line::from(vec![Span::styled("Settings:", heading)]),
            Line::from("  b           Run backup"),
            Line::from("  j/k         Select backup"),
            Line::from("  a / d / c   Restore DB+config / DB / config"),
            Line::from("  R           Restart server"),
            Line::from("  Z           Reset database"),
            Line::from(""),
            Line::from("  q           Quit"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Press any key to close",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )]),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help (?)"))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }
}

/// Yes/no overlay: question lines in red, then the key hint.
fn render_confirm(f: &mut Frame, area: Rect, title: &str, question: &[&str]) {
    let area = centered_rect(50, 30, area);
    let mut lines = vec![Line::from("")];
    for text in question {
        lines.push(Line::from(vec![Span::styled(
            text.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![Span::styled(
        "Press Y to confirm, any other key to cancel",
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    )]));
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// Rect of `percent_x` by `percent_y` centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryBackend, Op};
    use crate::browser::Library;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(key(code)).await
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c)).await;
        }
    }

    async fn create_test_app(backend: Arc<MemoryBackend>) -> App {
        let library = Library::new(backend, "/mount/library-auto", "/host/mount/library-auto");
        let coord = ViewCoordinator::new(library, Mode::Auto, Duration::from_millis(50));
        let mut app = App::new(coord);
        app.coord.start().await;
        app.clamp_selection();
        app
    }

    fn names(app: &App, mode: Mode) -> Vec<String> {
        app.coordinator()
            .library()
            .pane(mode)
            .entries
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_open_and_go_up() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend).await;
        assert_eq!(names(&app, Mode::Auto), vec!["Movies", "README.txt", "Shows"]);

        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.coordinator().library().paths().auto_path(), "/lib/Movies");
        assert_eq!(app.auto_list_state.selected(), Some(0));

        press(&mut app, KeyCode::Char('-')).await;
        assert_eq!(app.coordinator().library().paths().auto_path(), "/lib");

        // already at root
        press(&mut app, KeyCode::Char('-')).await;
        assert_eq!(app.coordinator().library().paths().auto_path(), "/lib");
    }

    #[tokio::test]
    async fn test_crumb_navigation() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend).await;
        // Shows/Dark/Season 01
        press(&mut app, KeyCode::Char('G')).await;
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(
            app.coordinator().library().paths().auto_path(),
            "/lib/Shows/Dark/Season 01"
        );

        press(&mut app, KeyCode::Char('c')).await;
        assert_eq!(app.focus(), Focus::Crumbs(3));
        press(&mut app, KeyCode::Left).await;
        press(&mut app, KeyCode::Left).await;
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.focus(), Focus::List);
        assert_eq!(app.coordinator().library().paths().auto_path(), "/lib/Shows");
    }

    #[tokio::test]
    async fn test_full_delete_flow_from_keys() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend.clone()).await;
        press(&mut app, KeyCode::Tab).await;
        assert_eq!(app.coordinator().tab(), Mode::Manual);

        // favs -> scifi -> Arrival
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(names(&app, Mode::Manual), vec!["Arrival"]);

        press(&mut app, KeyCode::Char('a')).await;
        type_text(&mut app, "5").await;
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Char('y')).await;
        type_text(&mut app, "borrar").await;
        press(&mut app, KeyCode::Enter).await;
        assert!(app.coordinator().library().actions().is_idle());
        assert_eq!(backend.calls(Op::CatalogDeleteFull), 0);

        press(&mut app, KeyCode::Char('a')).await;
        type_text(&mut app, "5").await;
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Char('y')).await;
        type_text(&mut app, "BORRAR").await;
        press(&mut app, KeyCode::Enter).await;

        assert_eq!(backend.calls(Op::CatalogDeleteFull), 1);
        assert_eq!(backend.trashed(), vec!["imp-arrival".to_string()]);
        assert!(names(&app, Mode::Manual).is_empty());
        assert_eq!(app.manual_list_state.selected(), None);
    }

    #[tokio::test]
    async fn test_escape_cancels_dialog() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend.clone()).await;
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Char('a')).await;
        assert!(!app.coordinator().library().actions().is_idle());
        // 'q' is typed into the menu, not treated as quit
        assert!(press(&mut app, KeyCode::Char('q')).await);
        press(&mut app, KeyCode::Esc).await;
        assert!(app.coordinator().library().actions().is_idle());
        assert!(!press(&mut app, KeyCode::Char('q')).await);
    }

    #[tokio::test]
    async fn test_restart_needs_confirmation() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend.clone()).await;
        press(&mut app, KeyCode::Char('4')).await;
        assert_eq!(app.coordinator().page(), Page::Settings);

        press(&mut app, KeyCode::Char('R')).await;
        assert_eq!(app.overlay(), Overlay::ConfirmRestart);
        press(&mut app, KeyCode::Char('n')).await;
        assert_eq!(backend.restarts(), 0);

        press(&mut app, KeyCode::Char('R')).await;
        press(&mut app, KeyCode::Char('y')).await;
        assert_eq!(backend.restarts(), 1);
    }

    #[tokio::test]
    async fn test_restore_and_db_reset_need_confirmation() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend.clone()).await;
        press(&mut app, KeyCode::Char('4')).await;

        press(&mut app, KeyCode::Char('d')).await;
        assert_eq!(app.overlay(), Overlay::ConfirmRestore(RestoreMode::DatabaseOnly));
        press(&mut app, KeyCode::Esc).await;
        assert!(backend.restores().is_empty());

        press(&mut app, KeyCode::Char('c')).await;
        press(&mut app, KeyCode::Char('y')).await;
        assert_eq!(
            backend.restores(),
            vec![("backup-2024-05-01".to_string(), RestoreMode::ConfigOnly)]
        );
        assert_eq!(app.overlay(), Overlay::None);

        press(&mut app, KeyCode::Char('Z')).await;
        assert_eq!(app.overlay(), Overlay::ConfirmDbReset);
        press(&mut app, KeyCode::Char('n')).await;
        assert_eq!(backend.db_resets(), 0);

        press(&mut app, KeyCode::Char('Z')).await;
        press(&mut app, KeyCode::Char('Y')).await;
        assert_eq!(backend.db_resets(), 1);
        assert_eq!(app.coordinator().data().status, "Restarting...");
    }

    #[tokio::test]
    async fn test_restore_not_offered_without_backups() {
        let backend = Arc::new(MemoryBackend::new("/lib"));
        let mut app = create_test_app(backend.clone()).await;
        press(&mut app, KeyCode::Char('4')).await;

        press(&mut app, KeyCode::Char('a')).await;
        assert_eq!(app.overlay(), Overlay::None);
        assert_eq!(backend.calls(Op::RestoreBackup), 0);
    }

    #[tokio::test]
    async fn test_render_library_and_dialog() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut app = create_test_app(backend).await;
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Char('j')).await;
        press(&mut app, KeyCode::Char('a')).await;

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Favourites"));
        assert!(screen.contains("Remove from this view"));
        assert!(screen.contains("OK (1 dirs, 1 items)"));
    }
}
