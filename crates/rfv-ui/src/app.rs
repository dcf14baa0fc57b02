//! Application state and TUI event loop.
//!
//! [`App`] owns the theme, the finished [`RfvReport`] and the navigation state
//! (active tab, scroll offset). The report is immutable: the loop only reacts
//! to keys and redraws.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};

use rfv_data::analysis::RfvReport;
use rfv_data::cache::ExportCache;
use rfv_data::export::ExportDestination;

use crate::themes::Theme;
use crate::{histogram_view, summary_view, table_view};

// ── Tab ───────────────────────────────────────────────────────────────────────

/// Which view the TUI is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Customers,
    Histograms,
    Summary,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Customers, Tab::Histograms, Tab::Summary];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Customers => "1 Customers",
            Tab::Histograms => "2 Histograms",
            Tab::Summary => "3 Summary",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Customers => 0,
            Tab::Histograms => 1,
            Tab::Summary => 2,
        }
    }

    pub fn next(&self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn previous(&self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the segmentation TUI.
pub struct App {
    pub theme: Theme,
    pub tab: Tab,
    /// First customer row shown in the table.
    pub scroll: usize,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
    /// Last save result shown in the footer.
    pub status: Option<String>,
    report: RfvReport,
    /// Customer rows visible at the last draw; drives paging.
    page: usize,
    destination: ExportDestination,
    cache: ExportCache,
}

impl App {
    pub fn new(theme_name: &str, tab: Tab, report: RfvReport) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            tab,
            scroll: 0,
            should_quit: false,
            status: None,
            report,
            page: 20,
            destination: ExportDestination::none(),
            cache: ExportCache::new(),
        }
    }

    /// Enable saving with `s`. `cache` may already hold the rendered table.
    pub fn with_export(mut self, destination: ExportDestination, cache: ExportCache) -> Self {
        self.destination = destination;
        self.cache = cache;
        self
    }

    pub fn report(&self) -> &RfvReport {
        &self.report
    }

    /// Take over the terminal until the user quits.
    ///
    /// Uses `crossterm::event::poll` with a 250 ms timeout. Exits on `q`,
    /// `Q`, `Esc` or `Ctrl+C`; the terminal is restored on every exit path.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }
            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            if self.should_quit {
                break Ok(());
            }
        };

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press to the navigation state.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.previous(),
            KeyCode::Char('1') => self.tab = Tab::Customers,
            KeyCode::Char('2') => self.tab = Tab::Histograms,
            KeyCode::Char('3') => self.tab = Tab::Summary,
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(self.page as isize),
            KeyCode::PageUp => self.scroll_by(-(self.page as isize)),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = self.max_scroll(),
            KeyCode::Char('s') => self.save_export(),
            _ => {}
        }
    }

    /// Write the graded table to the configured destination, reusing the
    /// cached buffer when the table was rendered before.
    pub fn save_export(&mut self) {
        let Some(format) = self.destination.format() else {
            self.status = Some("No output path configured (use --output)".to_string());
            return;
        };
        let written = self
            .cache
            .get_or_render(&self.report.customers, format)
            .and_then(|bytes| self.destination.write_bytes(bytes));
        self.status = Some(match written {
            Ok(Some(path)) => format!(
                "Saved {} ({}, {} customers)",
                path.display(),
                format.extension(),
                self.report.customers.len()
            ),
            Ok(None) => "Nothing written".to_string(),
            Err(e) => format!("Save failed: {e}"),
        });
    }

    fn max_scroll(&self) -> usize {
        self.report.customers.len().saturating_sub(self.page)
    }

    fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll as isize + delta;
        self.scroll = target.clamp(0, self.max_scroll() as isize) as usize;
    }

    /// Render the current state into `frame`.
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .style(self.theme.tab_inactive)
            .highlight_style(self.theme.tab_active)
            .divider(Span::styled("|", self.theme.separator));
        frame.render_widget(tabs, chunks[0]);

        let body = chunks[1];
        match self.tab {
            Tab::Customers => {
                self.page = table_view::visible_rows(body).max(1);
                self.scroll = self.scroll.min(self.max_scroll());
                if self.report.customers.is_empty() {
                    table_view::render_no_data(frame, body, &self.theme);
                } else {
                    table_view::render_customer_table(
                        frame,
                        body,
                        &self.report.customers,
                        self.scroll,
                        &self.theme,
                    );
                }
            }
            Tab::Histograms => {
                histogram_view::render_histograms(frame, body, &self.report.histograms, &self.theme)
            }
            Tab::Summary => summary_view::render_summary(frame, body, &self.report, &self.theme),
        }

        let mut footer = vec![
            Span::styled("Tab/1-3", self.theme.bold),
            Span::styled(" switch  ", self.theme.dim),
            Span::styled("↑↓ PgUp PgDn", self.theme.bold),
            Span::styled(" scroll  ", self.theme.dim),
            Span::styled("s", self.theme.bold),
            Span::styled(" save  ", self.theme.dim),
            Span::styled("q", self.theme.bold),
            Span::styled(" quit", self.theme.dim),
        ];
        if let Some(status) = &self.status {
            footer.push(Span::styled(format!("   {status}"), self.theme.info));
        }
        let help = Paragraph::new(Line::from(footer));
        frame.render_widget(help, chunks[2]);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
