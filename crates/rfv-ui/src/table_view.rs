//! Graded customer table for the segmentation TUI.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per customer,
//! grade cells coloured by quartile, and a totals row at the bottom. Only the
//! window starting at `scroll` is drawn.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use rfv_core::formatting;
use rfv_core::models::{Grade, GradedCustomer};

use crate::themes::Theme;

/// Rows taken by the border, header and totals line.
const CHROME_ROWS: u16 = 4;

/// Number of customer rows that fit in `area`.
pub fn visible_rows(area: Rect) -> usize {
    area.height.saturating_sub(CHROME_ROWS) as usize
}

/// Cut `s` to at most `max_width` display columns, marking the cut with `…`.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn grade_cell(grade: Grade, theme: &Theme) -> Cell<'static> {
    Cell::from(grade.to_string()).style(theme.grade_style(grade))
}

/// Render the customer table into `area`, starting at row `scroll`.
pub fn render_customer_table(
    frame: &mut Frame,
    area: Rect,
    customers: &[GradedCustomer],
    scroll: usize,
    theme: &Theme,
) {
    let header_cells = [
        "Customer", "Recency", "Frequency", "Value", "R", "F", "V", "Score", "Action",
    ]
    .iter()
    .map(|h| Cell::from(*h).style(theme.table_header));
    let header = Row::new(header_cells).height(1);

    let fixed_width: u16 = 14 + 9 + 10 + 14 + 3 * 2 + 6 + 9 + 2;
    let action_width = area.width.saturating_sub(fixed_width).max(10) as usize;

    let visible = visible_rows(area);
    let start = scroll.min(customers.len().saturating_sub(visible));
    let end = (start + visible).min(customers.len());

    let mut rows: Vec<Row> = customers[start..end]
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let style = if (start + i) % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            let grades = [c.grades.recency, c.grades.frequency, c.grades.value];
            let action = match &c.action {
                Some(text) => Cell::from(truncate_to_width(text, action_width)).style(theme.action),
                None => Cell::from("-").style(theme.dim),
            };
            Row::new(vec![
                Cell::from(truncate_to_width(c.customer_id(), 14)),
                Cell::from(formatting::format_number(c.metrics.recency as f64, 0)),
                Cell::from(formatting::format_number(c.metrics.frequency as f64, 0)),
                Cell::from(formatting::format_amount(c.metrics.value)),
                grade_cell(c.grades.recency, theme),
                grade_cell(c.grades.frequency, theme),
                grade_cell(c.grades.value, theme),
                Cell::from(c.score.clone()).style(theme.score_style(&grades)),
                action,
            ])
            .style(style)
        })
        .collect();

    let purchases: u64 = customers.iter().map(|c| c.metrics.frequency).sum();
    let revenue: f64 = customers.iter().map(|c| c.metrics.value).sum();
    let with_action = customers.iter().filter(|c| c.action.is_some()).count();
    rows.push(
        Row::new(vec![
            Cell::from("TOTAL"),
            Cell::from(format!("{} cust.", customers.len())),
            Cell::from(formatting::format_number(purchases as f64, 0)),
            Cell::from(formatting::format_amount(revenue)),
            Cell::from(""),
            Cell::from(""),
            Cell::from(""),
            Cell::from(""),
            Cell::from(format!("{} with an action", with_action)),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(14),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(6),
        Constraint::Min(10),
    ];

    let title = if customers.is_empty() {
        " Customers ".to_string()
    } else {
        format!(" Customers {}-{} of {} ", start + 1, end, customers.len())
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(title),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render a placeholder when there is nothing to show.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No customers to segment", theme.warning)),
        Line::from(""),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text))
            .block(Block::default().borders(Borders::ALL).title(" RFV Segments ")),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use rfv_core::models::{CustomerMetrics, RfvGrades};

    fn make_customers(n: usize) -> Vec<GradedCustomer> {
        (0..n)
            .map(|i| {
                let score = ["AAA", "ABC", "DDD", "CAA"][i % 4];
                GradedCustomer::new(
                    CustomerMetrics {
                        customer_id: format!("C{:03}", i),
                        recency: i as i64 * 3,
                        frequency: (n - i) as u64,
                        value: 100.0 * (n - i) as f64,
                    },
                    RfvGrades::parse_score(score).unwrap(),
                    (score != "ABC").then(|| format!("Action for {score}")),
                )
            })
            .collect()
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_to_width("a longer action text", 8), "a longe…");
        assert_eq!(truncate_to_width("anything", 0), "");
        // Wide characters count double.
        assert_eq!(truncate_to_width("顧客顧客顧客", 5), "顧客…");
    }

    #[test]
    fn test_visible_rows() {
        assert_eq!(visible_rows(Rect::new(0, 0, 80, 24)), 20);
        assert_eq!(visible_rows(Rect::new(0, 0, 80, 2)), 0);
    }

    #[test]
    fn test_render_shows_scores_and_totals() {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        let theme = Theme::dark();
        let customers = make_customers(4);

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_customer_table(frame, area, &customers, 0, &theme);
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("C000"));
        assert!(text.contains("AAA"));
        assert!(text.contains("TOTAL"));
        assert!(text.contains("Customers 1-4 of 4"));
    }

    #[test]
    fn test_render_scrolled_window() {
        let mut terminal = Terminal::new(TestBackend::new(120, 14)).unwrap();
        let theme = Theme::light();
        let customers = make_customers(50);

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_customer_table(frame, area, &customers, 30, &theme);
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("C030"));
        assert!(!text.contains("C000"));
        assert!(text.contains("Customers 31-40 of 50"));
    }

    #[test]
    fn test_render_scroll_past_end_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        let customers = make_customers(3);
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_customer_table(frame, area, &customers, 99, &Theme::classic());
            })
            .unwrap();
        assert!(buffer_text(&terminal).contains("Customers 1-3 of 3"));
    }

    #[test]
    fn test_render_no_data_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_no_data(frame, area, &Theme::dark());
            })
            .unwrap();
        assert!(buffer_text(&terminal).contains("No customers to segment"));
    }
}
