//! Run overview: quartile boundaries, action tally and the most populated
//! segments. Also renders the same content as plain text for the
//! non-interactive summary mode.

use std::fmt::Write as _;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use rfv_core::formatting::{format_amount, format_number, percentage};
use rfv_core::models::Metric;
use rfv_data::analysis::RfvReport;

use crate::histogram_view::text_bars;
use crate::table_view::truncate_to_width;
use crate::themes::Theme;

const NO_ACTION: &str = "(no action)";

fn action_label(action: Option<&str>) -> &str {
    action.unwrap_or(NO_ACTION)
}

fn share(part: u64, report: &RfvReport) -> String {
    format!(
        "{:.1}%",
        percentage(part as f64, report.customers.len() as f64, 1)
    )
}

// ── Interactive ───────────────────────────────────────────────────────────────

pub fn render_summary(frame: &mut Frame, area: Rect, report: &RfvReport, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Min(4),
        ])
        .split(area);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    render_overview(frame, rows[0], report, theme);
    render_quartiles(frame, middle[0], report, theme);
    render_action_tally(frame, middle[1], report, theme);
    render_segments(frame, rows[2], report, theme);
}

fn render_overview(frame: &mut Frame, area: Rect, report: &RfvReport, theme: &Theme) {
    let meta = &report.metadata;
    let line = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<22}"), theme.label),
            Span::styled(value, theme.value),
        ])
    };
    let text = vec![
        line(
            "Reference date",
            report.reference_date.format("%Y-%m-%d").to_string(),
        ),
        line(
            "Transactions",
            format_number(meta.transactions_processed as f64, 0),
        ),
        line(
            "Customers / scores",
            format!(
                "{} / {}",
                format_number(meta.customers as f64, 0),
                meta.distinct_scores
            ),
        ),
    ];
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Overview "),
        ),
        area,
    );
}

fn render_quartiles(frame: &mut Frame, area: Rect, report: &RfvReport, theme: &Theme) {
    let header = Row::new(
        ["Metric", "Q25", "Q50", "Q75"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );
    let rows: Vec<Row> = Metric::ALL
        .iter()
        .map(|&m| {
            let b = report.quartiles.boundaries(m);
            Row::new(vec![
                Cell::from(m.label()),
                Cell::from(format_number(b.q25, 2)),
                Cell::from(format_number(b.q50, 2)),
                Cell::from(format_number(b.q75, 2)),
            ])
            .style(theme.table_row)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Min(8),
            Constraint::Min(8),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.table_border)
            .title(" Quartiles "),
    );
    frame.render_widget(table, area);
}

fn render_action_tally(frame: &mut Frame, area: Rect, report: &RfvReport, theme: &Theme) {
    let text_width = area.width.saturating_sub(20) as usize;
    let header = Row::new(
        ["Customers", "Share", "Action"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );
    let rows: Vec<Row> = report
        .action_counts
        .iter()
        .map(|a| {
            let style = if a.action.is_some() {
                theme.action
            } else {
                theme.dim
            };
            Row::new(vec![
                Cell::from(format_number(a.customers as f64, 0)),
                Cell::from(share(a.customers, report)),
                Cell::from(truncate_to_width(
                    action_label(a.action.as_deref()),
                    text_width,
                ))
                .style(style),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.table_border)
            .title(" Actions "),
    );
    frame.render_widget(table, area);
}

fn render_segments(frame: &mut Frame, area: Rect, report: &RfvReport, theme: &Theme) {
    let capacity = area.height.saturating_sub(3) as usize;
    let header = Row::new(
        ["Score", "Customers", "Share", "Action"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );
    let text_width = area.width.saturating_sub(28) as usize;
    let rows: Vec<Row> = report
        .segment_counts
        .iter()
        .take(capacity)
        .enumerate()
        .map(|(i, s)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(s.score.clone()).style(theme.bold),
                Cell::from(format_number(s.customers as f64, 0)),
                Cell::from(share(s.customers, report)),
                Cell::from(truncate_to_width(
                    action_label(s.action.as_deref()),
                    text_width,
                )),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.table_border)
            .title(format!(" Segments ({}) ", report.segment_counts.len())),
    );
    frame.render_widget(table, area);
}

// ── Plain text ────────────────────────────────────────────────────────────────

/// Multi-section plain-text report for `--view summary`.
pub fn summary_text(report: &RfvReport) -> String {
    let meta = &report.metadata;
    let mut out = String::new();

    let _ = writeln!(out, "RFV segmentation");
    let _ = writeln!(
        out,
        "  reference date {}, {} transactions, {} customers, {} distinct scores",
        report.reference_date.format("%Y-%m-%d"),
        meta.transactions_processed,
        meta.customers,
        meta.distinct_scores
    );

    let _ = writeln!(out, "\nQuartiles");
    let _ = writeln!(out, "  {:<10} {:>12} {:>12} {:>12}", "metric", "q25", "q50", "q75");
    for metric in Metric::ALL {
        let b = report.quartiles.boundaries(metric);
        let _ = writeln!(
            out,
            "  {:<10} {:>12} {:>12} {:>12}",
            metric.label(),
            format_number(b.q25, 2),
            format_number(b.q50, 2),
            format_number(b.q75, 2)
        );
    }

    let _ = writeln!(out, "\nActions");
    for a in &report.action_counts {
        let _ = writeln!(
            out,
            "  {:>8} {:>6}  {}",
            a.customers,
            share(a.customers, report),
            action_label(a.action.as_deref())
        );
    }

    let _ = writeln!(out, "\nSegments");
    for s in &report.segment_counts {
        let _ = writeln!(
            out,
            "  {}  {:>8} {:>6}",
            s.score,
            s.customers,
            share(s.customers, report)
        );
    }

    let revenue: f64 = report.customers.iter().map(|c| c.metrics.value).sum();
    let _ = writeln!(out, "\nTotal value  {}", format_amount(revenue));

    for histogram in &report.histograms {
        let _ = writeln!(out, "\n{} distribution", histogram.metric.label());
        for line in text_bars(histogram, 40) {
            let _ = writeln!(out, "  {line}");
        }
    }

    out
}
