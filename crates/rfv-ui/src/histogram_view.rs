//! Per-metric distribution charts.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
    Frame,
};

use rfv_core::formatting::format_compact;
use rfv_core::histogram::Histogram;

use crate::themes::Theme;

fn bar_width(area: Rect, bins: usize) -> u16 {
    if bins == 0 {
        return 1;
    }
    let inner = area.width.saturating_sub(2) as usize;
    (inner / bins).saturating_sub(1).max(1) as u16
}

/// Draw one histogram as a vertical bar chart labelled with bin lower edges.
pub fn render_histogram(frame: &mut Frame, area: Rect, histogram: &Histogram, theme: &Theme) {
    let bars: Vec<Bar> = histogram
        .bins
        .iter()
        .map(|bin| {
            Bar::default()
                .value(bin.count)
                .text_value(bin.count.to_string())
                .label(Line::from(format_compact(bin.lower)))
        })
        .collect();

    let title = format!(
        " {} · {} customers · {} bins ",
        histogram.metric.label(),
        histogram.total(),
        histogram.bins.len()
    );

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(title)
                .title_style(theme.header),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width(area, bars.len()))
        .bar_gap(1)
        .bar_style(theme.bar)
        .value_style(theme.bar_value)
        .label_style(theme.axis_label);

    frame.render_widget(chart, area);
}

/// Stack the histograms vertically in `area`, one equal slice each.
pub fn render_histograms(frame: &mut Frame, area: Rect, histograms: &[Histogram], theme: &Theme) {
    if histograms.is_empty() {
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Ratio(1, histograms.len() as u32);
            histograms.len()
        ])
        .split(area);

    for (histogram, chunk) in histograms.iter().zip(chunks.iter()) {
        render_histogram(frame, *chunk, histogram, theme);
    }
}

/// Plain-text rendering for non-interactive output: one line per bin with a
/// `#` bar scaled so the fullest bin is `max_bar` characters wide.
pub fn text_bars(histogram: &Histogram, max_bar: usize) -> Vec<String> {
    let peak = histogram.max_count();
    histogram
        .bins
        .iter()
        .map(|bin| {
            let len = if peak == 0 {
                0
            } else {
                (bin.count as f64 / peak as f64 * max_bar as f64).round() as usize
            };
            format!(
                "{:>10} - {:<10} {:>6} {}",
                format_compact(bin.lower),
                format_compact(bin.upper),
                bin.count,
                "#".repeat(len)
            )
        })
        .collect()
}
