use crate::metrics::{Breakdown, Metric, Phase};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, Gauge, GraphType,
    Paragraph, Row, Table,
};

use super::super::state::SideView;
use super::format::{
    code_bars, color_for_availability, error_lines, format_duration, history_points,
};

fn bordered(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

pub(in crate::features::ui) fn draw_side(
    frame: &mut ratatui::Frame,
    area: Rect,
    side: &SideView,
    color: Color,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(3), // Availability
            Constraint::Length(5), // Breakdown
            Constraint::Min(7),    // Response codes
            Constraint::Length(8), // Response time history
            Constraint::Length(6), // Errors
        ])
        .split(area);

    let title = format!(
        " Aggregated over {} (refreshed every {}s)",
        side.rule.timespan, side.rule.frequency
    );
    frame.render_widget(
        Paragraph::new(title).style(Style::default().add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let empty = Metric::empty();
    let metric = side.snapshot.as_ref().map_or(&empty, |s| &s.metric);
    let history = side
        .snapshot
        .as_ref()
        .map_or(&[][..], |s| s.response_history.as_slice());

    draw_availability(frame, chunks[1], metric, color);
    draw_breakdown(frame, chunks[2], metric, color);
    draw_codes(frame, chunks[3], metric, color);
    draw_history(frame, chunks[4], history, color);
    draw_errors(frame, chunks[5], metric, color);
}

fn draw_availability(frame: &mut ratatui::Frame, area: Rect, metric: &Metric, color: Color) {
    let gauge = Gauge::default().block(bordered("Availability", color));
    let gauge = match metric.availability {
        Some(availability) => gauge
            .gauge_style(Style::default().fg(color_for_availability(availability)))
            .ratio(availability.clamp(0.0, 1.0))
            .label(format!("{:.1}%", availability * 100.0)),
        None => gauge
            .gauge_style(Style::default().fg(Color::DarkGray))
            .ratio(0.0)
            .label("no data"),
    };
    frame.render_widget(gauge, area);
}

fn breakdown_row(label: &'static str, breakdown: &Breakdown, has_data: bool) -> Row<'static> {
    let cells = std::iter::once(Cell::from(label)).chain(Phase::iter_all().iter().map(|phase| {
        if has_data {
            Cell::from(format_duration(breakdown.get(*phase)))
        } else {
            Cell::from("-")
        }
    }));
    Row::new(cells)
}

fn draw_breakdown(frame: &mut ratatui::Frame, area: Rect, metric: &Metric, color: Color) {
    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(Phase::iter_all().iter().map(|phase| Cell::from(phase.label()))),
    )
    .style(Style::default().fg(Color::Gray));
    let rows = vec![
        breakdown_row("Avg", &metric.average, metric.has_data()),
        breakdown_row("Max", &metric.max, metric.has_data()),
    ];
    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(4))
        .chain(Phase::iter_all().iter().map(|_| Constraint::Min(6)))
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(bordered("Request breakdown", color));
    frame.render_widget(table, area);
}

fn draw_codes(frame: &mut ratatui::Frame, area: Rect, metric: &Metric, color: Color) {
    let bars: Vec<Bar> = code_bars(metric)
        .into_iter()
        .map(|(label, value)| {
            let bar_color = match label.as_bytes().first() {
                Some(b'2') | Some(b'3') => Color::Green,
                Some(b'4') => Color::Yellow,
                _ => Color::Red,
            };
            Bar::default()
                .value(value)
                .label(Line::from(label))
                .style(Style::default().fg(bar_color))
        })
        .collect();

    let chart = BarChart::default()
        .block(bordered("Response code counts", color))
        .bar_width(5)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn draw_history(frame: &mut ratatui::Frame, area: Rect, history: &[std::time::Duration], color: Color) {
    let points = history_points(history);
    let max_y = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::max);
    let max_y = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };
    let max_x = (points.len().saturating_sub(1)).max(1) as f64;

    let dataset = Dataset::default()
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(bordered("Average response time", color))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_x]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_y])
                .labels(vec![
                    Span::raw("0ms"),
                    Span::raw(format!("{:.0}ms", max_y)),
                ]),
        );
    frame.render_widget(chart, area);
}

fn draw_errors(frame: &mut ratatui::Frame, area: Rect, metric: &Metric, color: Color) {
    let lines: Vec<Line> = if metric.error_counts.is_empty() {
        vec![Line::styled("no errors", Style::default().fg(Color::DarkGray))]
    } else {
        error_lines(metric)
            .into_iter()
            .map(|line| Line::styled(line, Style::default().fg(Color::Red)))
            .collect()
    };
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(bordered("Latest errors", color));
    frame.render_widget(paragraph, area);
}
