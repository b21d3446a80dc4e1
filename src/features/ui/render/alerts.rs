use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::super::state::PageView;
use super::format::format_alert;

/// Newest alerts first.
pub(in crate::features::ui) fn draw_alerts(
    frame: &mut ratatui::Frame,
    area: Rect,
    page: &PageView,
) {
    let rule = &page.alert_rule;
    let title = format!(
        " Alerts (aggregated over {}, refreshed every {}s, threshold {:.0}%) ",
        rule.timespan,
        rule.frequency,
        rule.threshold * 100.0
    );

    let lines: Vec<Line> = if page.alerts.is_empty() {
        vec![Line::styled("no alerts", Style::default().fg(Color::DarkGray))]
    } else {
        page.alerts
            .iter()
            .rev()
            .map(|alert| {
                let color = if alert.is_down { Color::Red } else { Color::Green };
                Line::styled(format_alert(alert), Style::default().fg(color))
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(paragraph, area);
}
