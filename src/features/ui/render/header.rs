use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::super::state::DashboardState;
use super::format::truncate_string;

pub(in crate::features::ui) fn draw_header(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &DashboardState,
) {
    let mut spans = vec![
        Span::styled(
            " sitewatch ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
    ];

    if let Some(page) = &state.page {
        let (status, color) = if page.is_down {
            ("DOWN", Color::Red)
        } else {
            ("UP", Color::Green)
        };
        spans.extend([
            Span::styled(
                truncate_string(&page.url, 60),
                Style::default().fg(Color::White),
            ),
            Span::raw(" │ "),
            Span::styled(
                status,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" │ "),
        ]);
    }

    spans.push(Span::styled("Page", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
        format!(" {}/{} ", state.current + 1, state.page_count().max(1)),
        Style::default().fg(Color::Yellow),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

pub(in crate::features::ui) fn draw_footer(
    frame: &mut ratatui::Frame,
    area: Rect,
    last_error: Option<&str>,
) {
    let hints = [("←/→", "Page"), ("q", "Quit")];

    let mut spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            vec![
                Span::styled(format!(" {key} "), Style::default().fg(Color::Yellow)),
                Span::styled(format!("{action} "), Style::default().fg(Color::Gray)),
            ]
        })
        .collect();
    if let Some(error) = last_error {
        spans.push(Span::styled(
            format!(" ⚠ {}", truncate_string(error, 80)),
            Style::default().fg(Color::Red),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(footer, area);
}
