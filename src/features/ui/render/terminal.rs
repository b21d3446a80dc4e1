use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::super::state::{MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH};

/// One hint per dimension that is below the dashboard minimum.
fn shortfall(width: u16, height: u16) -> Vec<String> {
    let mut hints = Vec::new();
    if width < MIN_TERMINAL_WIDTH {
        hints.push(format!(
            "widen by {} columns ({width} of {MIN_TERMINAL_WIDTH})",
            MIN_TERMINAL_WIDTH - width
        ));
    }
    if height < MIN_TERMINAL_HEIGHT {
        hints.push(format!(
            "heighten by {} rows ({height} of {MIN_TERMINAL_HEIGHT})",
            MIN_TERMINAL_HEIGHT - height
        ));
    }
    hints
}

pub(in crate::features::ui) fn draw_terminal_too_small(frame: &mut ratatui::Frame, area: Rect) {
    frame.render_widget(Clear, area);

    let warn = Style::default().fg(Color::Yellow);
    let mut lines = vec![Line::styled(
        "Window too small for the dashboard",
        warn.add_modifier(Modifier::BOLD),
    )];
    lines.extend(
        shortfall(area.width, area.height)
            .into_iter()
            .map(|hint| Line::styled(hint, warn)),
    );
    lines.push(Line::styled("q to quit", Style::default().fg(Color::DarkGray)));

    // Centre vertically when there is room for it.
    let top = area.height.saturating_sub(lines.len() as u16 + 2) / 2;
    let body = Rect {
        y: area.y + top,
        height: area.height - top,
        ..area
    };
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::TOP | Borders::BOTTOM).border_style(warn));
    frame.render_widget(paragraph, body);
}

#[cfg(test)]
mod tests {
    use super::shortfall;

    #[test]
    fn only_short_dimensions_are_reported() {
        assert_eq!(shortfall(80, 40), vec!["widen by 20 columns (80 of 100)"]);
        assert_eq!(shortfall(120, 30), vec!["heighten by 2 rows (30 of 32)"]);
        assert_eq!(shortfall(60, 10).len(), 2);
        assert!(shortfall(100, 32).is_empty());
    }
}
