mod alerts;
mod format;
mod header;
mod side;
mod terminal;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::state::DashboardState;
use alerts::draw_alerts;
use header::{draw_footer, draw_header};
use side::draw_side;

pub(super) use terminal::draw_terminal_too_small;

const SIDE_COLORS: [Color; 2] = [Color::Blue, Color::Yellow];

pub(super) fn draw_page(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &DashboardState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Header
            Constraint::Min(24),    // Sides
            Constraint::Length(8),  // Alerts
            Constraint::Length(1),  // Footer
        ])
        .split(area);

    draw_header(frame, chunks[0], state);
    draw_footer(frame, chunks[3], state.last_error.as_deref());

    let Some(page) = &state.page else {
        let empty = Paragraph::new("No targets to show")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[1]);
        return;
    };

    if !page.sides.is_empty() {
        let count = page.sides.len() as u32;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints((0..count).map(|_| Constraint::Ratio(1, count)))
            .split(chunks[1]);
        for (idx, side) in page.sides.iter().enumerate() {
            draw_side(frame, columns[idx], side, SIDE_COLORS[idx % SIDE_COLORS.len()]);
        }
    }

    draw_alerts(frame, chunks[2], page);
}
