//! Terminal dashboard: one page per target, a side per statistic rule and an
//! alerts pane. Everything it shows comes through [`StatusSource`], including
//! the rules each page is laid out from, so the same dashboard runs over a
//! local store or a daemon's remote channel.

mod input;
mod render;
mod state;

use crate::store::StatusSource;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{QueueableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use input::handle_key;
use render::{draw_page, draw_terminal_too_small};
use state::{DashboardState, MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH};

fn tick_rate(refresh_hz: u16) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(refresh_hz.max(1)))
}

/// Runs the dashboard until the user quits, redrawing `refresh_hz` times a
/// second.
pub fn run_dashboard<S: StatusSource>(source: &S, refresh_hz: u16) -> io::Result<()> {
    let targets = source.targets().map_err(io::Error::other)?;
    let mut state = DashboardState::new(targets);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, source, tick_rate(refresh_hz), &mut state);
    cleanup_terminal(&mut terminal)?;
    result
}

fn event_loop<S: StatusSource>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    source: &S,
    tick_rate: Duration,
    state: &mut DashboardState,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    state.refresh(source);

    while !state.should_quit {
        terminal.draw(|frame| {
            let size = frame.area();
            if size.width < MIN_TERMINAL_WIDTH || size.height < MIN_TERMINAL_HEIGHT {
                draw_terminal_too_small(frame, size);
                return;
            }
            draw_page(frame, size, state);
        })?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && handle_key(key, state)
        {
            state.refresh(source);
        }

        if last_tick.elapsed() >= tick_rate {
            state.refresh(source);
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().queue(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    terminal.backend_mut().flush()?;
    Ok(())
}
