//! Discovery progress display
//!
//! Inline gauge drawn below the shell prompt while discovery runs. It only
//! reads tracker snapshots on a fixed tick, so drawing never slows workers
//! down. Drawn to stderr; stdout is reserved for the JSON output.

use crate::discovery::{ProgressSnapshot, ProgressTracker};
use anyhow::Result;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph},
    Frame, Terminal, TerminalOptions, Viewport,
};
use std::future::Future;
use std::io::{self, Stderr};
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);
const HEIGHT: u16 = 2;

/// Drive `work` to completion, redrawing the gauge every tick
pub async fn run_with_progress<F: Future>(tracker: Arc<ProgressTracker>, work: F) -> Result<F::Output> {
    let mut terminal = Terminal::with_options(
        CrosstermBackend::new(io::stderr()),
        TerminalOptions {
            viewport: Viewport::Inline(HEIGHT),
        },
    )?;

    let mut ticker = tokio::time::interval(TICK);
    tokio::pin!(work);

    let output = loop {
        tokio::select! {
            output = &mut work => break output,
            _ = ticker.tick() => draw(&mut terminal, &tracker.snapshot())?,
        }
    };

    draw(&mut terminal, &tracker.snapshot())?;
    finish(&mut terminal)?;
    Ok(output)
}

fn draw(terminal: &mut Terminal<CrosstermBackend<Stderr>>, snapshot: &ProgressSnapshot) -> Result<()> {
    terminal.draw(|f| render(f, snapshot))?;
    Ok(())
}

fn finish(terminal: &mut Terminal<CrosstermBackend<Stderr>>) -> Result<()> {
    terminal.show_cursor()?;
    eprintln!();
    Ok(())
}

/// Stage line on top, item gauge below
pub fn render(f: &mut Frame, snapshot: &ProgressSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(f.area());

    let stage = Line::from(vec![
        Span::styled(
            format!("[{}/{}] ", snapshot.finished_services, snapshot.total_services),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            snapshot.stage.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(stage), chunks[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(snapshot.ratio())
        .label(format!(
            "{}/{} resources",
            snapshot.completed_items, snapshot.total_items
        ));
    f.render_widget(gauge, chunks[1]);
}
