//! Orrery Terminal Renderer
//! ========================
//!
//! Draws scenes on a terminal canvas with Ratatui and turns keyboard,
//! focus and resize events into controller commands.
//!
//! Enable with the `dashboard` feature flag.
//!
//! Keys:
//! - `space` play / pause
//! - `t` trails on / off
//! - `+` / `-` zoom
//! - `r` refill the buffer
//! - `q` or `Esc` quit

use std::io::{self, Stdout};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as Segment},
        Block, Borders, Paragraph,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::controller::Command;
use crate::render::{RenderError, Renderer, Scene};
use crate::viewport::Surface;

/// Approximate pixel size of one terminal cell.
const CELL_WIDTH: f64 = 8.0;
const CELL_HEIGHT: f64 = 16.0;

/// Rows taken by the status bar and the canvas border.
const CHROME_ROWS: u16 = 3;

/// Render-space surface for a terminal of `cols` x `rows` cells.
pub fn surface_for(cols: u16, rows: u16) -> Surface {
    Surface::new(
        cols.saturating_sub(2) as f64 * CELL_WIDTH,
        rows.saturating_sub(CHROME_ROWS) as f64 * CELL_HEIGHT,
    )
}

/// Maps a terminal event to a controller command.
pub fn command_for(event: &Event) -> Option<Command> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Shutdown),
            KeyCode::Char(' ') => Some(Command::TogglePlay),
            KeyCode::Char('t') => Some(Command::ToggleTrails),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(Command::ZoomIn),
            KeyCode::Char('-') => Some(Command::ZoomOut),
            KeyCode::Char('r') => Some(Command::Refill),
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Shutdown),
            _ => None,
        },
        Event::FocusGained => Some(Command::Visibility { visible: true }),
        Event::FocusLost => Some(Command::Visibility { visible: false }),
        Event::Resize(cols, rows) => {
            let surface = surface_for(*cols, *rows);
            Some(Command::Resize {
                width: surface.width,
                height: surface.height,
            })
        }
        _ => None,
    }
}

/// Forwards terminal input as commands from a dedicated thread.
///
/// The thread exits after forwarding `Shutdown` or once the receiver is gone.
pub fn spawn_input(commands: UnboundedSender<Command>) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        if commands.is_closed() {
            break;
        }
        match event::poll(Duration::from_millis(100)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("Terminal input failed: {}", e);
                let _ = commands.send(Command::Shutdown);
                break;
            }
        }
        let Ok(event) = event::read() else {
            continue;
        };
        if let Some(command) = command_for(&event) {
            let quit = command == Command::Shutdown;
            debug!("input {:?}", command);
            if commands.send(command).is_err() || quit {
                break;
            }
        }
    })
}

/// Resolves a server colour (CSS name or `#rrggbb`).
pub fn parse_color(name: &str) -> Color {
    match name.to_ascii_lowercase().as_str() {
        "orange" => Color::Rgb(255, 165, 0),
        "brown" => Color::Rgb(165, 42, 42),
        "gold" => Color::Rgb(255, 215, 0),
        "tan" => Color::Rgb(210, 180, 140),
        "lightblue" => Color::Rgb(173, 216, 230),
        "purple" => Color::Rgb(128, 0, 128),
        other => other.parse().unwrap_or(Color::White),
    }
}

// =============================================================================
// TERMINAL RENDERER
// =============================================================================

/// Canvas renderer over any Ratatui backend.
pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,
    owns_terminal: bool,
}

impl TerminalRenderer<CrosstermBackend<Stdout>> {
    /// Takes over stdout: raw mode, alternate screen, focus reporting.
    pub fn stdout() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            owns_terminal: true,
        })
    }
}

impl<B: Backend> TerminalRenderer<B> {
    /// Wraps an already prepared terminal; nothing is restored on drop.
    pub fn with_terminal(terminal: Terminal<B>) -> Self {
        Self {
            terminal,
            owns_terminal: false,
        }
    }

    /// Surface matching the current terminal size.
    pub fn surface(&self) -> io::Result<Surface> {
        let size = self.terminal.size()?;
        Ok(surface_for(size.width, size.height))
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Gives the terminal back to the shell. Safe to call twice.
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.owns_terminal {
            return Ok(());
        }
        self.owns_terminal = false;
        disable_raw_mode()?;
        execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<B: Backend> Renderer for TerminalRenderer<B> {
    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.terminal.draw(|f| draw_scene(f, scene))?;
        Ok(())
    }
}

impl<B: Backend> Drop for TerminalRenderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

fn draw_scene(f: &mut Frame, scene: &Scene) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let width = scene.surface.width;
    let height = scene.surface.height;

    // canvas y grows upwards, render space grows downwards
    let canvas = Canvas::default()
        .block(Block::default().title("Orrery").borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for trail in &scene.trails {
                let color = parse_color(&trail.color);
                for pair in trail.points.windows(2) {
                    ctx.draw(&Segment::new(
                        pair[0].x,
                        height - pair[0].y,
                        pair[1].x,
                        height - pair[1].y,
                        color,
                    ));
                }
            }
            ctx.layer();
            for body in &scene.bodies {
                ctx.draw(&Circle {
                    x: body.position.x,
                    y: height - body.position.y,
                    radius: body.radius,
                    color: parse_color(&body.color),
                });
            }
            ctx.layer();
            for body in &scene.bodies {
                ctx.print(
                    body.position.x,
                    height - body.position.y + body.radius + CELL_HEIGHT,
                    Span::styled(body.label.clone(), Style::default().fg(Color::White)),
                );
            }
        });
    f.render_widget(canvas, chunks[0]);

    let status = &scene.status;
    let bar = Paragraph::new(Line::from(vec![
        Span::styled(status.session.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
        Span::raw(format!("buffered {}", status.buffered)),
        Span::raw("  |  "),
        Span::styled(format!("t={:.0}", scene.sim_time), Style::default().fg(Color::Cyan)),
        Span::raw("  |  "),
        Span::raw(format!("zoom {:.2}", status.scale)),
        Span::raw("  |  "),
        Span::raw(if status.trails { "trails on" } else { "trails off" }),
        Span::raw("  |  "),
        Span::styled("space t + - r q", Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(bar, chunks[1]);
}

// =============================================================================
// TESTS
// =============================================================================
