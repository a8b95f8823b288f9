//! Terminal chat view
//!
//! Owns the terminal while running, so logging must stay file-only. Draws
//! from coordinator state snapshots and forwards key presses as commands.

use std::io;

use banter_chat::Role;
use banter_foundation::{ShutdownToken, StatusTone};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;

use crate::coordinator::{UiCommand, UiState};

pub async fn run(
    commands: mpsc::Sender<UiCommand>,
    mut ui_state: watch::Receiver<UiState>,
    shutdown: ShutdownToken,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, commands, &mut ui_state, shutdown).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    commands: mpsc::Sender<UiCommand>,
    ui_state: &mut watch::Receiver<UiState>,
    shutdown: ShutdownToken,
) -> io::Result<()> {
    let mut ui_update_interval = tokio::time::interval(Duration::from_millis(50));
    let mut frame: u64 = 0;

    loop {
        let state = ui_state.borrow_and_update().clone();
        terminal.draw(|f| draw_ui(f, &state, frame))?;

        tokio::select! {
            Some(event) = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            } => {
                if let Event::Key(key) = event {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Esc => {
                                shutdown.request();
                                return Ok(());
                            }
                            KeyCode::Enter => {
                                let _ = commands.send(UiCommand::SubmitInput).await;
                            }
                            KeyCode::F(2) => {
                                let _ = commands.send(UiCommand::ToggleMic).await;
                            }
                            KeyCode::F(3) => {
                                let _ = commands.send(UiCommand::ToggleContinuous).await;
                            }
                            KeyCode::F(4) => {
                                let _ = commands.send(UiCommand::ToggleVoiceOutput).await;
                            }
                            KeyCode::Backspace => {
                                let _ = commands.send(UiCommand::InputBackspace).await;
                            }
                            KeyCode::Char(c) => {
                                let _ = commands.send(UiCommand::InputChar(c)).await;
                            }
                            _ => {}
                        }
                    }
                }
            }

            changed = ui_state.changed() => {
                // Coordinator gone means the session is over
                if changed.is_err() {
                    return Ok(());
                }
            }

            _ = ui_update_interval.tick() => {
                frame = frame.wrapping_add(1);
            }

            _ = shutdown.wait() => {
                return Ok(());
            }
        }
    }
}

fn draw_ui(f: &mut Frame, state: &UiState, frame: u64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], state);
    draw_transcript(f, chunks[1], state, frame);
    draw_voice_status(f, chunks[2], state);
    draw_input(f, chunks[3], state);
    draw_help(f, chunks[4], state);
}

fn draw_header(f: &mut Frame, area: Rect, state: &UiState) {
    let api_style = if state.api_configured {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    let header = Line::from(vec![
        Span::styled("banter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(state.api_label.clone(), api_style),
    ]);
    f.render_widget(Paragraph::new(header), area);
}

fn draw_transcript(f: &mut Frame, area: Rect, state: &UiState, frame: u64) {
    let block = Block::default().title("Conversation").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    for message in &state.messages {
        let (label, style) = match message.role {
            Role::User => (
                state.user_label.as_str(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Role::Assistant => (
                "Assistant",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        let marker = if message.role == Role::User && state.has_photo {
            "\u{25cf} "
        } else {
            ""
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{}: ", label), style),
            Span::raw(message.text.clone()),
        ]));
    }
    if state.pending_replies > 0 {
        let dots = match (frame / 4) % 3 {
            0 => ".",
            1 => "..",
            _ => "...",
        };
        lines.push(Line::from(Span::styled(
            format!("Assistant is typing{}", dots),
            Style::default().fg(Color::DarkGray),
        )));
    }

    // Tail scroll. Row estimate assumes wrapping at the inner width, which
    // is close enough for chat-length lines.
    let width = inner.width.max(1) as usize;
    let total_rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    let scroll = total_rows.saturating_sub(inner.height as usize);
    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    f.render_widget(transcript, inner);
}

fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Idle => Color::Rgb(0xa0, 0xa0, 0xa0),
        StatusTone::Listening => Color::Rgb(0x4c, 0xaf, 0x50),
        StatusTone::Processing => Color::Rgb(0x21, 0x96, 0xf3),
        StatusTone::Speaking => Color::Rgb(0xe9, 0x1e, 0x63),
        StatusTone::Error => Color::Rgb(0xff, 0x57, 0x22),
    }
}

fn draw_voice_status(f: &mut Frame, area: Rect, state: &UiState) {
    let mut spans = vec![Span::styled(
        state.voice_status.clone(),
        Style::default().fg(tone_color(state.voice_tone)),
    )];
    if state.continuous_mode {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "[continuous]",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if !state.voice_output_enabled {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "[muted]",
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_input(f: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().title("Message").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    // Keep the cursor in view when the input outgrows the box
    let text = format!("{}\u{2588}", state.input);
    let width = inner.width.max(1) as usize;
    let chars: Vec<char> = text.chars().collect();
    let skip = chars.len().saturating_sub(width);
    let visible: String = chars.into_iter().skip(skip).collect();
    f.render_widget(Paragraph::new(visible), inner);
}

fn draw_help(f: &mut Frame, area: Rect, state: &UiState) {
    let mic = if state.mic_supported {
        "F2 mic"
    } else {
        "F2 (no mic)"
    };
    let help = format!(
        "Enter send | {} | F3 continuous | F4 voice output | Esc quit",
        mic
    );
    f.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(Color::DarkGray))),
        area,
    );
}
