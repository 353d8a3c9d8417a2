use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use knightcam_types::{
    events::{EventPayload, SystemEvent},
    region::{default_regions, Region, SideHint},
    round::{FlashColor, Phase, RoundSnapshot, Transition, MAX_LIVES},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};

const MAX_LOG_ENTRIES: usize = 120;

pub enum UiMessage {
    Event(SystemEvent),
    Shutdown,
}

pub fn run(receiver: Receiver<UiMessage>, summary: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, summary.as_str());

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

/// Everything the HUD draws, rebuilt from the event stream.
struct HudState {
    regions: Vec<Region>,
    snapshot: Option<RoundSnapshot>,
    logs: VecDeque<String>,
    session_over: bool,
}

impl HudState {
    fn new() -> Self {
        Self {
            regions: default_regions(),
            snapshot: None,
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            session_over: false,
        }
    }

    fn apply(&mut self, event: &SystemEvent) {
        match &event.payload {
            EventPayload::Snapshot(snapshot) => self.snapshot = Some(*snapshot),
            _ => {
                if self.logs.len() == MAX_LOG_ENTRIES {
                    self.logs.pop_front();
                }
                self.logs.push_back(format_event(event, &self.regions));
            }
        }
    }
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    summary: &str,
) -> Result<()> {
    let mut hud = HudState::new();
    let mut receiver_closed = false;

    loop {
        while !receiver_closed {
            match receiver.try_recv() {
                Ok(UiMessage::Event(event)) => hud.apply(&event),
                Ok(UiMessage::Shutdown) => hud.session_over = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    receiver_closed = true;
                    hud.session_over = true;
                }
            }
        }

        terminal.draw(|f| draw(f, &hud, summary))?;

        // The last frame stays on screen until the player leaves.
        if event::poll(Duration::from_millis(16))? {
            if let CEvent::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, hud: &HudState, summary: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(f.size());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "knightcam",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("config:", Style::default().fg(Color::Magenta)),
        Span::raw(" "),
        Span::raw(summary),
        Span::raw("  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" to quit"),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(header, chunks[0]);

    f.render_widget(status_line(hud), chunks[1]);
    draw_buttons(f, hud, chunks[2]);

    let items: Vec<ListItem> = hud
        .logs
        .iter()
        .rev()
        .map(|entry| ListItem::new(entry.clone()))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(list, chunks[3]);
}

fn hearts(lives: u8) -> String {
    (0..MAX_LIVES)
        .map(|i| if i < lives { '♥' } else { '♡' })
        .collect()
}

fn status_line(hud: &HudState) -> Paragraph<'static> {
    let block = Block::default().borders(Borders::ALL).title("Status");
    let Some(snapshot) = hud.snapshot else {
        return Paragraph::new("Waiting for camera...").block(block);
    };

    if snapshot.game_over {
        return Paragraph::new(Line::from(vec![
            Span::styled(
                "GAME OVER",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  score {} in {} rounds. Restart to play again.",
                snapshot.score, snapshot.round_number
            )),
        ]))
        .alignment(Alignment::Center)
        .block(block);
    }

    let mut spans = vec![
        Span::styled(hearts(snapshot.lives), Style::default().fg(Color::Red)),
        Span::raw(format!(
            "  round {}  score {}",
            snapshot.round_number, snapshot.score
        )),
    ];
    if let Some(ms) = snapshot.remaining_ms {
        spans.push(Span::raw(format!("  {:.1}s", ms as f64 / 1000.0)));
    }
    if hud.session_over {
        spans.push(Span::styled(
            "  (session ended)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Paragraph::new(Line::from(spans)).block(block)
}

fn draw_buttons(f: &mut Frame, hud: &HudState, area: Rect) {
    let count = hud.regions.len().max(1) as u32;
    let constraints: Vec<Constraint> = hud
        .regions
        .iter()
        .map(|_| Constraint::Ratio(1, count))
        .collect();
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (index, region) in hud.regions.iter().enumerate() {
        let (style, marker) = button_style(hud.snapshot.as_ref(), index, region.side);
        let label = Paragraph::new(vec![
            Line::from(marker),
            Line::from(Span::styled(
                region.action.label().to_uppercase(),
                style.add_modifier(Modifier::BOLD),
            )),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(style));
        f.render_widget(label, cells[index]);
    }
}

/// Tint and indicator for one button given the current round state.
fn button_style(snapshot: Option<&RoundSnapshot>, index: usize, side: SideHint) -> (Style, String) {
    let idle = (Style::default().fg(Color::Gray), String::new());
    let Some(snapshot) = snapshot else {
        return idle;
    };
    match snapshot.phase {
        Phase::RoundActive if snapshot.target_region_index == Some(index) => {
            let marker = match side {
                SideHint::Left => "▶ touch",
                SideHint::Center => "▼ touch ▼",
                SideHint::Right => "touch ◀",
            };
            (Style::default().fg(Color::Yellow), marker.to_string())
        }
        Phase::Flash if snapshot.flashing_target_index == Some(index) => {
            match snapshot.flash_color {
                Some(FlashColor::Success) => (Style::default().fg(Color::Green), "HIT".into()),
                _ => (Style::default().fg(Color::Red), "MISS".into()),
            }
        }
        _ => idle,
    }
}

fn region_name(regions: &[Region], index: usize) -> String {
    regions
        .get(index)
        .map(|r| r.name.clone())
        .unwrap_or_else(|| format!("#{index}"))
}

fn format_event(event: &SystemEvent, regions: &[Region]) -> String {
    let timestamp = event.timestamp.format("%H:%M:%S");
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => format!(
            "[{}] Lifecycle::{:?} {}",
            timestamp,
            lifecycle.phase,
            lifecycle.details.clone().unwrap_or_default()
        ),
        EventPayload::Round(Transition::RoundStarted { round, target, .. }) => format!(
            "[{}] Round {} → touch {}",
            timestamp,
            round,
            region_name(regions, *target)
        ),
        EventPayload::Round(Transition::RoundEnded {
            round, hit, lives, ..
        }) => format!(
            "[{}] Round {} {} (lives {})",
            timestamp,
            round,
            if *hit { "hit" } else { "missed" },
            lives
        ),
        EventPayload::Round(Transition::GameOver { round, .. }) => {
            format!("[{}] Game over in round {}", timestamp, round)
        }
        EventPayload::Snapshot(_) => format!("[{}] Snapshot", timestamp),
        EventPayload::Telemetry(telemetry) => format!(
            "[{}] Telemetry {}",
            timestamp,
            telemetry.notes.clone().unwrap_or_default()
        ),
        EventPayload::Ops(ops) => format!(
            "[{}] Ops {} [{}]",
            timestamp,
            ops.message,
            ops.tags.join(", ")
        ),
    }
}
