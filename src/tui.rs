use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEvent, MouseEventKind,
    },
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use rand::Rng;
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::deck::Deck;
use crate::effects::{Celebrate, DecisionEffects, Outcome, Tally};
use crate::errors::FetchError;
use crate::gesture::{Gesture, classify, tilt};
use crate::inspector::{DetailView, Inspector, SkillList};
use crate::models::{Candidate, Decision, Direction};
use crate::session::Session;
use crate::source::{LoadTicket, Loader, MatchSource, load};

/// Drag units per terminal column when dragging with the mouse.
const UNITS_PER_COLUMN: f64 = 8.0;
/// Drag units per arrow-key press.
const KEY_NUDGE: f64 = 40.0;
const CELEBRATION_TIME: Duration = Duration::from_millis(1500);
const TICK: Duration = Duration::from_millis(50);

type LoadResult = (LoadTicket, Result<Vec<Candidate>, FetchError>);

#[derive(Debug, Clone, PartialEq)]
enum LoadStatus {
    Loading,
    Ready,
    Failed(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

/// Confetti over the deck for a moment after a strong accept.
#[derive(Debug, Default)]
struct Confetti {
    until: Option<Instant>,
    headline: String,
    // (x, y) as fractions of the screen, glyph, colour index
    pieces: Vec<(f32, f32, char, usize)>,
    fired: usize,
}

const CONFETTI_GLYPHS: &[char] = &['*', '+', '.', 'o', '~', '^'];
const CONFETTI_COLOURS: &[Color] = &[
    Color::LightRed,
    Color::LightBlue,
    Color::LightGreen,
    Color::LightMagenta,
    Color::Yellow,
];

impl Celebrate for Confetti {
    fn celebrate(&mut self, candidate: &Candidate) {
        let mut rng = rand::thread_rng();
        self.pieces = (0..60)
            .map(|_| {
                (
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(0.0..0.8),
                    CONFETTI_GLYPHS[rng.gen_range(0..CONFETTI_GLYPHS.len())],
                    rng.gen_range(0..CONFETTI_COLOURS.len()),
                )
            })
            .collect();
        self.headline = format!("{}% match! Applied to {}", candidate.score, candidate.company);
        self.until = Some(Instant::now() + CELEBRATION_TIME);
        self.fired += 1;
        debug!("Celebration #{} for {}", self.fired, candidate.id);
    }
}

impl Confetti {
    fn is_active(&self) -> bool {
        self.until.is_some_and(|t| Instant::now() < t)
    }
}

struct SwipeApp {
    session: Session,
    source: Arc<dyn MatchSource>,
    deck: Deck,
    loader: Loader,
    effects: DecisionEffects,
    inspector: Inspector,
    tally: Tally,
    confetti: Confetti,
    status: LoadStatus,
    // something was decided since the deck was last loaded
    decided_since_load: bool,
    threshold: f64,
    high_score: u8,
    drag_anchor: Option<u16>,
    card_area: Rect,
    results_tx: Sender<LoadResult>,
    results_rx: Receiver<LoadResult>,
}

impl SwipeApp {
    fn new(config: &Config, session: Session, source: Arc<dyn MatchSource>) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            session,
            source,
            deck: Deck::new(),
            loader: Loader::new(),
            effects: DecisionEffects::new(config.celebration_threshold),
            inspector: Inspector::new(config.detail_limit),
            tally: Tally::default(),
            confetti: Confetti::default(),
            status: LoadStatus::Ready,
            decided_since_load: false,
            threshold: config.swipe_threshold,
            high_score: config.high_score,
            drag_anchor: None,
            card_area: Rect::default(),
            results_tx,
            results_rx,
        }
    }

    /// Kick off a fresh load on a worker thread. Whatever was in the deck is
    /// gone, and any load still in flight is now stale.
    fn start_load(&mut self) {
        let ticket = self.loader.begin();
        self.deck.clear();
        self.inspector.close();
        self.drag_anchor = None;
        self.status = LoadStatus::Loading;

        let tx = self.results_tx.clone();
        let source = Arc::clone(&self.source);
        let session = self.session.clone();
        std::thread::spawn(move || {
            let result = load(&session, source.as_ref());
            // receiver gone means the screen closed; nothing to do
            let _ = tx.send((ticket, result));
        });
    }

    fn poll_results(&mut self) {
        while let Ok((ticket, result)) = self.results_rx.try_recv() {
            self.finish_load(ticket, result);
        }
    }

    fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<Candidate>, FetchError>) {
        let status = match self.loader.finish(ticket, result, &mut self.deck) {
            Some(Ok(_)) => LoadStatus::Ready,
            Some(Err(e)) => LoadStatus::Failed(e.hint()),
            None => return,
        };
        self.status = status;
        self.decided_since_load = false;
    }

    fn decide(&mut self, direction: Direction) {
        let Some(id) = self.deck.top_id() else { return };
        let decision = Decision { candidate_id: id, direction };
        let outcome = self.effects.apply(decision, &mut self.deck, &mut self.confetti);
        if matches!(outcome, Outcome::Applied { .. }) {
            self.decided_since_load = true;
        }
        self.tally.record(&outcome);
    }

    /// Let go of the top card: decide if it crossed a threshold, otherwise it
    /// springs back to centre.
    fn release(&mut self) {
        self.drag_anchor = None;
        let offset = self.deck.release();
        let gesture = classify(offset, self.threshold);
        debug!("Released at {offset:.0}: {gesture:?}");
        if let Some(direction) = gesture.direction() {
            self.decide(direction);
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Control {
        if self.inspector.is_open() {
            match code {
                KeyCode::Char('q') => return Control::Quit,
                KeyCode::Esc | KeyCode::Char('d') | KeyCode::Tab | KeyCode::Enter => {
                    self.inspector.close()
                }
                _ => {}
            }
            return Control::Continue;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Control::Quit,
            KeyCode::Char('r') => self.start_load(),
            KeyCode::Left | KeyCode::Char('h') => self.deck.drag_by(-KEY_NUDGE),
            KeyCode::Right | KeyCode::Char('l') => self.deck.drag_by(KEY_NUDGE),
            KeyCode::Enter | KeyCode::Char(' ') => self.release(),
            KeyCode::Char('a') => {
                self.deck.release();
                self.decide(Direction::Accept);
            }
            KeyCode::Char('x') => {
                self.deck.release();
                self.decide(Direction::Reject);
            }
            KeyCode::Char('d') | KeyCode::Tab => {
                // the drag in progress is left as it is for when the view closes
                if let Some(id) = self.deck.top_id() {
                    self.inspector.open(&self.deck, id);
                }
            }
            _ => {}
        }
        Control::Continue
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.inspector.is_open() {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let inside = self.card_area.contains(Position::new(mouse.column, mouse.row));
                if inside && !self.deck.is_empty() {
                    self.drag_anchor = Some(mouse.column);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(anchor) = self.drag_anchor {
                    let columns = mouse.column as f64 - anchor as f64;
                    self.deck.drag_to(columns * UNITS_PER_COLUMN);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag_anchor.is_some() {
                    self.release();
                }
            }
            _ => {}
        }
    }
}

/// Run the interactive deck until the user quits. Returns what they decided.
pub fn run_swipe(config: &Config, session: Session, source: Arc<dyn MatchSource>) -> Result<Tally> {
    let mut app = SwipeApp::new(config, session, source);
    app.start_load();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut app);

    // Restore terminal
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result.map(|_| app.tally)
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut SwipeApp,
) -> Result<()> {
    loop {
        app.poll_results();
        terminal.draw(|frame| draw(frame, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key.code) == Control::Quit {
                    break;
                }
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => {}
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, app: &mut SwipeApp) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Header
    let header = Text::from(vec![
        Line::from(Span::styled(
            "Daily Top Matches",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .centered(),
        Line::from(Span::styled(
            format!("Swipe right to apply, left to pass.  {} left", app.deck.len()),
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    // Deck or empty state
    if app.deck.is_empty() {
        app.card_area = Rect::default();
        draw_empty(frame, app, chunks[1]);
    } else {
        draw_deck(frame, app, chunks[1]);
    }

    // Footer help
    let help = if app.inspector.is_open() {
        " esc/d:close detail  q:quit"
    } else {
        " drag or h/l + enter:swipe  a:apply x:pass  d:detail  r:refresh  q:quit"
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    if let Some(view) = app.inspector.view(&app.deck) {
        draw_detail(frame, &view, app.high_score);
    }

    if app.confetti.is_active() {
        draw_confetti(frame, &app.confetti);
    }
}

fn draw_empty(frame: &mut Frame, app: &SwipeApp, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    match &app.status {
        LoadStatus::Loading => {
            lines.push(Line::from("Loading matches...").centered());
        }
        status => {
            if app.decided_since_load {
                lines.push(Line::from(Span::styled(
                    "All caught up!",
                    Style::default().add_modifier(Modifier::BOLD),
                )).centered());
                lines.push(Line::from("Press r to refresh the board.").centered());
            } else {
                lines.push(Line::from(Span::styled(
                    "No Matches Yet",
                    Style::default().add_modifier(Modifier::BOLD),
                )).centered());
                lines.push(Line::from(""));
                let hint = if app.session.resume_ref().is_some() {
                    "We couldn't find any high-quality matches right now. Check back later!"
                } else {
                    "Upload your resume first: matchdeck resume upload <file>"
                };
                lines.push(Line::from(hint).centered());
            }
            if let LoadStatus::Failed(reason) = status {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("{reason} (r to retry)"),
                    Style::default().fg(Color::Red),
                )).centered());
            }
        }
    }

    let top_pad = area.height.saturating_sub(lines.len() as u16) / 2;
    let inner = Rect { y: area.y + top_pad, height: area.height - top_pad, ..area };
    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

fn draw_deck(frame: &mut Frame, app: &mut SwipeApp, area: Rect) {
    let width = area.width.clamp(20, 48).min(area.width);
    let height = area.height.clamp(6, 14).min(area.height);
    let base = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    // Cards underneath: up to two peeking edges, no content.
    let buried = app.deck.len().saturating_sub(1).min(2) as u16;
    for depth in (1..=buried).rev() {
        let shadow = Rect {
            x: base.x + depth,
            y: base.y.saturating_sub(depth),
            ..base
        };
        if shadow.right() <= area.right() {
            frame.render_widget(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::DarkGray)),
                shadow,
            );
        }
    }

    let Some(top) = app.deck.top() else { return };
    let offset = app.deck.offset();

    // Shift the top card with the drag, kept on screen.
    let shift = (offset / UNITS_PER_COLUMN).round() as i32;
    let min_x = area.x as i32;
    let max_x = (area.right() - width) as i32;
    let x = (base.x as i32 + shift).clamp(min_x, max_x) as u16;
    let card = Rect { x, ..base };
    app.card_area = card;

    let gesture = classify(offset, app.threshold);
    let border = match gesture {
        Gesture::Accept => Color::Green,
        Gesture::Reject => Color::Red,
        Gesture::None => Color::White,
    };

    frame.render_widget(Clear, card);
    let lines = card_lines(top, offset, gesture, app.high_score);
    let widget = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, card);
}

fn score_style(score: u8, high_score: u8) -> Style {
    let colour = if score > high_score { Color::Green } else { Color::Yellow };
    Style::default().fg(colour).add_modifier(Modifier::BOLD)
}

fn card_lines(top: &Candidate, offset: f64, gesture: Gesture, high_score: u8) -> Vec<Line<'_>> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(
        Line::from(Span::styled(format!("{}% Match", top.score), score_style(top.score, high_score)))
            .right_aligned(),
    );

    let initial = top.company.chars().next().unwrap_or('?').to_uppercase().to_string();
    lines.push(Line::from(Span::styled(
        format!("[{initial}]"),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        top.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if !top.company.is_empty() {
        lines.push(Line::from(format!("at {}", top.company)));
    }
    if !top.location.is_empty() {
        lines.push(Line::from(Span::styled(
            top.location.as_str(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));

    let cue = match gesture {
        Gesture::Accept => Span::styled("APPLY ->", Style::default().fg(Color::Green)),
        Gesture::Reject => Span::styled("<- PASS", Style::default().fg(Color::Red)),
        Gesture::None if offset != 0.0 => Span::styled(
            format!("tilt {:+.0} deg", tilt(offset)),
            Style::default().fg(Color::DarkGray),
        ),
        Gesture::None => Span::raw(""),
    };
    lines.push(Line::from(cue).centered());
    lines
}

fn draw_detail(frame: &mut Frame, view: &DetailView, high_score: u8) {
    let area = frame.area();
    let popup = Rect {
        x: area.x + area.width / 8,
        y: area.y + 1,
        width: area.width - area.width / 4,
        height: area.height.saturating_sub(3),
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        view.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("{} | {}", view.company, view.location)));
    lines.push(Line::from(Span::styled(
        format!("Overall: {}%", view.score),
        score_style(view.score, high_score),
    )));
    lines.push(Line::from(""));

    lines.push(section_heading("SCORE BREAKDOWN"));
    if view.breakdown.is_empty() {
        lines.push(dim("  (no breakdown available)"));
    }
    for (label, value) in &view.breakdown {
        let filled = (*value as usize + 5) / 10;
        lines.push(Line::from(vec![
            Span::raw(format!("  {:<12} ", label)),
            Span::styled("#".repeat(filled), score_style(*value, high_score)),
            Span::styled(".".repeat(10 - filled.min(10)), Style::default().fg(Color::DarkGray)),
            Span::raw(format!(" {value:>3}")),
        ]));
    }
    lines.push(Line::from(""));

    lines.push(section_heading("STRENGTHS"));
    push_skills(&mut lines, &view.strengths, Color::Green);
    lines.push(Line::from(""));

    lines.push(section_heading("MISSING"));
    push_skills(&mut lines, &view.missing_skills, Color::Red);
    lines.push(Line::from(""));

    lines.push(section_heading("SUGGESTIONS"));
    if view.suggestions.is_empty() {
        lines.push(dim("  (none)"));
    }
    let wrap_at = popup.width.saturating_sub(8).max(20) as usize;
    for suggestion in &view.suggestions {
        for (i, line) in textwrap::fill(suggestion, wrap_at).lines().enumerate() {
            let bullet = if i == 0 { "  - " } else { "    " };
            lines.push(Line::from(format!("{bullet}{line}")));
        }
    }

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(Block::default().borders(Borders::ALL).title(" Match Detail "))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn section_heading(title: &str) -> Line<'_> {
    Line::from(Span::styled(title, Style::default().fg(Color::Cyan)))
}

fn dim(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn push_skills(lines: &mut Vec<Line>, skills: &SkillList, colour: Color) {
    match skills {
        SkillList::NoMatches => lines.push(dim("  No matches")),
        SkillList::Items { shown, hidden } => {
            lines.push(Line::from(Span::styled(
                format!("  {}", shown.join(", ")),
                Style::default().fg(colour),
            )));
            if *hidden > 0 {
                lines.push(Line::from(Span::styled(
                    format!("  +{hidden} more"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }
}

fn draw_confetti(frame: &mut Frame, confetti: &Confetti) {
    let area = frame.area();
    let buf = frame.buffer_mut();
    for (fx, fy, glyph, colour) in &confetti.pieces {
        let x = area.x + (*fx * area.width.saturating_sub(1) as f32) as u16;
        let y = area.y + (*fy * area.height.saturating_sub(1) as f32) as u16;
        if let Some(cell) = buf.cell_mut(Position::new(x, y)) {
            cell.set_char(*glyph)
                .set_fg(CONFETTI_COLOURS[*colour % CONFETTI_COLOURS.len()]);
        }
    }

    let banner_width = (confetti.headline.len() as u16 + 4).min(area.width);
    let banner_height = 3.min(area.height);
    let banner = Rect {
        x: area.x + (area.width - banner_width) / 2,
        y: area.y + (area.height - banner_height) / 2,
        width: banner_width,
        height: banner_height,
    }
    .intersection(area);
    frame.render_widget(Clear, banner);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            confetti.headline.as_str(),
            Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
        )).centered())
        .block(Block::default().borders(Borders::ALL)),
        banner,
    );
}
