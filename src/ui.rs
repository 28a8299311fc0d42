use crate::chat::{ChatSession, Speaker, Turn, TurnStatus};
use crate::dashboard::{Card, CardTarget, catalog};
use crate::dispatch::Dispatcher;
use crate::error::ClientResult;
use crate::render::{OutputPanel, PanelState, Ticket};
use crate::speech::SpeechEvent;
use crate::voice::{HELP_PHRASES, IdleView, VoiceInterpreter, VoicePanel, VoiceState};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;
type UiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const CARD_WIDTH: u16 = 28;
const CARD_HEIGHT: u16 = 4;
const INPUT_HEIGHT: u16 = 4;
const SPINNER: &[&str] = &["|", "/", "-", "\\"];

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        let _ = io::stdout().flush();
    }
}

#[derive(Debug)]
pub enum UiEvent {
    OutputResolved {
        ticket: Ticket,
        result: ClientResult<String>,
    },
    ChatResolved {
        placeholder: Uuid,
        result: ClientResult<String>,
    },
    Speech {
        round: u64,
        event: SpeechEvent,
    },
    VoiceResolved {
        round: u64,
        result: ClientResult<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Dashboard,
    Output,
    Chat,
    Voice,
}

#[derive(Debug, Clone)]
struct LineSpec {
    text: String,
    style: Style,
}

impl LineSpec {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

fn turn_line_specs(turn: &Turn) -> Vec<LineSpec> {
    let (label, color) = match (turn.speaker, turn.status) {
        (Speaker::User, _) => ("You:", Color::Blue),
        (Speaker::Bot, TurnStatus::Error) => ("Error:", Color::Red),
        (Speaker::Bot, _) => ("AI:", Color::Yellow),
    };
    let header_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    let body_style = match turn.status {
        TurnStatus::Loading => Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
        _ => Style::default().fg(color),
    };

    let mut lines = vec![LineSpec::new(label, header_style)];
    for line in turn.text.lines() {
        lines.push(LineSpec::new(format!("  {}", line), body_style));
    }
    lines.push(LineSpec::new("", body_style));
    lines
}

fn to_text(specs: Vec<LineSpec>) -> Text<'static> {
    Text::from(
        specs
            .into_iter()
            .map(|spec| Line::from(Span::styled(spec.text, spec.style)))
            .collect::<Vec<_>>(),
    )
}

fn rendered_height(specs: &[LineSpec], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total = 0usize;
    for spec in specs {
        let len = spec.text.chars().count().max(1);
        total += len.div_ceil(width);
    }
    total.min(u16::MAX as usize) as u16
}

struct InputBuffer {
    lines: Vec<String>,
    cursor_x: usize,
    cursor_y: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    fn byte_index(line: &str, char_index: usize) -> usize {
        line.char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(line.len())
    }

    fn line_len(&self, y: usize) -> usize {
        self.lines[y].chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.cursor_y];
        let idx = Self::byte_index(line, self.cursor_x);
        line.insert(idx, c);
        self.cursor_x += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_x > 0 {
            let line = &mut self.lines[self.cursor_y];
            let idx = Self::byte_index(line, self.cursor_x - 1);
            line.remove(idx);
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            let removed = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
            self.lines[self.cursor_y].push_str(&removed);
        }
    }

    fn new_line(&mut self) {
        let line = &self.lines[self.cursor_y];
        let remaining: String = line.chars().skip(self.cursor_x).collect();
        self.lines[self.cursor_y] = line.chars().take(self.cursor_x).collect();
        self.lines.insert(self.cursor_y + 1, remaining);
        self.cursor_y += 1;
        self.cursor_x = 0;
    }

    fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
        }
    }

    fn move_right(&mut self) {
        if self.cursor_x < self.line_len(self.cursor_y) {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    fn to_string(&self) -> String {
        self.lines.join("\n")
    }

    fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    fn render(&self) -> Text<'static> {
        if self.is_empty() {
            return Text::from(Span::styled(
                "Ask me anything...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    cards: Vec<Card>,
    selected: usize,
    columns: usize,
    mode: Mode,
    output: OutputPanel,
    scroll: u16,
    chat: ChatSession,
    input: InputBuffer,
    voice_panel: VoicePanel,
    voice_task: Option<AbortHandle>,
    panel_area: Rect,
    tick: usize,
    should_quit: bool,
    sender: mpsc::Sender<UiEvent>,
    receiver: mpsc::Receiver<UiEvent>,
    dispatcher: Dispatcher,
    voice: VoiceInterpreter,
}

impl App {
    pub fn new(dispatcher: Dispatcher, voice: VoiceInterpreter) -> Self {
        let (sender, receiver) = mpsc::channel(100);
        let voice_panel = voice.new_panel();

        Self {
            cards: catalog(),
            selected: 0,
            columns: 1,
            mode: Mode::Dashboard,
            output: OutputPanel::new(),
            scroll: 0,
            chat: ChatSession::new(),
            input: InputBuffer::new(),
            voice_panel,
            voice_task: None,
            panel_area: Rect::default(),
            tick: 0,
            should_quit: false,
            sender,
            receiver,
            dispatcher,
            voice,
        }
    }

    fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(CARD_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(area);

        let title = Line::from(vec![
            Span::styled(
                " BETTER VTOP ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" session {}", self.dispatcher.session().session_id()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        f.render_widget(Paragraph::new(title), header);
        self.draw_cards(f, body);
        f.render_widget(
            Paragraph::new(self.footer_hint()).style(Style::default().fg(Color::DarkGray)),
            footer,
        );

        if self.mode != Mode::Dashboard {
            let panel = centered(area, 85, 85);
            self.panel_area = panel;
            f.render_widget(Clear, panel);
            match self.mode {
                Mode::Output => self.draw_output(f, panel),
                Mode::Chat => self.draw_chat(f, panel),
                Mode::Voice => self.draw_voice(f, panel),
                Mode::Dashboard => {}
            }
        }
    }

    fn footer_hint(&self) -> &'static str {
        match self.mode {
            Mode::Dashboard => " arrows: move  enter: run  q: quit",
            Mode::Output => " up/down: scroll  esc: close",
            Mode::Chat => " enter: send  shift+enter: new line  esc: close",
            Mode::Voice => " enter: start listening  s: stop  esc: close",
        }
    }

    fn draw_cards(&mut self, f: &mut Frame, area: Rect) {
        self.columns = (area.width / CARD_WIDTH).max(1) as usize;
        let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
        let selected_row = self.selected / self.columns;
        let first_row = selected_row.saturating_sub(visible_rows - 1);

        for (index, card) in self.cards.iter().enumerate() {
            let row = index / self.columns;
            if row < first_row || row >= first_row + visible_rows {
                continue;
            }
            let column = index % self.columns;
            let rect = Rect {
                x: area.x + column as u16 * CARD_WIDTH,
                y: area.y + (row - first_row) as u16 * CARD_HEIGHT,
                width: CARD_WIDTH.min(area.width),
                height: CARD_HEIGHT,
            };

            let border = if index == self.selected {
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    card.title,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    card.description,
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ", card.section.label())),
            );
            f.render_widget(paragraph, rect);
        }
    }

    fn draw_output(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.output.title()))
            .border_style(Style::default().fg(Color::Magenta));

        let paragraph = match self.output.state() {
            PanelState::Idle => Paragraph::new(""),
            PanelState::Loading => Paragraph::new(format!(
                "{} EXECUTING...",
                SPINNER[self.tick / 4 % SPINNER.len()]
            ))
            .style(Style::default().fg(Color::Yellow)),
            PanelState::Shown(text) => Paragraph::new(text.clone()).scroll((self.scroll, 0)),
            PanelState::Errored(message) => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        "ERROR",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                ];
                lines.extend(
                    message
                        .lines()
                        .map(|line| Line::styled(line.to_string(), Style::default().fg(Color::Red))),
                );
                Paragraph::new(lines)
            }
        };

        f.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
    }

    fn draw_chat(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" AI Chatbot ")
            .border_style(Style::default().fg(Color::Magenta));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let [messages, input] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)]).areas(inner);

        let specs: Vec<LineSpec> = self
            .chat
            .transcript()
            .turns()
            .iter()
            .flat_map(turn_line_specs)
            .collect();
        // Keep the newest turns in view.
        let height = rendered_height(&specs, messages.width);
        let offset = height.saturating_sub(messages.height);
        f.render_widget(
            Paragraph::new(to_text(specs))
                .wrap(Wrap { trim: false })
                .scroll((offset, 0)),
            messages,
        );

        let title = if self.chat.transcript().is_waiting() {
            " Message [Thinking...] "
        } else {
            " Message "
        };
        f.render_widget(
            Paragraph::new(self.input.render())
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title)
                        .border_style(Style::default().fg(Color::DarkGray)),
                )
                .wrap(Wrap { trim: false }),
            input,
        );

        let x = (input.x + 1 + self.input.cursor_x as u16)
            .min(input.x + input.width.saturating_sub(2));
        let y = (input.y + 1 + self.input.cursor_y as u16)
            .min(input.y + input.height.saturating_sub(2));
        f.set_cursor_position((x, y));
    }

    fn draw_voice(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Voice Assistant ")
            .border_style(Style::default().fg(Color::Magenta));

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let gray = Style::default().fg(Color::Gray);
        let mut lines: Vec<Line> = Vec::new();

        let (status, color) = match self.voice_panel.state() {
            VoiceState::Idle(IdleView::Help) | VoiceState::Idle(IdleView::Stopped) => {
                ("Press Enter to start listening".to_string(), Color::White)
            }
            VoiceState::Idle(IdleView::Result { .. }) => (
                "Complete! Press Enter to ask something else".to_string(),
                Color::Green,
            ),
            VoiceState::Idle(IdleView::Error(message)) => (message.clone(), Color::Red),
            VoiceState::Idle(IdleView::Unsupported(reason)) => (reason.clone(), Color::Red),
            VoiceState::Listening { .. } => ("Listening... Speak now!".to_string(), Color::Cyan),
            VoiceState::Processing { .. } => (
                format!("{} Processing...", SPINNER[self.tick / 4 % SPINNER.len()]),
                Color::Yellow,
            ),
        };
        lines.push(Line::styled(status, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        lines.push(Line::from(""));
        lines.push(Line::styled("Transcript:", bold));

        match self.voice_panel.state() {
            VoiceState::Listening { interim } => lines.push(Line::styled(
                format!("  {}", interim.as_deref().unwrap_or("Listening...")),
                gray.add_modifier(Modifier::ITALIC),
            )),
            VoiceState::Processing { transcript }
            | VoiceState::Idle(IdleView::Result { transcript, .. }) => {
                lines.push(Line::from(format!("  You said: \"{}\"", transcript)))
            }
            _ => {
                lines.push(Line::styled("  Try saying:", gray));
                for phrase in HELP_PHRASES {
                    lines.push(Line::styled(format!("    \"{}\"", phrase), gray));
                }
            }
        }

        if let VoiceState::Idle(IdleView::Result { text, .. }) = self.voice_panel.state() {
            lines.push(Line::from(""));
            lines.push(Line::styled("Response:", bold));
            for line in text.lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }

        f.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            area,
        );
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::OutputResolved { ticket, result } => {
                if !self.output.resolve(ticket, result) {
                    debug!("dropping result for a closed panel");
                }
            }
            UiEvent::ChatResolved {
                placeholder,
                result,
            } => {
                self.chat.finish_send(placeholder, result);
            }
            UiEvent::Speech { round, event } => {
                if let Some(transcript) = self.voice_panel.on_event(round, event) {
                    let voice = self.voice.clone();
                    let sender = self.sender.clone();
                    tokio::spawn(async move {
                        let result = voice.interpret(&transcript).await;
                        let _ = sender.send(UiEvent::VoiceResolved { round, result }).await;
                    });
                }
            }
            UiEvent::VoiceResolved { round, result } => {
                self.voice_panel.complete(round, &result);
            }
        }
    }

    fn activate(&mut self) {
        let Some(card) = self.cards.get(self.selected) else {
            return;
        };
        self.scroll = 0;

        match card.target.clone() {
            CardTarget::Run(action) => {
                let ticket = self.output.open_loading(card.title);
                self.mode = Mode::Output;
                let dispatcher = self.dispatcher.clone();
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    let result = dispatcher.dispatch(&action).await;
                    let _ = sender.send(UiEvent::OutputResolved { ticket, result }).await;
                });
            }
            CardTarget::OpenChat => {
                self.chat.reset();
                self.input.clear();
                self.mode = Mode::Chat;
            }
            CardTarget::OpenVoice => {
                self.voice.reopen_panel(&mut self.voice_panel);
                self.mode = Mode::Voice;
            }
        }
    }

    fn send_chat(&mut self) {
        let text = self.input.to_string();
        let Some(pending) = self.chat.begin_send(&text) else {
            return;
        };
        self.input.clear();

        let dispatcher = self.dispatcher.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = dispatcher.dispatch(&pending.action).await;
            let _ = sender
                .send(UiEvent::ChatResolved {
                    placeholder: pending.placeholder,
                    result,
                })
                .await;
        });
    }

    fn start_listening(&mut self) {
        let Some(round) = self.voice_panel.start() else {
            return;
        };

        let mut events = match self.voice.listen() {
            Ok(events) => events,
            Err(err) => {
                self.voice_panel
                    .on_event(round, SpeechEvent::Error(err.to_string()));
                return;
            }
        };

        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let done = event == SpeechEvent::End;
                if sender.send(UiEvent::Speech { round, event }).await.is_err() || done {
                    break;
                }
            }
        });
        self.voice_task = Some(task.abort_handle());
    }

    fn stop_listening(&mut self) {
        self.voice_panel.cancel();
        if let Some(task) = self.voice_task.take() {
            task.abort();
        }
    }

    fn close_panel(&mut self) {
        match self.mode {
            Mode::Output if self.output.is_open() => self.output.close(),
            Mode::Output => {}
            Mode::Voice => self.stop_listening(),
            Mode::Chat | Mode::Dashboard => {}
        }
        self.scroll = 0;
        self.mode = Mode::Dashboard;
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.cards.len() as isize;
        let next = (self.selected as isize + delta).clamp(0, len - 1);
        self.selected = next as usize;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.mode {
            Mode::Dashboard => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Enter => self.activate(),
                KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
                KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
                KeyCode::Up | KeyCode::Char('k') => self.move_selection(-(self.columns as isize)),
                KeyCode::Down | KeyCode::Char('j') => self.move_selection(self.columns as isize),
                _ => {}
            },
            Mode::Output => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.close_panel(),
                KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
                KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
                KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
                KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
                _ => {}
            },
            Mode::Chat => match key.code {
                KeyCode::Esc => self.close_panel(),
                KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                    self.input.new_line()
                }
                KeyCode::Enter => self.send_chat(),
                KeyCode::Char(c) => self.input.insert_char(c),
                KeyCode::Backspace => self.input.delete_char(),
                KeyCode::Left => self.input.move_left(),
                KeyCode::Right => self.input.move_right(),
                _ => {}
            },
            Mode::Voice => match key.code {
                KeyCode::Esc => self.close_panel(),
                KeyCode::Enter | KeyCode::Char(' ') => self.start_listening(),
                KeyCode::Char('s') => self.stop_listening(),
                KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
                KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
                _ => {}
            },
        }
    }

    /// A left click on the backdrop closes the open panel.
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind == MouseEventKind::Down(MouseButton::Left)
            && self.mode != Mode::Dashboard
            && !self
                .panel_area
                .contains(Position::new(mouse.column, mouse.row))
        {
            self.close_panel();
        }
    }

    fn handle_events(&mut self) -> UiResult<bool> {
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => self.handle_key(key),
                Event::Mouse(mouse) => self.handle_mouse(mouse),
                _ => {}
            }
        }

        self.tick = self.tick.wrapping_add(1);
        Ok(!self.should_quit)
    }
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn run_tui(dispatcher: Dispatcher, voice: VoiceInterpreter) -> UiResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let _guard = TerminalGuard::new();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal: TuiTerminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(dispatcher, voice);

    terminal.draw(|f| app.draw(f))?;

    while !app.should_quit {
        if !app.handle_events()? {
            break;
        }

        terminal.draw(|f| app.draw(f))?;

        std::thread::sleep(Duration::from_millis(10));
    }

    app.stop_listening();
    Ok(())
}
