use std::{io, mem, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use multiaventura_core::{
    feedback::{WELCOME_AUDIO, WELCOME_BACK_AUDIO},
    models::{MAX_LIVES, MAX_NAME_LEN, TABLE_COUNT},
    progression::{LevelSummary, Outcome, UNLOCK_ACCURACY},
    report::{self, ReportError},
    session::{Evaluation, GameOverSummary, Submission, OPTION_COUNT},
    shop::{self, CATALOGUE, STARTER_AVATARS},
    AppConfig, EventTime, JsonFileStore, Player, PlayerRegistry, SessionEngine, SessionEvent,
    SessionState, Settings,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::block_font;

const TICK_RATE: Duration = Duration::from_millis(100);
const MAP_COLUMNS: u32 = 4;
const REPORT_PRESSES: usize = 3;
const REPORT_WINDOW_MS: u64 = 2_000;

#[derive(Debug, Clone)]
struct Theme {
    primary_bg: Color,
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Theme {
    fn dark() -> Self {
        Self {
            primary_bg: Color::Black,
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }

    fn light() -> Self {
        Self {
            primary_bg: Color::White,
            primary_fg: Color::Black,
            accent: Color::Blue,
            muted: Color::Gray,
            selection_bg: Color::LightBlue,
            selection_fg: Color::Black,
            success: Color::Green,
            warning: Color::Magenta,
            danger: Color::Red,
        }
    }

    fn for_settings(settings: &Settings) -> Self {
        if settings.dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.primary_fg).bg(self.primary_bg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Map,
    Game,
    Shop,
    Leaderboard,
}

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Default)]
struct LoginForm {
    name: String,
    avatar_index: usize,
    player_cursor: Option<usize>,
}

impl LoginForm {
    fn insert(&mut self, ch: char) {
        if self.name.chars().count() < MAX_NAME_LEN {
            self.name.push(ch);
        }
        self.player_cursor = None;
    }

    fn backspace(&mut self) {
        self.name.pop();
        self.player_cursor = None;
    }
}

/// Answer feedback kept on screen until the next answer.
struct FeedbackBanner {
    message: String,
    outcome: Outcome,
    detail: String,
}

impl FeedbackBanner {
    fn from_evaluation(evaluation: &Evaluation) -> Self {
        let detail = match (evaluation.outcome, evaluation.submission) {
            (Outcome::Correct, _) => format!("+1 coin ({:.1}s)", evaluation.entry.elapsed_seconds()),
            (Outcome::Incorrect, Submission::Timeout) => {
                format!("Time's up! The answer was {}", evaluation.answer)
            }
            (Outcome::Incorrect, Submission::Value(_)) => {
                format!("The answer was {}", evaluation.answer)
            }
        };
        Self {
            message: evaluation.cue.message.to_string(),
            outcome: evaluation.outcome,
            detail,
        }
    }
}

#[derive(Default)]
struct GameView {
    state: SessionState,
    cursor: usize,
    feedback: Option<FeedbackBanner>,
}

/// Counts quick presses of the hidden report key.
#[derive(Debug, Default)]
struct ReportTrigger {
    presses: Vec<u64>,
}

impl ReportTrigger {
    /// Record a press at `now_ms`; true once enough presses land inside the window.
    fn press(&mut self, now_ms: u64) -> bool {
        self.presses
            .retain(|at| now_ms.saturating_sub(*at) <= REPORT_WINDOW_MS);
        self.presses.push(now_ms);
        if self.presses.len() >= REPORT_PRESSES {
            self.presses.clear();
            return true;
        }
        false
    }
}

struct UiState {
    status: String,
    should_quit: bool,
    map_cursor: u32,
    shop_cursor: usize,
    leaderboard_cursor: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Type your name and press Enter".to_string(),
            should_quit: false,
            map_cursor: 1,
            shop_cursor: 0,
            leaderboard_cursor: 0,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }
}

/// Terminal front-end for the multiplication game.
pub struct MultiAventuraApp {
    config: AppConfig,
    store: JsonFileStore,
    registry: PlayerRegistry,
    settings: Settings,
    engine: SessionEngine,
    theme: Theme,
    screen: Screen,
    ui: UiState,
    login: LoginForm,
    player: Option<Player>,
    game: GameView,
    report_trigger: ReportTrigger,
}

impl MultiAventuraApp {
    pub fn new(config: AppConfig, store: JsonFileStore) -> Self {
        let registry = PlayerRegistry::load(&store);
        let settings = Settings::load(&store);
        let engine = SessionEngine::new(config.question_pause_ms);
        info!(
            players = registry.len(),
            muted = settings.muted,
            dark_mode = settings.dark_mode,
            "Game state restored"
        );
        Self {
            config,
            store,
            registry,
            theme: Theme::for_settings(&settings),
            settings,
            engine,
            screen: Screen::Login,
            ui: UiState::default(),
            login: LoginForm::default(),
            player: None,
            game: GameView::default(),
            report_trigger: ReportTrigger::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.ui.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Game closed");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                if let Err(err) = self.handle_key(key) {
                    error!(?err, "Key handling failed");
                    self.ui.set_status(format!("Error: {err:#}"));
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        let now = EventTime::now();
        let Some(session) = self.game.state.session() else {
            return;
        };
        if session.is_timed_out(now.millis) {
            let question_seq = session.question_seq;
            self.dispatch(SessionEvent::Timeout {
                question_seq,
                at: now,
            });
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.ui.should_quit = true;
            return Ok(());
        }
        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Map => self.handle_map_key(key),
            Screen::Game => {
                self.handle_game_key(key);
                Ok(())
            }
            Screen::Shop => self.handle_shop_key(key),
            Screen::Leaderboard => {
                self.handle_leaderboard_key(key);
                Ok(())
            }
        }
    }

    fn login_avatars(&self) -> Vec<String> {
        match self.registry.find_by_name(&self.login.name) {
            Some(player) => shop::owned_avatars(player),
            None => STARTER_AVATARS.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.ui.should_quit = true,
            KeyCode::Enter => self.submit_login()?,
            KeyCode::Backspace => self.login.backspace(),
            KeyCode::Left | KeyCode::Right => {
                let total = self.login_avatars().len().max(1);
                self.login.avatar_index = if key.code == KeyCode::Left {
                    (self.login.avatar_index + total - 1) % total
                } else {
                    (self.login.avatar_index + 1) % total
                };
            }
            KeyCode::Up | KeyCode::Down => {
                let total = self.registry.len();
                if total == 0 {
                    return Ok(());
                }
                let next = match (self.login.player_cursor, key.code) {
                    (None, KeyCode::Up) => total - 1,
                    (None, _) => 0,
                    (Some(index), KeyCode::Up) => (index + total - 1) % total,
                    (Some(index), _) => (index + 1) % total,
                };
                let player = &self.registry.all()[next];
                self.login.name = player.name.clone();
                self.login.avatar_index = shop::owned_avatars(player)
                    .iter()
                    .position(|id| *id == player.avatar)
                    .unwrap_or(0);
                self.login.player_cursor = Some(next);
            }
            KeyCode::Char(ch) if !ch.is_control() => self.login.insert(ch),
            _ => {}
        }
        Ok(())
    }

    fn submit_login(&mut self) -> Result<()> {
        let avatars = self.login_avatars();
        let avatar = avatars
            .get(self.login.avatar_index)
            .or_else(|| avatars.first())
            .cloned()
            .unwrap_or_default();
        let outcome = match self.registry.login(&self.login.name, &avatar) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.ui.set_status(err.to_string());
                return Ok(());
            }
        };

        let greeting = if outcome.is_new {
            self.play_audio(WELCOME_AUDIO);
            format!("Welcome, {}!", outcome.player.name)
        } else {
            self.play_audio(WELCOME_BACK_AUDIO);
            format!("Welcome back, {}!", outcome.player.name)
        };
        self.ui.map_cursor = outcome.player.unlocked.clamp(1, TABLE_COUNT);
        self.player = Some(outcome.player);
        self.registry
            .flush(&self.store)
            .context("failed to save player list")?;
        self.ui.set_status(greeting);
        self.screen = Screen::Map;
        Ok(())
    }

    fn handle_map_key(&mut self, key: KeyEvent) -> Result<()> {
        let cursor = self.ui.map_cursor;
        match key.code {
            KeyCode::Left if cursor > 1 => self.ui.map_cursor -= 1,
            KeyCode::Right if cursor < TABLE_COUNT => self.ui.map_cursor += 1,
            KeyCode::Up if cursor > MAP_COLUMNS => self.ui.map_cursor -= MAP_COLUMNS,
            KeyCode::Down if cursor + MAP_COLUMNS <= TABLE_COUNT => {
                self.ui.map_cursor += MAP_COLUMNS
            }
            KeyCode::Enter => self.start_level(cursor),
            KeyCode::Char('s') => {
                self.ui.shop_cursor = 0;
                self.screen = Screen::Shop;
                self.ui
                    .set_status("Enter buys or wears an avatar • Esc back to map");
            }
            KeyCode::Char('l') => {
                self.ui.leaderboard_cursor = 0;
                self.screen = Screen::Leaderboard;
            }
            KeyCode::Char('m') => {
                let muted = self.settings.toggle_mute(&self.store)?;
                self.ui
                    .set_status(if muted { "Sound off" } else { "Sound on" });
            }
            KeyCode::Char('d') => {
                let dark = self.settings.toggle_dark_mode(&self.store)?;
                self.theme = Theme::for_settings(&self.settings);
                self.ui
                    .set_status(if dark { "Dark mode" } else { "Light mode" });
            }
            KeyCode::Char('r') => {
                if self.report_trigger.press(EventTime::now().millis) {
                    self.export_report();
                }
            }
            KeyCode::Char('o') => self.logout(),
            KeyCode::Char('q') | KeyCode::Esc => self.ui.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn start_level(&mut self, table: u32) {
        let Some(player) = self.player.as_ref() else {
            return;
        };
        match self.engine.start(player, table, EventTime::now()) {
            Ok(state) => {
                self.game = GameView {
                    state,
                    cursor: 0,
                    feedback: None,
                };
                self.screen = Screen::Game;
                self.ui.set_status(format!(
                    "Table {table}: pick an answer with the arrows and Enter, or press 1-4"
                ));
            }
            Err(err) => self.ui.set_status(err.to_string()),
        }
    }

    fn export_report(&mut self) {
        let Some(player) = self.player.as_ref() else {
            return;
        };
        match report::export(player, &self.config.report_dir) {
            Ok(path) => self
                .ui
                .set_status(format!("Report saved to {}", path.display())),
            Err(err @ ReportError::NoHistory(_)) => self.ui.set_status(err.to_string()),
            Err(err) => {
                error!(?err, "Report export failed");
                self.ui.set_status(err.to_string());
            }
        }
    }

    fn logout(&mut self) {
        if let Some(player) = self.player.take() {
            info!(player = %player.name, "Player logged out");
        }
        self.login = LoginForm::default();
        self.game = GameView::default();
        self.screen = Screen::Login;
        self.ui.set_status("Type your name and press Enter");
    }

    fn handle_game_key(&mut self, key: KeyEvent) {
        match &self.game.state {
            SessionState::AwaitingAnswer(session) => {
                if key.code == KeyCode::Esc {
                    info!(table = session.table, step = session.step_index, "Level abandoned");
                    self.game = GameView::default();
                    self.screen = Screen::Map;
                    self.ui.set_status("Level abandoned");
                    return;
                }
                let now = EventTime::now();
                if !session.is_question_visible(now.millis) {
                    return;
                }
                let options = session.question.options;
                let cursor = self.game.cursor;
                match key.code {
                    KeyCode::Left | KeyCode::Right => self.game.cursor = cursor ^ 1,
                    KeyCode::Up | KeyCode::Down => self.game.cursor = cursor ^ 2,
                    KeyCode::Enter => self.dispatch(SessionEvent::Answer {
                        value: options[cursor],
                        at: now,
                    }),
                    KeyCode::Char(ch) => {
                        let picked = ch
                            .to_digit(10)
                            .and_then(|digit| usize::try_from(digit).ok())
                            .filter(|digit| (1..=OPTION_COUNT).contains(digit));
                        if let Some(digit) = picked {
                            self.game.cursor = digit - 1;
                            self.dispatch(SessionEvent::Answer {
                                value: options[digit - 1],
                                at: now,
                            });
                        }
                    }
                    _ => {}
                }
            }
            _ => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.game = GameView::default();
                    self.screen = Screen::Map;
                }
            }
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let Some(player) = self.player.take() else {
            warn!(?event, "Session event without a logged-in player");
            return;
        };
        let state = mem::take(&mut self.game.state);
        let transition = self.engine.handle(state, player, event);
        self.game.state = transition.state;
        self.player = Some(transition.player);

        let Some(evaluation) = transition.evaluation else {
            return;
        };
        self.play_audio(evaluation.cue.audio);
        self.game.feedback = Some(FeedbackBanner::from_evaluation(&evaluation));
        self.game.cursor = 0;
        self.persist_player();

        match &self.game.state {
            SessionState::LevelComplete(summary) => {
                self.ui.set_status(level_complete_message(summary));
                if let Some(table) = summary.unlocked_table {
                    self.ui.map_cursor = table.min(TABLE_COUNT);
                }
            }
            SessionState::GameOver(summary) => self.ui.set_status(game_over_message(summary)),
            _ => {}
        }
    }

    fn persist_player(&mut self) {
        let Some(player) = self.player.clone() else {
            return;
        };
        self.registry.upsert(player);
        if let Err(err) = self.registry.flush(&self.store) {
            error!(?err, "Failed to save progress");
            self.ui
                .set_status(format!("Progress could not be saved: {err:#}"));
        }
    }

    fn handle_shop_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = CATALOGUE.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.screen = Screen::Map;
                self.ui.set_status("Back on the map");
            }
            KeyCode::Up => self.ui.shop_cursor = (self.ui.shop_cursor + total - 1) % total,
            KeyCode::Down => self.ui.shop_cursor = (self.ui.shop_cursor + 1) % total,
            KeyCode::Enter => {
                let item = &CATALOGUE[self.ui.shop_cursor];
                let Some(player) = self.player.as_mut() else {
                    return Ok(());
                };
                let result = if shop::is_owned(player, item.id) {
                    shop::select_avatar(player, item.id).map(|()| format!("Now wearing {}", item.name))
                } else {
                    shop::purchase(player, item)
                        .map(|()| format!("You bought {} for {} coins!", item.name, item.cost))
                };
                match result {
                    Ok(message) => {
                        self.ui.set_status(message);
                        self.persist_player();
                    }
                    Err(err) => self.ui.set_status(err.to_string()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_leaderboard_key(&mut self, key: KeyEvent) {
        let total = self.registry.len().max(1);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::Map,
            KeyCode::Up => {
                self.ui.leaderboard_cursor = self.ui.leaderboard_cursor.saturating_sub(1)
            }
            KeyCode::Down => {
                self.ui.leaderboard_cursor = (self.ui.leaderboard_cursor + 1).min(total - 1)
            }
            _ => {}
        }
    }

    fn play_audio(&self, clip: &str) {
        if self.settings.muted {
            return;
        }
        debug!(clip, "Audio cue");
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(Block::default().style(self.theme.base()), area);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_header(frame, layout[0]);
        match self.screen {
            Screen::Login => self.draw_login(frame, layout[1]),
            Screen::Map => self.draw_map(frame, layout[1]),
            Screen::Game => self.draw_game(frame, layout[1]),
            Screen::Shop => self.draw_shop(frame, layout[1]),
            Screen::Leaderboard => self.draw_leaderboard(frame, layout[1]),
        }
        self.render_status(frame, layout[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.player {
            Some(player) => {
                let hearts = "♥".repeat(player.lives as usize);
                let empty = "♡".repeat(MAX_LIVES.saturating_sub(player.lives) as usize);
                Line::from(vec![
                    Span::styled(
                        format!("{} {}", player.avatar, player.name),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("   "),
                    Span::styled(hearts, Style::default().fg(self.theme.danger)),
                    Span::styled(empty, Style::default().fg(self.theme.muted)),
                    Span::raw(format!(
                        "   Coins: {}   Best: {}   Tables: {}/{}",
                        player.coins,
                        player.high_score,
                        player.unlocked.min(TABLE_COUNT),
                        TABLE_COUNT
                    )),
                ])
            }
            None => Line::from(Span::styled(
                "MultiAventura",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
        };
        let sound = if self.settings.muted { "muted" } else { "sound on" };
        let header = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("MultiAventura ({sound})")),
        );
        frame.render_widget(header, area);
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect) {
        let banner_lines = block_font::render("MULTIAVENTURA");
        let banner_height = banner_lines.len() as u16;
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length((banner_height + 1).min(area.height)),
                Constraint::Min(6),
            ])
            .split(area);
        if usize::from(layout[0].width) >= block_font::width(&banner_lines) {
            self.render_banner(frame, layout[0], &banner_lines);
        }

        let avatars = self.login_avatars();
        let avatar_row: Vec<Span> = avatars
            .iter()
            .enumerate()
            .flat_map(|(index, avatar)| {
                let style = if index == self.login.avatar_index {
                    Style::default()
                        .bg(self.theme.selection_bg)
                        .fg(self.theme.selection_fg)
                } else {
                    Style::default()
                };
                [Span::styled(format!(" {avatar} "), style), Span::raw(" ")]
            })
            .collect();

        let lines = vec![
            Line::from(vec![
                Span::raw("Name: "),
                Span::styled(
                    format!("{}▏", self.login.name),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
            Line::from(avatar_row),
            Line::from(""),
            Line::from(Span::styled(
                "←/→ avatar • ↑/↓ saved players • Enter play • Esc quit",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let form_area = centered_rect(64, 9, layout[1]);
        frame.render_widget(Clear, form_area);
        let form = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Who is playing?"))
            .style(self.theme.base())
            .alignment(Alignment::Center);
        frame.render_widget(form, form_area);
    }

    fn draw_map(&self, frame: &mut Frame, area: Rect) {
        let Some(player) = self.player.as_ref() else {
            return;
        };
        let block = Block::default().borders(Borders::ALL).title("Level map");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = TABLE_COUNT.div_ceil(MAP_COLUMNS);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(2)])
            .split(inner);
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints((0..rows).map(|_| Constraint::Ratio(1, rows)))
            .split(layout[0]);

        for (row, row_area) in row_areas.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints((0..MAP_COLUMNS).map(|_| Constraint::Ratio(1, MAP_COLUMNS)))
                .split(*row_area);
            for (column, cell) in cells.iter().enumerate() {
                let table = row as u32 * MAP_COLUMNS + column as u32 + 1;
                if table > TABLE_COUNT {
                    continue;
                }
                let unlocked = player.can_play(table);
                let label = if unlocked {
                    format!("Table {table}")
                } else {
                    format!("🔒 {table}")
                };
                let mut style = if unlocked {
                    Style::default().fg(self.theme.success)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                if table == self.ui.map_cursor {
                    style = style
                        .bg(self.theme.selection_bg)
                        .add_modifier(Modifier::BOLD);
                }
                let tile = Paragraph::new(label)
                    .style(style)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(tile, *cell);
            }
        }

        let help = Paragraph::new(Line::from(Span::styled(
            "Arrows move • Enter play • s shop • l leaderboard • m sound • d dark mode • o log out • q quit",
            Style::default().fg(self.theme.muted),
        )))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(help, layout[1]);
    }

    fn draw_game(&self, frame: &mut Frame, area: Rect) {
        match &self.game.state {
            SessionState::AwaitingAnswer(_) => self.draw_question(frame, area),
            SessionState::LevelComplete(summary) => {
                self.draw_summary(frame, area, "Level complete!", level_complete_message(summary))
            }
            SessionState::GameOver(summary) => {
                self.draw_summary(frame, area, "Game over", game_over_message(summary))
            }
            SessionState::Idle => {}
        }
    }

    fn draw_question(&self, frame: &mut Frame, area: Rect) {
        let Some(session) = self.game.state.session() else {
            return;
        };
        let now_ms = EventTime::now().millis;
        let visible = session.is_question_visible(now_ms);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(7),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .split(area);

        let total_ms = u64::from(session.timeout_seconds) * 1_000;
        let remaining_ms = session.remaining_ms(now_ms);
        let ratio = if total_ms == 0 {
            0.0
        } else {
            (remaining_ms as f64 / total_ms as f64).clamp(0.0, 1.0)
        };
        let timer_color = if ratio > 0.5 {
            self.theme.success
        } else if ratio > 0.2 {
            self.theme.warning
        } else {
            self.theme.danger
        };
        let timer = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Table {} • Question {}/{} • Correct {}",
                session.table,
                session.step_index + 1,
                session.max_steps,
                session.correct_count
            )))
            .gauge_style(Style::default().fg(timer_color).bg(self.theme.primary_bg))
            .ratio(ratio)
            .label(format!("{:.1}s", remaining_ms as f64 / 1000.0));
        frame.render_widget(timer, layout[0]);

        if visible {
            let lines = block_font::render(&session.question.text());
            if usize::from(layout[1].width) >= block_font::width(&lines) {
                self.render_banner(frame, layout[1], &lines);
            } else {
                let text = Paragraph::new(session.question.text())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.accent));
                frame.render_widget(text, layout[1]);
            }
            self.render_options(frame, layout[2], &session.question.options);
        } else {
            let waiting = Paragraph::new("Get ready for the next one...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(self.theme.muted));
            frame.render_widget(waiting, layout[1]);
        }

        if let Some(feedback) = &self.game.feedback {
            self.render_feedback(frame, layout[3], feedback);
        }
    }

    fn render_options(&self, frame: &mut Frame, area: Rect, options: &[u32; OPTION_COUNT]) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
            .split(area);
        for (row, row_area) in rows.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
                .split(*row_area);
            for (column, cell) in cells.iter().enumerate() {
                let index = row * 2 + column;
                let style = if index == self.game.cursor {
                    Style::default()
                        .bg(self.theme.selection_bg)
                        .fg(self.theme.selection_fg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                let option = Paragraph::new(options[index].to_string())
                    .style(style)
                    .alignment(Alignment::Center)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(format!("{}", index + 1)),
                    );
                frame.render_widget(option, *cell);
            }
        }
    }

    fn render_feedback(&self, frame: &mut Frame, area: Rect, feedback: &FeedbackBanner) {
        let color = match feedback.outcome {
            Outcome::Correct => self.theme.success,
            Outcome::Incorrect => self.theme.danger,
        };
        let line = Line::from(vec![
            Span::styled(
                feedback.message.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(feedback.detail.clone()),
        ]);
        let paragraph = Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn draw_summary(&self, frame: &mut Frame, area: Rect, title: &str, message: String) {
        let mut lines = vec![Line::from(message), Line::from("")];
        if let Some(feedback) = &self.game.feedback {
            lines.insert(0, Line::from(feedback.detail.clone()));
        }
        lines.push(Line::from(Span::styled(
            "Press Enter to return to the map",
            Style::default().fg(self.theme.muted),
        )));
        let summary_area = centered_rect(60, 9, area);
        frame.render_widget(Clear, summary_area);
        let paragraph = Paragraph::new(lines)
            .style(self.theme.base())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )),
            );
        frame.render_widget(paragraph, summary_area);
    }

    fn draw_shop(&self, frame: &mut Frame, area: Rect) {
        let Some(player) = self.player.as_ref() else {
            return;
        };
        let items: Vec<ListItem> = CATALOGUE
            .iter()
            .map(|item| {
                let (tag, style) = if player.avatar == item.id && shop::is_owned(player, item.id) {
                    ("wearing", Style::default().fg(self.theme.accent))
                } else if shop::is_owned(player, item.id) {
                    ("owned", Style::default().fg(self.theme.success))
                } else if player.coins >= item.cost {
                    ("", Style::default().fg(self.theme.primary_fg))
                } else {
                    ("", Style::default().fg(self.theme.muted))
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{} ", item.id)),
                    Span::styled(format!("{:<20}", item.name), style),
                    Span::raw(format!("{:>5} coins  ", item.cost)),
                    Span::styled(tag, style.add_modifier(Modifier::ITALIC)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Avatar shop • {} coins", player.coins)),
            )
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg),
            )
            .highlight_symbol("▶ ");
        let mut state = ListState::default().with_selected(Some(self.ui.shop_cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_leaderboard(&self, frame: &mut Frame, area: Rect) {
        let rows = self.registry.leaderboard();
        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| {
                let style = if row.rank == 1 {
                    Style::default()
                        .fg(self.theme.warning)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                ListItem::new(Line::from(Span::styled(
                    format!(
                        "{:>3}. {} {:<16} {:>3} pts   table {}",
                        row.rank,
                        row.player.avatar,
                        row.player.name,
                        row.player.high_score,
                        row.player.unlocked.min(TABLE_COUNT)
                    ),
                    style,
                )))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Leaderboard • Esc back"),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        let selected = (!rows.is_empty()).then_some(self.ui.leaderboard_cursor);
        let mut state = ListState::default().with_selected(selected);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(Line::from(self.ui.status.clone()))
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect, lines: &[String]) {
        let content: Vec<Line> = lines
            .iter()
            .map(|line| {
                Line::from(Span::styled(
                    line.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ))
            })
            .collect();
        let paragraph = Paragraph::new(content).alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }
}

fn level_complete_message(summary: &LevelSummary) -> String {
    let mut message = format!(
        "Table {}: {}/{} correct ({:.0}%).",
        summary.table,
        summary.correct_count,
        summary.max_steps,
        summary.accuracy() * 100.0
    );
    match summary.unlocked_table {
        Some(next) if next <= TABLE_COUNT => {
            message.push_str(&format!(" Table {next} unlocked!"))
        }
        Some(_) => message.push_str(" Every table is unlocked!"),
        None => {
            let needed = (UNLOCK_ACCURACY * f64::from(summary.max_steps)).ceil();
            message.push_str(&format!(" Get {needed} right to unlock the next table."))
        }
    }
    if let Some(score) = summary.new_high_score {
        message.push_str(&format!(" New best: {score}!"));
    }
    message
}

fn game_over_message(summary: &GameOverSummary) -> String {
    format!(
        "Out of lives on table {} after {} questions ({} correct). Your lives are refilled.",
        summary.table, summary.answered, summary.correct_count
    )
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_trigger_needs_three_quick_presses() {
        let mut trigger = ReportTrigger::default();
        assert!(!trigger.press(0));
        assert!(!trigger.press(500));
        assert!(trigger.press(1_200));
        assert!(!trigger.press(1_300));
    }

    #[test]
    fn report_trigger_forgets_slow_presses() {
        let mut trigger = ReportTrigger::default();
        assert!(!trigger.press(0));
        assert!(!trigger.press(1_500));
        assert!(!trigger.press(3_000));
        assert!(trigger.press(3_400));
    }

    #[test]
    fn login_form_caps_name_length() {
        let mut form = LoginForm::default();
        for ch in "abcdefghijklmnopqrstuvwxyz".chars() {
            form.insert(ch);
        }
        assert_eq!(form.name.chars().count(), MAX_NAME_LEN);
        form.backspace();
        assert_eq!(form.name.chars().count(), MAX_NAME_LEN - 1);
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(2, 3, 20, 10);
        let rect = centered_rect(40, 4, area);
        assert_eq!(rect.width, 20);
        assert_eq!(rect.x, 2);
        assert_eq!(rect.y, 6);
    }

    #[test]
    fn level_complete_message_mentions_unlock() {
        let summary = LevelSummary {
            table: 3,
            correct_count: 8,
            max_steps: 10,
            unlocked_table: Some(4),
            new_high_score: Some(8),
        };
        let message = level_complete_message(&summary);
        assert!(message.contains("Table 4 unlocked"));
        assert!(message.contains("New best: 8"));
    }
}
