//! Terminal harness: a fake screen with a draggable sliding panel.
//!
//! Stands in for the mobile host. Terminal rows map to device-independent
//! units, the top row doubles as the status-bar drag control, and panel
//! events are shown in a small log inside the panel body.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use tracing::debug;

use slidepane_core::{
    GestureSource, PanelConfig, PanelController, PanelEvent, PointerSample, PositionId,
    ScreenMetrics, Subpanel,
};

/// Device-independent units represented by one terminal row.
const DIP_PER_ROW: f64 = 10.0;
/// Panel strip that stays visible when closed, in units.
const VISIBLE_HEIGHT_CLOSED: f64 = 110.0;

const HELP: &str = "drag panel or top bar | t/m/b move | o open  c close  space toggle | 1/2/3 subpanel | l landscape | q quit";

struct App {
    controller: PanelController,
    landscape: bool,
    screen_rows: u16,
    /// Live drag: source and the row where the pointer went down.
    drag: Option<(GestureSource, u16)>,
    log: VecDeque<String>,
}

impl App {
    fn new(controller: PanelController, rows: u16) -> Self {
        Self {
            controller,
            landscape: false,
            screen_rows: rows,
            drag: None,
            log: VecDeque::new(),
        }
    }

    fn metrics(&self) -> ScreenMetrics {
        ScreenMetrics {
            screen_height: self.screen_rows as f64 * DIP_PER_ROW,
            visible_height_closed: VISIBLE_HEIGHT_CLOSED,
        }
    }

    fn panel_top_row(&self) -> u16 {
        let value = self.controller.current_value().unwrap_or(0.0);
        let row = (value / DIP_PER_ROW).round();
        row.clamp(0.0, self.screen_rows.saturating_sub(1) as f64) as u16
    }

    fn push_log(&mut self, event: &PanelEvent) {
        let line = match event {
            PanelEvent::PositionChanged { position, value } => {
                format!("position -> {position} ({value:.0})")
            }
            PanelEvent::OpenStateChanged { is_open } => {
                format!("open -> {is_open}")
            }
            PanelEvent::ActiveSubpanelChanged { subpanel } => {
                format!("subpanel -> {subpanel}")
            }
        };
        self.log.push_front(line);
        self.log.truncate(6);
    }

    fn spawn_move(&self, target: PositionId) {
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.move_to(target).await;
        });
    }

    /// Returns false when the app should quit.
    fn on_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('t') => self.spawn_move(PositionId::Top),
            KeyCode::Char('m') => self.spawn_move(PositionId::Middle),
            KeyCode::Char('b') => self.spawn_move(PositionId::Bottom),
            KeyCode::Char('o') => {
                let controller = self.controller.clone();
                tokio::spawn(async move { controller.open().await });
            }
            KeyCode::Char('c') => {
                let controller = self.controller.clone();
                tokio::spawn(async move { controller.close().await });
            }
            KeyCode::Char(' ') => {
                let controller = self.controller.clone();
                tokio::spawn(async move { controller.toggle().await });
            }
            KeyCode::Char('1') => self.controller.set_active_subpanel(Subpanel::Quick),
            KeyCode::Char('2') => self.controller.set_active_subpanel(Subpanel::Search),
            KeyCode::Char('3') => self.controller.set_active_subpanel(Subpanel::Layers),
            KeyCode::Char('l') => {
                self.landscape = !self.landscape;
                self.controller.set_orientation(self.landscape);
                self.controller.set_metrics(self.metrics());
            }
            _ => {}
        }
        true
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let source = if mouse.row == 0 {
                    Some(GestureSource::StatusBar)
                } else if mouse.row >= self.panel_top_row() {
                    Some(GestureSource::Panel)
                } else {
                    None
                };
                if let Some(source) = source {
                    self.drag = Some((source, mouse.row));
                    self.controller.handle_pointer(source, PointerSample::start());
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((source, origin)) = self.drag {
                    let delta_y = (mouse.row as f64 - origin as f64) * DIP_PER_ROW;
                    self.controller
                        .handle_pointer(source, PointerSample::moved(0.0, delta_y));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some((source, _)) = self.drag.take() {
                    self.controller.handle_pointer(source, PointerSample::end());
                }
            }
            _ => {}
        }
    }

    fn on_resize(&mut self, rows: u16) {
        self.screen_rows = rows;
        self.controller.set_metrics(self.metrics());
        debug!(rows, "terminal resized");
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        // Fake map background.
        let map = Block::default()
            .borders(Borders::NONE)
            .style(Style::default().bg(Color::Rgb(18, 36, 28)));
        frame.render_widget(map, area);

        // Status bar: the secondary drag control.
        let position = self
            .controller
            .current_position()
            .map(|p| p.as_str())
            .unwrap_or("-");
        let status = Paragraph::new(Line::from(vec![
            Span::styled(" slidepane ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "pos={} open={} sub={} {}",
                position,
                self.controller.is_open(),
                self.controller
                    .active_subpanel()
                    .map(|s| s.as_str())
                    .unwrap_or("-"),
                if self.landscape { "[landscape]" } else { "" }
            )),
        ]))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(
            status,
            Rect {
                height: area.height.min(1),
                ..area
            },
        );

        // The panel itself, from its current offset down to the bottom.
        let top = self.panel_top_row().max(1);
        let panel_area = Rect {
            x: area.x,
            y: top,
            width: area.width,
            height: area.height.saturating_sub(top),
        };
        frame.render_widget(Clear, panel_area);

        let mut lines: Vec<Line> = vec![Line::from(HELP), Line::from("")];
        lines.extend(self.log.iter().map(|entry| Line::from(entry.as_str())));

        let panel = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    " {} @ {:.0} ",
                    position,
                    self.controller.current_value().unwrap_or(0.0)
                ))
                .style(Style::default().bg(Color::Rgb(30, 30, 40)).fg(Color::Gray)),
        );
        frame.render_widget(panel, panel_area);
    }
}

/// Read terminal events on a blocking thread and forward them.
fn spawn_input_thread(tx: mpsc::UnboundedSender<Event>) {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {}
            Err(_) => break,
        }
    });
}

pub async fn run(config: PanelConfig) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: PanelConfig,
) -> Result<()> {
    let (panel_tx, mut panel_rx) = mpsc::unbounded_channel();
    let controller = PanelController::new(config, panel_tx);

    let size = terminal.size()?;
    let mut app = App::new(controller, size.height);
    app.controller.mount(app.metrics(), false);

    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    spawn_input_thread(input_tx);

    let mut render = tokio::time::interval(Duration::from_millis(33));

    loop {
        tokio::select! {
            Some(event) = input_rx.recv() => {
                match event {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !app.on_key(key.code) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => app.on_mouse(mouse),
                    Event::Resize(_, rows) => app.on_resize(rows),
                    _ => {}
                }
            }
            Some(event) = panel_rx.recv() => {
                app.push_log(&event);
            }
            _ = render.tick() => {
                terminal.draw(|frame| app.draw(frame))?;
            }
        }
    }

    app.controller.unmount();
    Ok(())
}
