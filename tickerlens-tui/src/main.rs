use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
};
use smol_str::SmolStr;
use std::{io, sync::Arc, time::Duration};
use tickerlens_engine::{
    AggregationEngine, ClassifiedLevels, FeedEvent, IndicatorKind, PositionSnapshot, RowRole,
    Timeframe, project_scalars,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod feed;

use feed::{ConnectionStatus, FeedConfig};

/// Scalar indicators shown in the left panel, in display order.
const SCALAR_KINDS: [IndicatorKind; 7] = [
    IndicatorKind::Ema50,
    IndicatorKind::Ema200,
    IndicatorKind::Rsi,
    IndicatorKind::Macd,
    IndicatorKind::FibonacciBollingerBands,
    IndicatorKind::Vwap,
    IndicatorKind::BollingerBands,
];

/// Level-capable indicators cycled through the levels panel.
const LEVEL_KINDS: [IndicatorKind; 3] = [
    IndicatorKind::SupportResistance,
    IndicatorKind::PivotPointsStandard,
    IndicatorKind::PivotPointsHighLow,
];

/// Application state: the engine plus view selection.
struct App {
    engine: AggregationEngine,
    connected: bool,
    symbol_idx: usize,
    timeframe_idx: usize,
    level_idx: usize,
}

impl App {
    fn new() -> Self {
        Self {
            engine: AggregationEngine::new(),
            connected: false,
            symbol_idx: 0,
            timeframe_idx: 0,
            level_idx: 0,
        }
    }

    fn selected_symbol(&self) -> Option<SmolStr> {
        let symbols = self.engine.symbols();
        if symbols.is_empty() {
            return None;
        }
        symbols.get(self.symbol_idx % symbols.len()).cloned()
    }

    fn selected_timeframe(&self) -> Option<Timeframe> {
        let timeframes = self.engine.ordered_timeframes();
        if timeframes.is_empty() {
            return None;
        }
        timeframes.get(self.timeframe_idx % timeframes.len()).copied()
    }

    fn level_kind(&self) -> IndicatorKind {
        LEVEL_KINDS[self.level_idx % LEVEL_KINDS.len()]
    }

    /// Advance the symbol selection; returns the newly selected symbol so the
    /// caller can emit a subscribe intent.
    fn cycle_symbol(&mut self, step: isize) -> Option<SmolStr> {
        let count = self.engine.symbols().len();
        if count == 0 {
            return None;
        }
        self.symbol_idx = (self.symbol_idx as isize + step).rem_euclid(count as isize) as usize;
        self.selected_symbol()
    }

    fn cycle_timeframe(&mut self, step: isize) {
        let count = self.engine.ordered_timeframes().len();
        if count == 0 {
            return;
        }
        self.timeframe_idx =
            (self.timeframe_idx as isize + step).rem_euclid(count as isize) as usize;
    }

    fn cycle_level_kind(&mut self) {
        self.level_idx = (self.level_idx + 1) % LEVEL_KINDS.len();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // TUI owns stdout; logs go to stderr and are filtered via RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = FeedConfig::from_env();
    let app = Arc::new(Mutex::new(App::new()));

    // Pre-populate the position book before the stream's first snapshot
    match feed::fetch_initial_positions(&config).await {
        Ok(symbols) => {
            info!(positions = symbols.len(), "loaded initial position snapshot");
            let event: FeedEvent = PositionSnapshot { symbols }.into();
            app.lock().await.engine.apply(&event);
        }
        Err(e) => warn!("{e}; starting with an empty position book"),
    }

    let handles = feed::start(config);
    let subscribe = handles.subscribe.clone();
    spawn_feed_consumer(app.clone(), handles);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, subscribe).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    let _ = res;

    Ok(())
}

/// Apply feed events and connection status to the shared app state.
fn spawn_feed_consumer(app: Arc<Mutex<App>>, mut handles: feed::FeedHandles) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = handles.events.recv() => {
                    let Some(event) = event else { break };
                    app.lock().await.engine.apply(&event);
                }
                status = handles.status.recv() => {
                    let Some(status) = status else { break };
                    app.lock().await.connected = status == ConnectionStatus::Connected;
                }
            }
        }
    });
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: Arc<Mutex<App>>,
    subscribe: mpsc::Sender<SmolStr>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();

    loop {
        {
            let app = app.lock().await;
            terminal.draw(|f| ui(f, &app))?;
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                let mut app = app.lock().await;
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Tab | KeyCode::Right => {
                        if let Some(symbol) = app.cycle_symbol(1) {
                            // narrow the feed to the viewed symbol
                            let _ = subscribe.try_send(symbol);
                        }
                    }
                    KeyCode::Left => {
                        if let Some(symbol) = app.cycle_symbol(-1) {
                            let _ = subscribe.try_send(symbol);
                        }
                    }
                    KeyCode::Down => app.cycle_timeframe(1),
                    KeyCode::Up => app.cycle_timeframe(-1),
                    KeyCode::Char('l') => app.cycle_level_kind(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = std::time::Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(size);

    render_status_bar(f, chunks[0], app);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .margin(1)
        .split(chunks[1]);

    render_indicators(f, main_chunks[0], app);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);

    render_levels(f, right_chunks[0], app);
    render_positions(f, right_chunks[1], app);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let status_symbol = if app.connected { "●" } else { "○" };
    let status_color = if app.connected {
        Color::Rgb(0, 255, 127)
    } else {
        Color::Rgb(255, 69, 58)
    };
    let status_text = if app.connected {
        "CONNECTED"
    } else {
        "DISCONNECTED"
    };

    let status = Span::styled(
        format!(" {} {} ", status_symbol, status_text),
        Style::default()
            .fg(status_color)
            .add_modifier(Modifier::BOLD),
    );

    let symbol = app
        .selected_symbol()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "—".to_string());
    let price = app
        .selected_symbol()
        .map(|s| app.engine.last_price(&s))
        .unwrap_or(0.0);
    let instrument = Span::styled(
        format!(" {} @ {:.2} ", symbol, price),
        Style::default()
            .fg(Color::Rgb(255, 215, 0))
            .add_modifier(Modifier::BOLD),
    );

    // discovered timeframes in canonical order, selection highlighted
    let mut tf_spans: Vec<Span> = Vec::new();
    let selected_tf = app.selected_timeframe();
    for tf in app.engine.ordered_timeframes() {
        let style = if Some(tf) == selected_tf {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(100, 149, 237))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Rgb(100, 149, 237))
        };
        tf_spans.push(Span::styled(format!(" {} ", tf.label()), style));
    }

    // stale data keeps displaying; the clock just turns red
    let (last_update, stale) = match app.engine.last_update() {
        Some(t) => (
            t.format("%H:%M:%S").to_string(),
            (Utc::now() - t).num_seconds() > 10,
        ),
        None => ("--:--:--".to_string(), true),
    };
    let staleness = Span::styled(
        format!(" ⏱ {} ", last_update),
        Style::default().fg(if stale {
            Color::Rgb(255, 69, 58)
        } else {
            Color::Rgb(128, 128, 150)
        }),
    );

    let help = Span::styled(
        " [Tab] Symbol [↑↓] Timeframe [L] Levels [Q] Quit ",
        Style::default().fg(Color::Rgb(128, 128, 128)),
    );

    let mut spans = vec![status, instrument];
    spans.extend(tf_spans);
    spans.push(staleness);
    spans.push(help);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Rgb(138, 43, 226)));

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_indicators(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" INDICATORS ")
        .border_style(Style::default().fg(Color::Rgb(0, 120, 255)));

    let (Some(symbol), Some(timeframe)) = (app.selected_symbol(), app.selected_timeframe()) else {
        let placeholder = Paragraph::new("waiting for indicator updates...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(placeholder, area);
        return;
    };

    let mut items: Vec<ListItem> = Vec::new();
    for kind in SCALAR_KINDS {
        let name = Span::styled(
            format!(" {:<24}", kind.as_key()),
            Style::default().fg(Color::Rgb(100, 149, 237)),
        );

        let readings = app
            .engine
            .indicator_value(&symbol, timeframe.as_str(), kind)
            .map(|value| project_scalars(kind, value))
            .unwrap_or_default();

        let mut spans = vec![name];
        if readings.is_empty() {
            spans.push(Span::styled("—", Style::default().fg(Color::DarkGray)));
        } else {
            for reading in readings {
                spans.push(Span::styled(
                    format!("{}={:<12.2} ", reading.field, reading.value),
                    Style::default().fg(Color::White),
                ));
            }
        }
        items.push(ListItem::new(Line::from(spans)));
    }

    // candlestick patterns surface their label texts raw
    let patterns = app
        .engine
        .indicator_value(&symbol, timeframe.as_str(), IndicatorKind::CandlestickPatterns)
        .and_then(|value| value.labels())
        .map(|labels| {
            labels
                .iter()
                .map(|label| label.text.as_str())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    if !patterns.is_empty() {
        items.push(ListItem::new(Line::from(vec![
            Span::styled(
                format!(" {:<24}", IndicatorKind::CandlestickPatterns.as_key()),
                Style::default().fg(Color::Rgb(100, 149, 237)),
            ),
            Span::styled(patterns, Style::default().fg(Color::Rgb(255, 215, 0))),
        ])));
    }

    // oscillator bands render as y1..y2 segments
    if let Some(lines) = app
        .engine
        .indicator_value(&symbol, timeframe.as_str(), IndicatorKind::OscillatorBands)
        .and_then(|value| value.lines())
    {
        let bands = lines
            .iter()
            .map(|line| format!("{:.2}..{:.2}", line.y1, line.y2))
            .collect::<Vec<_>>()
            .join("  ");
        if !bands.is_empty() {
            items.push(ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" {:<24}", IndicatorKind::OscillatorBands.as_key()),
                    Style::default().fg(Color::Rgb(100, 149, 237)),
                ),
                Span::styled(bands, Style::default().fg(Color::White)),
            ])));
        }
    }

    f.render_widget(List::new(items).block(block), area);
}

fn render_levels(f: &mut Frame, area: Rect, app: &App) {
    let kind = app.level_kind();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" LEVELS · {} ", kind.as_key()))
        .border_style(Style::default().fg(Color::Rgb(255, 92, 0)));

    let (Some(symbol), Some(timeframe)) = (app.selected_symbol(), app.selected_timeframe()) else {
        let placeholder = Paragraph::new("waiting for level updates...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(placeholder, area);
        return;
    };

    let current_price = app.engine.last_price(&symbol);
    let classified = app
        .engine
        .classified_levels(&symbol, timeframe.as_str(), kind, current_price);

    match classified {
        ClassifiedLevels::Rows(rows) => {
            let items: Vec<ListItem> = rows
                .iter()
                .map(|row| {
                    let (marker, color) = match row.role {
                        RowRole::Resistance => ("▼", Color::Rgb(255, 69, 58)),
                        RowRole::Support => ("▲", Color::Rgb(0, 255, 127)),
                        RowRole::Pivot => ("◆", Color::Rgb(255, 215, 0)),
                        RowRole::CurrentPrice => ("●", Color::Rgb(100, 149, 237)),
                    };
                    let style = if row.role == RowRole::CurrentPrice {
                        Style::default().fg(color).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(color)
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(format!(" {} ", marker), style),
                        Span::styled(format!("{:<28}", row.text), style),
                        Span::styled(format!("{:>14.2}", row.y), style),
                    ]))
                })
                .collect();
            f.render_widget(List::new(items).block(block), area);
        }
        ClassifiedLevels::Unavailable { direction } => {
            let placeholder = Paragraph::new(direction.unavailable_message())
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(placeholder, area);
        }
    }
}

fn render_positions(f: &mut Frame, area: Rect, app: &App) {
    let book = app.engine.positions();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " POSITIONS · {} buy / {} sell ",
            book.buy.len(),
            book.sell.len()
        ))
        .border_style(Style::default().fg(Color::Rgb(240, 185, 11)));

    let mut items: Vec<ListItem> = Vec::new();
    for position in &book.buy {
        items.push(ListItem::new(Line::from(Span::styled(
            format!(
                " ▲ {:<12} @ {:>12.2}",
                position.symbol, position.entry_price
            ),
            Style::default().fg(Color::Rgb(0, 255, 127)),
        ))));
    }
    for position in &book.sell {
        items.push(ListItem::new(Line::from(Span::styled(
            format!(
                " ▼ {:<12} @ {:>12.2}",
                position.symbol, position.entry_price
            ),
            Style::default().fg(Color::Rgb(255, 69, 58)),
        ))));
    }

    if items.is_empty() {
        let placeholder = Paragraph::new("no open positions")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    f.render_widget(List::new(items).block(block), area);
}
