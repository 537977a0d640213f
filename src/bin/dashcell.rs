use clap::{Parser, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use crossterm::event::{self, Event as CEvent};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use dashcell::cell::{
    CellController, CellProps, Collaborators, InMemoryFilterApi, QueryConfig, QueryRunner, Slice,
};
use dashcell::config::Config;
use dashcell::core::{Datasource, ValueChoice};
use dashcell::services::{HttpValueLookup, StaticValueLookup, ValueLookup};
use dashcell::tui::App;
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Edit the filters of one dashboard cell
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Slice description (JSON/JSON5: slice_id, slice_name, formData)
    #[arg(long = "slice", value_name = "PATH")]
    slice: PathBuf,
    /// Datasource description (JSON/JSON5: id, type, filter_select, filterable_cols, metrics_combo)
    #[arg(long = "datasource", value_name = "PATH")]
    datasource: Option<PathBuf>,
    /// Static value choices per column, used when no lookup URL is set
    #[arg(long = "choices", value_name = "PATH")]
    choices: Option<PathBuf>,
    /// Base URL of the filter value endpoint (overrides the config file)
    #[arg(long = "lookup-url", value_name = "URL")]
    lookup_url: Option<String>,
    /// Key identifying this cell to the query runner
    #[arg(long = "chart-key")]
    chart_key: Option<String>,
    /// Widget size in pixels, WIDTHxHEIGHT
    #[arg(long = "size", default_value = "800x400", value_parser = parse_size)]
    size: (u32, u32),
    /// Start with the description expanded
    #[arg(long)]
    expanded: bool,
    /// Start in read-only mode
    #[arg(long = "read-only")]
    read_only: bool,
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

/// Query runner that records each dispatch in the log
struct LoggingQueryRunner;

impl QueryRunner for LoggingQueryRunner {
    fn run_query(&self, query: QueryConfig, force_refresh: bool, timeout_secs: u64, cell_key: &str) {
        let filters = query.get("filters").map(|f| f.to_string()).unwrap_or_default();
        info!(cell_key, force_refresh, timeout_secs, %filters, "run_query");
    }
}

fn read_json5<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    json5::from_str(&raw).wrap_err_with(|| format!("parsing {}", path.display()))
}

fn value_lookup(args: &Args, cfg: &Config) -> Result<Arc<dyn ValueLookup>> {
    if let Some(url) = args.lookup_url.as_ref().or(cfg.lookup.base_url.as_ref()) {
        info!(%url, "using HTTP value lookup");
        return Ok(Arc::new(HttpValueLookup::new(url, cfg.lookup.request_timeout())?));
    }
    let choices: HashMap<String, Vec<ValueChoice>> = match &args.choices {
        Some(path) => read_json5(path)?,
        None => HashMap::new(),
    };
    info!(columns = choices.len(), "using static value lookup");
    Ok(Arc::new(StaticValueLookup::new(choices)))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    dashcell::logging::init_with(None, args.logging.map(Into::into))?;

    let cfg = Config::from_path(args.config.as_ref()).unwrap_or_else(|e| {
        warn!("falling back to default config: {e}");
        Config::default()
    });

    let slice: Slice = read_json5(&args.slice)?;
    let datasource: Option<Datasource> = args
        .datasource
        .as_deref()
        .map(read_json5::<Datasource>)
        .transpose()?;
    let initial_filters = slice.form_data.saved_filters();
    let chart_key = args
        .chart_key
        .clone()
        .unwrap_or_else(|| format!("slice_{}", slice.slice_id));

    let props = CellProps {
        slice,
        chart_key,
        datasource,
        timeout_secs: cfg.cell.timeout_secs,
        widget_width: args.size.0,
        widget_height: args.size.1,
        is_expanded: args.expanded,
        edit_mode: !args.read_only,
        initial_filters,
    };
    let collaborators = Collaborators {
        query_runner: Arc::new(LoggingQueryRunner),
        filter_api: Arc::new(InMemoryFilterApi::new()),
        value_lookup: value_lookup(&args, &cfg)?,
    };
    let (mut cell, completions) = CellController::new(props, collaborators, cfg.cell.geometry());
    cell.mount()?;

    let keybindings = cfg.keybindings();
    for warning in keybindings.validate() {
        warn!("keybindings: {warning}");
    }
    let mut app = App::new(cell, completions, keybindings);

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    if let Err(e) = &res {
        error!("Error: {e}");
    }
    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if event::poll(Duration::from_millis(100))?
            && let CEvent::Key(key_event) = event::read()?
            && let Err(e) = app.handle_key_event(key_event)
        {
            error!("Error handling key event: {e}");
        }
        if app.should_quit() {
            break;
        }
        app.tick()?;
    }
    Ok(())
}
