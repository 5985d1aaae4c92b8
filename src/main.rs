use std::fs::File;
use std::io::stdout;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use prodtable::controller::Controller;
use prodtable::loader;
use prodtable::render::{RedrawCounter, TextRenderer};
use prodtable::ui::{TableUI, ViewStatus};
use prodtable::{TableConfig, TableError, TableModel};

/// Compare products side by side and sort them by any column.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Records to show (.json, .jsonl or .ndjson). The first record holds the field names.
    path: String,

    /// Field to sort by after loading.
    #[arg(short, long, default_value = "price")]
    sort: String,

    /// Keep the loaded order.
    #[arg(long)]
    no_initial_sort: bool,

    /// Do not warn about record fields missing from the header.
    #[arg(long)]
    no_verify_keys: bool,

    /// Print the table to stdout instead of opening the viewer.
    #[arg(short, long)]
    print: bool,

    /// Text shown for missing values.
    #[arg(long, default_value = "")]
    placeholder: String,

    #[arg(long, default_value = "prodtable.log")]
    log_file: String,

    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(path: &Path) -> Result<(), TableError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), TableError> {
    init_logging(&loader::expand_path(&args.log_file)?)?;
    info!("Starting prodtable with {args:?}");

    let path = loader::expand_path(&args.path)?;
    let records = loader::load_records(&path)?;

    let mut cfg = TableConfig::default()
        .verify_no_leftover_keys(!args.no_verify_keys)
        .absent_placeholder(args.placeholder)
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_column_width);
    if !args.no_initial_sort {
        cfg = cfg.initial_sort(args.sort);
    }

    if args.print {
        let mut model = TableModel::new(cfg.clone())
            .with_renderer(TextRenderer::new(stdout(), cfg.max_column_width));
        return model.load_records(records);
    }

    let redraws = RedrawCounter::new();
    let mut model = TableModel::new(cfg.clone()).with_renderer(redraws.clone());
    model.load_records(records)?;

    let mut ui = TableUI::new(display_name(&path), &cfg, redraws);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = execute!(stdout(), EnableMouseCapture)
        .map_err(TableError::from)
        .and_then(|_| event_loop(&mut terminal, &mut model, &mut ui, &controller));
    if let Err(e) = execute!(stdout(), DisableMouseCapture) {
        error!("Failed to disable mouse capture: {e}");
    }
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut TableModel,
    ui: &mut TableUI,
    controller: &Controller,
) -> Result<(), TableError> {
    while ui.status() != ViewStatus::QUITTING {
        // Render the current view
        if ui.needs_redraw() {
            terminal.draw(|f| ui.draw(model, f))?;
        }

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event()? {
            ui.update(model, message);
        };
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string()
}
