use crate::core::catalog::CatalogEntry;
use crate::core::rates::DisplayBase;
use crate::core::render::{DisplayCard, WatchlistRenderer};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn rate_cell(card: &DisplayCard) -> Cell {
    match card.rate {
        Some(_) => Cell::new(card.rate_text()).set_alignment(CellAlignment::Right),
        None => Cell::new(card.rate_text())
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
    }
}

pub fn watchlist_table(base: DisplayBase, cards: &[DisplayCard]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Currency"),
        header_cell("Code"),
        header_cell(&format!("Rate ({base})")),
        header_cell("Updated (UTC-3)"),
    ]);
    for card in cards {
        table.add_row(vec![
            Cell::new(&card.name),
            Cell::new(&card.code).add_attribute(Attribute::Bold),
            rate_cell(card),
            Cell::new(card.updated_text()).fg(Color::DarkGrey),
        ]);
    }
    table
}

pub fn catalog_table(entries: &[CatalogEntry]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![header_cell("Code"), header_cell("Currency")]);
    for entry in entries {
        table.add_row(vec![Cell::new(&entry.code), Cell::new(&entry.name)]);
    }
    table
}

fn available_line(available: &[CatalogEntry]) -> String {
    let codes: Vec<&str> = available.iter().map(|c| c.code.as_str()).collect();
    format!("Available to add: {}", codes.join(", "))
}

#[derive(Default)]
struct Frame {
    base: DisplayBase,
    cards: Vec<DisplayCard>,
    available: Vec<CatalogEntry>,
}

/// Terminal renderer. A live renderer prints every redraw; otherwise only
/// the latest frame is kept until [`TableRenderer::print`] is called.
pub struct TableRenderer {
    live: bool,
    frame: Mutex<Frame>,
}

impl TableRenderer {
    pub fn new(live: bool) -> Self {
        Self {
            live,
            frame: Mutex::new(Frame::default()),
        }
    }

    fn frame(&self) -> std::sync::MutexGuard<'_, Frame> {
        self.frame.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn print(&self) {
        let frame = self.frame();
        print_frame(&frame);
    }
}

fn print_frame(frame: &Frame) {
    if frame.cards.is_empty() {
        println!("{}", style_text("Watchlist is empty", StyleType::Subtle));
    } else {
        println!("{}", watchlist_table(frame.base, &frame.cards));
    }
    if !frame.available.is_empty() {
        println!("{}", style_text(&available_line(&frame.available), StyleType::Subtle));
    }
}

impl WatchlistRenderer for TableRenderer {
    fn render_cards(&self, base: DisplayBase, cards: &[DisplayCard]) {
        let mut frame = self.frame();
        frame.base = base;
        frame.cards = cards.to_vec();
    }

    fn render_available(&self, available: &[CatalogEntry]) {
        let mut frame = self.frame();
        frame.available = available.to_vec();
        // Cards and the available set are always redrawn together, print once
        if self.live {
            print_frame(&frame);
        }
    }

    fn notify(&self, message: &str) {
        eprintln!("{}", style_text(message, StyleType::Error));
    }
}

/// Creates a new `indicatif::ProgressBar` spinner with standard styling.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
