pub mod setup;
pub mod shell;
pub mod ui;
