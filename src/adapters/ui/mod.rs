//! Terminal UI adapter.

pub mod tui;

pub use tui::TuiInputPort;
