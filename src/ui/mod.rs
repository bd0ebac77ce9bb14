//! Terminal rendering
//!
//! gcpscan is a batch tool; the only thing it draws is the discovery
//! progress gauge, using the ratatui framework on a crossterm backend.
//!
//! - [`progress`] - Inline progress gauge fed by tracker snapshots

pub mod progress;
