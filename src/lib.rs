//! Quadratic equation quiz: a seeded question generator, a quiz session
//! state machine with scoring, and result storage. The Telegram bot in
//! `main.rs` is one front end for these pieces.

pub mod config;
pub mod quiz;

pub use config::Config;
