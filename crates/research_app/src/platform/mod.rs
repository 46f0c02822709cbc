pub mod app;
pub mod commands;
mod effects;
mod persistence;
mod terminal;
