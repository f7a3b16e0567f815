//! Public library modules for the CLI crate
pub mod app;
pub mod render;
pub mod shell;
