pub mod config;
pub mod engine;
pub mod error;
pub mod menubar;
pub mod player;
pub mod renderer;
pub mod surface;
pub mod types;
