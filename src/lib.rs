pub mod args;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod overlay;
pub mod render;
pub mod viewer;
pub mod window;
