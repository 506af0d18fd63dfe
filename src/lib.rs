pub mod app;
pub mod audio;
pub mod canvas;
pub mod capability;
pub mod clock;
pub mod color;
pub mod config;
pub mod debounce;
pub mod error;
pub mod field;
pub mod grid;
pub mod logging;
pub mod randomize;
pub mod render;
pub mod settings;
pub mod sink;
pub mod style;
pub mod surface;
pub mod terminal;
