
pub mod config;
pub mod error;
pub mod logging;
pub mod renderer;
pub mod terrain;
pub mod ui;

pub use config::AppConfig;
pub use error::{ConfigError, RenderError, RenderResult};
