pub mod config;
pub mod dialog;
pub mod editor;
pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod text;
pub mod ui;

pub use error::{Error, Result};
