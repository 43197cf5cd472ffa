mod bearers;
mod config;

pub use bearers::*;
pub use config::*;
