pub mod config;
pub mod server;
pub mod util;
pub mod workspace;

pub use config::Config;
