//! CLI command implementations.

mod config;
mod doctor;
mod generate;
mod prepare;
mod serve;
mod voices;

pub use config::run_config;
pub use doctor::run_doctor;
pub use generate::run_generate;
pub use prepare::run_prepare;
pub use serve::run_serve;
pub use voices::run_voices;
