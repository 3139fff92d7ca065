//! CLI command implementations.

mod config;
mod doctor;
mod gen;
mod init;
mod run;

pub use config::run_config;
pub use doctor::run_doctor;
pub use gen::run_gen;
pub use init::run_init;
pub use run::run_pipeline;
