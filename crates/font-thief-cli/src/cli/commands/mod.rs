//! Command handlers.

mod run;

pub use run::run_site;
