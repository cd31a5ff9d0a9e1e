//! CLI command implementations

pub mod cache;
pub mod run;

pub use cache::execute as cache;
pub use run::execute as run;
