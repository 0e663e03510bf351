pub mod categories;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod revision;
pub mod scheduler;
pub mod sources;
#[cfg(test)]
mod test_helpers;
pub mod tracker;
pub mod ui;
