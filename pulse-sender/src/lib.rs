pub mod config;
pub mod generator;
pub mod ledger;
pub mod session;
