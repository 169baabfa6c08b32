pub mod check;
pub mod checker;
pub mod classify;
pub mod details;
pub mod errors;
pub mod gate;
pub mod init;
pub mod logging;
pub mod notify;
pub mod registry;
pub mod report;
pub mod service;
pub mod validator_config;
