pub mod classify;
pub mod completion_log;
pub mod config;
pub mod evaluation;
pub mod input;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod storage;
