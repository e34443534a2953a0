pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod stages;
pub mod storage;
pub mod trace;
