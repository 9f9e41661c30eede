pub mod config;
pub mod duration;
pub mod progress;
pub mod run;
