pub mod config;
pub mod goals;
pub mod period;
pub mod preset;
pub mod run;
pub mod stats;
