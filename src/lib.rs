pub mod analyzer;
pub mod discovery;
pub mod error;
pub mod format;
pub mod gain;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod process;
pub mod scan;
pub mod tags;
pub mod verify;
