pub mod cli;
pub mod error;
pub mod execution;
pub mod output;
pub mod task;
pub mod util;
