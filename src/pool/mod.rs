//! Worker pool — workers and the registry that tracks them

mod registry;
mod worker;

pub use registry::WorkerRegistry;
pub use worker::Worker;
