pub mod command;
pub mod config;
pub mod model;
pub mod runner;

// Boot-time status checks and the per-project state machine
pub mod orchestrator;
pub mod registry;

// Event-loop state, independent of any terminal backend
pub mod controller;

#[cfg(test)]
mod testing;
