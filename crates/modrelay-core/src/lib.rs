pub mod cli;
pub mod events;
pub mod lookup;
pub mod service;
pub mod telemetry;
