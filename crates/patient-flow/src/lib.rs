//! Bed allocation and admission lifecycle core for hospital patient-flow
//! tracking. The surrounding web backend consumes this crate in-process;
//! nothing here owns a socket except the router builders it exports.

pub mod config;
pub mod error;
pub mod flows;
pub mod telemetry;
