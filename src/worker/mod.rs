// src/worker/mod.rs

//! The worker runtime (§4.6): discovers local execution parallelism, leases
//! batches from the coordinator, runs the verification pipeline over each
//! batch, and reports results, looping until the password is found.

pub mod client;
pub mod config;
pub mod control_loop;
pub mod runtime;

pub use control_loop::run;
