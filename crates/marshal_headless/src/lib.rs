//! # Marshal Headless
//!
//! Runs the decision layer against a small deterministic world
//! simulation, with no graphics. Designed for watching the bot play a
//! scenario end to end, CI smoke runs, and tuning sessions.
//!
//! - [`faction`] - the demo faction's catalog and doctrine
//! - [`scenario`] - RON scenario files describing the starting world
//! - [`sim`] - the world simulation implementing the engine boundary
//! - [`runner`] - the frame loop and run summary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod faction;
pub mod runner;
pub mod scenario;
pub mod sim;
