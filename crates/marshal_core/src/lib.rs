//! # Marshal Core
//!
//! Deterministic decision layer for a real-time-strategy game agent.
//!
//! Given a stream of per-frame world observations, the bot decides
//! every decision tick what each controlled entity should do next,
//! respecting economic constraints and in-flight commitments. The
//! crate contains **only** decision logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! The game world itself is an external collaborator reached through
//! the [`engine::Engine`], [`engine::Placer`], and [`ledger::Ledger`]
//! traits.
//!
//! ## Crate Structure
//!
//! - [`bot`] - the owned context object and per-frame entry point
//! - [`goals`] - production/research goal queue and reconciliation
//! - [`military`] - tactic state machine and combat roster
//! - [`scout`] - scouting controller
//! - [`dispatch`] - per-entity production dispatch
//! - [`catalog`] - data-driven type definitions
//! - [`engine`] - world observation and command boundary
//! - [`ledger`] - resource accounting boundary
//! - [`math`] - fixed-point spatial math

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod bot;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod goals;
pub mod ledger;
pub mod math;
pub mod military;
pub mod scout;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bot::Bot;
    pub use crate::catalog::{
        FactionId, Requirement, StructureSpec, StructureTypeId, TechId, TechSpec, TypeCatalog,
        UnitSpec, UnitTypeId,
    };
    pub use crate::config::{BotConfig, Doctrine};
    pub use crate::engine::{
        Engine, EntityId, EntityType, MapInfo, Order, Placer, Tick, UnitView,
    };
    pub use crate::error::{CommandError, CommandResult, GoalError};
    pub use crate::goals::{Goal, GoalQueue, GoalTarget};
    pub use crate::ledger::{Ledger, Resources, RunningBalance};
    pub use crate::math::{Fixed, TilePos, Vec2Fixed};
    pub use crate::military::{AttackState, MilitaryController, RosterEntry, Tactic};
    pub use crate::scout::ScoutController;
}
