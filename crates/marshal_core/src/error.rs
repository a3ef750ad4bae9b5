//! Error types for the decision layer.

use thiserror::Error;

/// Result of issuing a command to the engine.
pub type CommandResult = std::result::Result<(), CommandError>;

/// Reasons the engine can decline an order.
///
/// All of these are transient: the responsible component reports the
/// rejection through `tracing` and retries on a later eligible tick.
/// None of them corrupt queue or roster state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The player cannot currently pay for the order.
    #[error("insufficient resources")]
    InsufficientResources,

    /// The requested build site is blocked or out of bounds.
    #[error("invalid build location")]
    InvalidPlacement,

    /// The unit is occupied with something that cannot be interrupted.
    #[error("unit is busy")]
    UnitBusy,

    /// The referenced entity no longer exists.
    #[error("entity not found: {0}")]
    EntityNotFound(u64),

    /// The unit cannot execute this kind of order at all.
    #[error("order not supported by this unit")]
    Unsupported,

    /// A tech or structure prerequisite for the order is missing.
    #[error("requirement not met: {0}")]
    RequirementNotMet(String),
}

/// Reasons a goal can be rejected at insertion time.
///
/// A rejected goal never enters the queue; the caller receives the
/// failure signal and the queue is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GoalError {
    /// The target type is not registered in the catalog.
    #[error("unknown type id")]
    UnknownType,

    /// The target type belongs to a faction we do not control.
    #[error("type belongs to another faction")]
    WrongFaction,
}
