use async_trait::async_trait;

use crate::domain::{HeldPosition, TargetPositionCommand};

use super::error::CollaboratorError;

/// Execution port trait
///
/// Positions are expressed as absolute per-side targets. Applying the same
/// target twice must leave the book unchanged after the first call.
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    /// Every non-empty side currently held on `instrument`
    async fn current_positions(&self, instrument: &str) -> Result<Vec<HeldPosition>, CollaboratorError>;

    /// Move the holding on one side of one instrument to the target quantity
    async fn set_target_position(&self, command: &TargetPositionCommand) -> Result<(), CollaboratorError>;
}
