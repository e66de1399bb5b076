//! Draft entity and entity service contracts.
//!
//! The durable store lives outside this crate. Per-entity read/update
//! atomicity is the store's responsibility.

use async_trait::async_trait;

use crate::error::{DispatchError, Result};

/// An in-progress entity built across wizard steps.
pub trait DraftEntity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// The only identity allowed to mutate this draft.
    fn owner_id(&self) -> &str;

    /// Finalized entities no longer derive steps.
    fn is_final(&self) -> bool;

    /// Short human readable summary, used when previewing.
    fn summary(&self) -> String {
        format!("Draft {}", self.id())
    }
}

/// Persistence for draft entities (external collaborator).
#[async_trait]
pub trait EntityService<E: DraftEntity>: Send + Sync {
    /// Return the owner's open draft in `scope_id`, creating one if needed.
    async fn get_or_create_draft(&self, owner_id: &str, scope_id: &str) -> Result<E>;

    async fn get_entity(&self, id: &str) -> Result<E>;

    /// Persist `entity` and return the stored version.
    async fn update_entity(&self, entity: &E) -> Result<E>;

    /// Mark the draft final.
    async fn finalize_draft(&self, id: &str) -> Result<E>;
}

/// Reject requesters that do not own `entity`.
pub fn ensure_owner<E: DraftEntity>(entity: &E, requester_id: &str) -> Result<()> {
    if entity.owner_id() == requester_id {
        Ok(())
    } else {
        tracing::warn!(entity_id = %entity.id(), requester_id = %requester_id, "Ownership check failed");
        Err(DispatchError::unauthorized(
            "This character belongs to someone else.",
        ))
    }
}
