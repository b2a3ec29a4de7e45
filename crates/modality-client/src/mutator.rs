//! Mutator capability and the dispatch host shared by every front end.
//!
//! A [`Mutator`] is whatever the host program exposes as a fault-injection
//! point. It owns its own state; the host only keeps a reference, the
//! registrant's correlation id, and which mutation (if any) is active.
//!
//! [`MutatorHost`] is the one place inject/reset dispatch lives. The
//! poll-based [`MutationClient`](crate::mutation::MutationClient) and the
//! HTTP facade both drive it, so the rules are identical on every transport:
//!
//! - at most one active mutation per mutator; a second inject without a reset
//!   fails with `AlreadyInjected` and leaves the first untouched
//! - params are checked against the descriptor; missing ones take the
//!   declared default
//! - inject and reset on the same mutator never overlap

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use modality_types::{AttrVal, MutationId, MutatorDescriptor, MutatorId};
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::protocol::Outcome;

/// Failure reported by a mutator implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MutatorError(pub String);

impl MutatorError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[async_trait]
pub trait Mutator: Send + Sync {
    fn describe(&self) -> MutatorDescriptor;

    async fn inject(
        &self,
        mutation: MutationId,
        params: Vec<(String, AttrVal)>,
    ) -> Result<(), MutatorError>;

    async fn reset(&self) -> Result<(), MutatorError>;
}

/// Why one command failed. Scoped to that command only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("mutator {mutator} already has active mutation {active}")]
    AlreadyInjected {
        mutator: MutatorId,
        active: MutationId,
    },
    #[error("no mutator registered as {0}")]
    UnknownMutator(MutatorId),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("mutator failed: {0}")]
    Mutator(#[from] MutatorError),
}

impl CommandError {
    pub fn to_outcome(&self) -> Outcome {
        match self {
            CommandError::AlreadyInjected { active, .. } => {
                Outcome::AlreadyInjected { active: *active }
            }
            CommandError::UnknownMutator(_) => Outcome::UnknownMutator,
            CommandError::InvalidParams(msg) => Outcome::InvalidParams(msg.clone()),
            CommandError::Mutator(e) => Outcome::Failed(e.0.clone()),
        }
    }
}

struct Entry {
    mutator: Arc<dyn Mutator>,
    descriptor: MutatorDescriptor,
    /// Active mutation. Held across inject/reset so they serialize per mutator.
    active: Mutex<Option<MutationId>>,
}

/// Registered mutators plus their active-mutation bookkeeping.
#[derive(Default)]
pub struct MutatorHost {
    entries: RwLock<Vec<(MutatorId, Arc<Entry>)>>,
}

impl MutatorHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mutator under `id`. The descriptor is captured once, here.
    pub fn register(&self, id: MutatorId, mutator: Arc<dyn Mutator>) -> Result<()> {
        let descriptor = mutator.describe();
        let mut entries = self.entries.write();
        if entries.iter().any(|(existing, _)| *existing == id) {
            return Err(Error::DuplicateMutatorId(id));
        }
        tracing::debug!(mutator = %id, name = %descriptor.name, "mutator registered");
        let entry = Entry {
            mutator,
            descriptor,
            active: Mutex::new(None),
        };
        entries.push((id, Arc::new(entry)));
        Ok(())
    }

    /// Register several at once; nothing is added if any id collides.
    pub fn register_all(&self, mutators: Vec<(MutatorId, Arc<dyn Mutator>)>) -> Result<()> {
        let mut seen = HashSet::new();
        for (id, _) in &mutators {
            if !seen.insert(*id) || self.contains(*id) {
                return Err(Error::DuplicateMutatorId(*id));
            }
        }
        for (id, m) in mutators {
            self.register(id, m)?;
        }
        Ok(())
    }

    pub fn remove(&self, id: MutatorId) -> Option<Arc<dyn Mutator>> {
        let mut entries = self.entries.write();
        let pos = entries.iter().position(|(existing, _)| *existing == id)?;
        let (_, entry) = entries.remove(pos);
        Some(entry.mutator.clone())
    }

    pub fn contains(&self, id: MutatorId) -> bool {
        self.entries.read().iter().any(|(existing, _)| *existing == id)
    }

    /// Registration order.
    pub fn ids(&self) -> Vec<MutatorId> {
        self.entries.read().iter().map(|(id, _)| *id).collect()
    }

    pub fn list(&self) -> Vec<(MutatorId, MutatorDescriptor)> {
        self.entries
            .read()
            .iter()
            .map(|(id, e)| (*id, e.descriptor.clone()))
            .collect()
    }

    pub fn descriptor(&self, id: MutatorId) -> Option<MutatorDescriptor> {
        self.entry(id).map(|e| e.descriptor.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The mutation currently active on `id`, if any.
    pub async fn active(&self, id: MutatorId) -> Option<MutationId> {
        let entry = self.entry(id)?;
        *entry.active.lock().await
    }

    #[tracing::instrument(skip_all, fields(mutator = %id, mutation = %mutation))]
    pub async fn inject(
        &self,
        id: MutatorId,
        mutation: MutationId,
        params: Vec<(String, AttrVal)>,
    ) -> Result<(), CommandError> {
        let entry = self.entry(id).ok_or(CommandError::UnknownMutator(id))?;
        let mut active = entry.active.lock().await;
        if let Some(current) = *active {
            return Err(CommandError::AlreadyInjected {
                mutator: id,
                active: current,
            });
        }
        let params = complete_params(&entry.descriptor, params)?;
        entry.mutator.inject(mutation, params).await?;
        *active = Some(mutation);
        tracing::debug!("injected");
        Ok(())
    }

    /// Reset one mutator. Returns the mutation that was active, if any.
    #[tracing::instrument(skip_all, fields(mutator = %id))]
    pub async fn reset(&self, id: MutatorId) -> Result<Option<MutationId>, CommandError> {
        let entry = self.entry(id).ok_or(CommandError::UnknownMutator(id))?;
        let mut active = entry.active.lock().await;
        entry.mutator.reset().await?;
        let previous = active.take();
        tracing::debug!(previous = ?previous, "reset");
        Ok(previous)
    }

    /// Reset every mutator with an active mutation.
    pub async fn reset_all(&self) -> Vec<(MutatorId, Result<Option<MutationId>, CommandError>)> {
        let mut results = Vec::new();
        for id in self.ids() {
            if self.active(id).await.is_some() {
                results.push((id, self.reset(id).await));
            }
        }
        results
    }

    fn entry(&self, id: MutatorId) -> Option<Arc<Entry>> {
        self.entries
            .read()
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, e)| e.clone())
    }
}

impl std::fmt::Debug for MutatorHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutatorHost").field("mutators", &self.ids()).finish()
    }
}

/// Convert to the declared types, validate, and fill in declared defaults.
fn complete_params(
    descriptor: &MutatorDescriptor,
    supplied: Vec<(String, AttrVal)>,
) -> Result<Vec<(String, AttrVal)>, CommandError> {
    let mut params = Vec::with_capacity(descriptor.params.len());
    for (name, val) in supplied {
        let Some(p) = descriptor.param(&name) else {
            return Err(CommandError::InvalidParams(format!("unknown parameter '{name}'")));
        };
        let val = p
            .coerce(val)
            .map_err(|e| CommandError::InvalidParams(e.to_string()))?;
        params.push((name, val));
    }
    for p in &descriptor.params {
        if let Some(default) = &p.default_value
            && !params.iter().any(|(name, _)| *name == p.name)
        {
            params.push((p.name.clone(), default.clone()));
        }
    }
    Ok(params)
}
