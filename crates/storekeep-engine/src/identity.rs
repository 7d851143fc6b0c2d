//! # Identity
//!
//! Who is acting. Authentication lives outside the engine; it only needs
//! the current actor to stamp sales, cancellations and audit entries.

use storekeep_core::Actor;

/// Provides the actor performing the current operation.
pub trait Identity: Send + Sync {
    fn current_actor(&self) -> Actor;
}

/// A fixed actor (single-operator terminals, tests, batch jobs).
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    actor: Actor,
}

impl StaticIdentity {
    pub fn new(actor: Actor) -> Self {
        StaticIdentity { actor }
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        StaticIdentity::new(Actor::system())
    }
}

impl Identity for StaticIdentity {
    fn current_actor(&self) -> Actor {
        self.actor.clone()
    }
}
