//! The single "current object" slot and its replacement rules.

use glam::Vec3;

use crate::assets::TransientStore;

use super::{SceneObject, TeardownReport};

/// Radians added on X and Y per animation frame.
pub const SPIN_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Populated,
}

/// Identifies one build request. Only the most recently issued ticket may
/// install its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildTicket(u64);

impl BuildTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The object is now current; `replaced` is the teardown of its
    /// predecessor, if there was one.
    Installed { replaced: Option<TeardownReport> },
    /// A newer build was started meanwhile; the object was torn down.
    Superseded(TeardownReport),
}

#[derive(Debug, Default)]
pub struct ObjectSlot {
    current: Option<SceneObject>,
    issued: u64,
}

impl ObjectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SlotState {
        match self.current {
            Some(_) => SlotState::Populated,
            None => SlotState::Empty,
        }
    }

    pub fn current(&self) -> Option<&SceneObject> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut SceneObject> {
        self.current.as_mut()
    }

    /// Tears down the current object (if any), then attaches `object`.
    pub fn install(
        &mut self,
        object: SceneObject,
        store: &mut TransientStore,
    ) -> Option<TeardownReport> {
        let replaced = self.reset(store);
        log::info!("Installed '{}'", object.name);
        self.current = Some(object);
        replaced
    }

    pub fn reset(&mut self, store: &mut TransientStore) -> Option<TeardownReport> {
        let previous = self.current.take()?;
        log::debug!("Tearing down '{}'", previous.name);
        Some(previous.teardown(store))
    }

    pub fn begin_build(&mut self) -> BuildTicket {
        self.issued += 1;
        BuildTicket(self.issued)
    }

    pub fn is_latest(&self, ticket: BuildTicket) -> bool {
        ticket.0 == self.issued
    }

    pub fn commit(
        &mut self,
        ticket: BuildTicket,
        object: SceneObject,
        store: &mut TransientStore,
    ) -> CommitOutcome {
        if !self.is_latest(ticket) {
            log::info!(
                "Discarding '{}' from build {} (latest is {})",
                object.name,
                ticket.0,
                self.issued
            );
            return CommitOutcome::Superseded(object.teardown(store));
        }
        CommitOutcome::Installed {
            replaced: self.install(object, store),
        }
    }

    /// One animation frame: spins the current object on X and Y.
    pub fn advance(&mut self) {
        if let Some(object) = self.current.as_mut() {
            object.transform.rotation += Vec3::new(SPIN_STEP, SPIN_STEP, 0.0);
        }
    }
}
