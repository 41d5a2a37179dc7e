use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Identifier shared by items and lists. Always positive.
pub type Id = u64;

/// The two independent id spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Item,
    List,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::Item => write!(f, "item"),
            IdKind::List => write!(f, "list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} id {id} is already registered")]
    DuplicateId { kind: IdKind, id: Id },
    #[error("{kind} id must be positive")]
    InvalidArgument { kind: IdKind },
}

/// Issues ids per entity kind and remembers every id it has seen.
///
/// Ids are never released: deleting an entity leaves its id registered, so a
/// freshly minted id is always greater than anything issued or reloaded so far.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    items: BTreeSet<Id>,
    lists: BTreeSet<Id>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn used(&self, kind: IdKind) -> &BTreeSet<Id> {
        match kind {
            IdKind::Item => &self.items,
            IdKind::List => &self.lists,
        }
    }

    fn used_mut(&mut self, kind: IdKind) -> &mut BTreeSet<Id> {
        match kind {
            IdKind::Item => &mut self.items,
            IdKind::List => &mut self.lists,
        }
    }

    /// Mint the next id for `kind` (highest registered + 1) and register it
    pub fn next_id(&mut self, kind: IdKind) -> Id {
        let used = self.used_mut(kind);
        let id = used.last().copied().unwrap_or(0) + 1;
        used.insert(id);
        id
    }

    /// Register an id that came from outside, e.g. a record reloaded from storage
    pub fn register_id(&mut self, kind: IdKind, id: Id) -> Result<(), IdError> {
        if id == 0 {
            return Err(IdError::InvalidArgument { kind });
        }
        if !self.used_mut(kind).insert(id) {
            return Err(IdError::DuplicateId { kind, id });
        }
        Ok(())
    }

    pub fn is_registered(&self, kind: IdKind, id: Id) -> bool {
        self.used(kind).contains(&id)
    }
}
