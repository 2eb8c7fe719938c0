use super::item::ItemSet;
use crate::Symbol;

use std::fmt::{self, Debug};

use indexmap::IndexMap;

/// A node of the parsing automaton: a closed [`ItemSet`] plus the
/// transitions leaving it.
///
/// The id is dense and sequential, handed out in discovery order; it only
/// serves display and indexing. State identity during construction is
/// item-set equality, checked through [`State::has_items`].
#[derive(Debug)]
pub(crate) struct State<V, T> {
    /// Id of the [`State`].
    pub(crate) id: StateId,
    /// Set of items this [`State`] represents.
    pub(crate) items: ItemSet<V, T>,
    /// Transitions to other [`State`]s based on symbol input, in insertion
    /// order so later table registration is reproducible.
    pub(crate) transitions: IndexMap<Symbol<V, T>, StateId>,
}

pub(crate) type StateId = usize;

impl<V, T> State<V, T> {
    /// Constructs a new [`State`] with the given id and [`ItemSet`].
    pub(crate) fn new(id: StateId, items: ItemSet<V, T>) -> Self {
        Self {
            id,
            items,
            transitions: IndexMap::new(),
        }
    }
}

impl<V, T> State<V, T>
where
    ItemSet<V, T>: Eq,
{
    /// Checks whether this [`State`] represents the given [`ItemSet`].
    pub(crate) fn has_items(&self, items: &ItemSet<V, T>) -> bool {
        self.items == *items
    }
}

impl<V, T> fmt::Display for State<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State {}:", self.id)?;
        for item in &self.items {
            writeln!(f, "  {}", item)?;
        }
        for (symbol, target) in &self.transitions {
            writeln!(f, "  {} -> {}", symbol, target)?;
        }
        Ok(())
    }
}

/// Generator for sequential [`StateId`]s.
#[derive(Default)]
pub(crate) struct StateIdGenerator {
    current: StateId,
}

impl StateIdGenerator {
    /// Returns the next [`StateId`] available.
    pub(crate) fn next(&mut self) -> StateId {
        let result = self.current;
        self.current += 1;
        result
    }
}
