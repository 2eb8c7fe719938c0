use self::item::{closure, goto, Item, ItemSet};
use self::state::{State, StateIdGenerator};
use crate::grammar::{FirstTable, Rule};
use crate::{Symbol, Terminal, Variable};

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexSet;

pub(crate) mod item;
pub(crate) mod state;

pub(crate) use state::StateId;

/// The canonical LR(1) collection: every automaton state reachable from the
/// starting rule, with transitions recorded on each state.
///
/// The builder owns all states while exploring; afterwards the collection is
/// immutable and only read by the table compiler and diagnostics.
#[derive(Debug)]
pub(crate) struct Cfsm<V, T> {
    start_state: StateId,
    states: Vec<State<V, T>>,
}

impl<V, T> Cfsm<V, T>
where
    V: Variable,
    T: Terminal,
{
    /// Explores the state graph from the starting rule.
    ///
    /// Worklist over the discovered states: for every state and every
    /// alphabet symbol, the goto set either matches an existing state (by
    /// item-set equality) or becomes a new one. Terminates because the item
    /// universe is finite and equal states are never duplicated.
    pub(crate) fn from_rules(
        start_rule: &Arc<Rule<V, T>>,
        rules: &[Arc<Rule<V, T>>],
        first: &FirstTable<V, T>,
    ) -> Self {
        let mut ids = StateIdGenerator::default();
        let alphabet = Symbol::all();

        let start_items: ItemSet<V, T> = closure(
            IndexSet::from_iter([Item {
                rule: Arc::clone(start_rule),
                index: 0,
                follow: T::EOF,
            }]),
            rules,
            first,
        );

        let start_state = ids.next();
        let mut states = vec![State::new(start_state, start_items)];
        let mut pending = VecDeque::from([start_state]);

        while let Some(current) = pending.pop_front() {
            for symbol in &alphabet {
                let items = goto(&states[current].items, symbol, rules, first);
                if items.is_empty() {
                    continue;
                }

                let target = match states.iter().position(|s| s.has_items(&items)) {
                    Some(existing) => states[existing].id,
                    None => {
                        let state = State::new(ids.next(), items);
                        let target = state.id;
                        states.push(state);
                        pending.push_back(target);
                        target
                    }
                };

                states[current].transitions.insert(*symbol, target);
            }
        }

        Self {
            start_state,
            states,
        }
    }
}

impl<V, T> Cfsm<V, T> {
    pub(crate) fn start_state(&self) -> StateId {
        self.start_state
    }

    pub(crate) fn states(&self) -> &[State<V, T>] {
        &self.states
    }
}
