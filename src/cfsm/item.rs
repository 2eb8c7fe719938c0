use crate::grammar::{FirstTable, Rule};
use crate::{Symbol, Terminal, Variable};

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::sync::Arc;

use indexmap::IndexSet;

/// An [item](https://en.wikipedia.org/wiki/LR_parser#Items): a rule, a dot
/// position into its right-hand side and a lookahead terminal.
///
/// `rule.right[..index]` has been recognized; once the whole rule reduces,
/// `follow` is the terminal expected next. Items share the rule through an
/// [`Arc`] and compare by the rule's shape-based identity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct Item<V, T> {
    pub(crate) rule: Arc<Rule<V, T>>,
    pub(crate) index: usize,
    pub(crate) follow: T,
}

/// Set of [`Item`]s forming one automaton state, in insertion order.
pub(crate) type ItemSet<V, T> = IndexSet<Item<V, T>>;

impl<V, T> Item<V, T> {
    /// The symbol `n` places after the dot, if any.
    pub(crate) fn next(&self, n: usize) -> Option<&Symbol<V, T>> {
        self.rule.right().get(self.index + n)
    }

    /// Whether the dot sits past the end of the rule.
    pub(crate) fn is_complete(&self) -> bool {
        self.index == self.rule.right().len()
    }
}

impl<V, T> Item<V, T>
where
    T: Copy,
{
    /// The same item with the dot advanced by one symbol.
    pub(crate) fn advanced(&self) -> Self {
        Self {
            rule: Arc::clone(&self.rule),
            index: self.index + 1,
            follow: self.follow,
        }
    }
}

impl<V, T> Debug for Item<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<V, T> fmt::Display for Item<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?} ->", self.rule.left())?;
        for (i, symbol) in self.rule.right().iter().enumerate() {
            if i == self.index {
                write!(f, " •")?;
            }
            write!(f, " {}", symbol)?;
        }
        if self.is_complete() {
            write!(f, " •")?;
        }
        write!(f, ", {:?}]", self.follow)
    }
}

/// Expands `items` to its closure: the smallest superset closed under the
/// two item-expansion steps, computed with a worklist.
///
/// An item whose dot reads epsilon spawns the same item with the dot
/// advanced (epsilon is consumed for free). An item whose dot reads a
/// variable `B` spawns `[B -> • tau, b]` for every rule of `B`, where the
/// lookaheads `b` come from the FIRST set of the symbol after `B` (plus the
/// item's own lookahead when that set contains epsilon), or are just the
/// item's lookahead when nothing follows `B`.
pub(crate) fn closure<V, T>(
    items: ItemSet<V, T>,
    rules: &[Arc<Rule<V, T>>],
    first: &FirstTable<V, T>,
) -> ItemSet<V, T>
where
    V: Variable,
    T: Terminal,
{
    let mut closed = items;
    let mut pending: VecDeque<Item<V, T>> = closed.iter().cloned().collect();

    while let Some(item) = pending.pop_front() {
        if item.next(0) == Some(&Symbol::Terminal(T::EPSILON)) {
            let advanced = item.advanced();
            if closed.insert(advanced.clone()) {
                pending.push_back(advanced);
            }
        }

        let Some(&Symbol::Variable(head)) = item.next(0) else {
            continue;
        };

        for rule in rules.iter().filter(|r| *r.left() == head) {
            let lookaheads = match item.next(1) {
                Some(sigma) => {
                    let mut lookaheads = first.first(sigma).clone();
                    if lookaheads.contains(&T::EPSILON) {
                        lookaheads.insert(item.follow);
                    }
                    lookaheads
                }
                None => IndexSet::from_iter([item.follow]),
            };

            for follow in lookaheads {
                let new_item = Item {
                    rule: Arc::clone(rule),
                    index: 0,
                    follow,
                };
                if closed.insert(new_item.clone()) {
                    pending.push_back(new_item);
                }
            }
        }
    }

    closed
}

/// All items reachable from `items` by reading `symbol`: the matching items
/// advanced past it, closed again.
pub(crate) fn goto<V, T>(
    items: &ItemSet<V, T>,
    symbol: &Symbol<V, T>,
    rules: &[Arc<Rule<V, T>>],
    first: &FirstTable<V, T>,
) -> ItemSet<V, T>
where
    V: Variable,
    T: Terminal,
{
    let moved: ItemSet<V, T> = items
        .iter()
        .filter(|item| item.next(0) == Some(symbol))
        .map(Item::advanced)
        .collect();
    closure(moved, rules, first)
}
