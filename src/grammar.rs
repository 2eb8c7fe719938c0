use crate::{Symbol, Terminal, Value, Variable};

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexSet;

/// The function applied when a rule reduces: it receives one semantic value
/// per right-hand symbol (none for an empty production) and returns the
/// value of the rule's left side.
pub type ReductionAction = Box<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// A production of the grammar: a variable, the sequence of symbols it
/// rewrites to, and the reduction action fusing their semantic values.
pub struct Rule<V, T> {
    left: V,
    right: Vec<Symbol<V, T>>,
    action: ReductionAction,
}

impl<V, T> Rule<V, T> {
    /// Defines a rule.
    ///
    /// The right-hand side must not be empty; an empty production is written
    /// as the single symbol [`Symbol::epsilon`].
    pub fn new(
        left: V,
        right: Vec<Symbol<V, T>>,
        action: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            left,
            right,
            action: Box::new(action),
        }
    }

    pub fn left(&self) -> &V {
        &self.left
    }

    pub fn right(&self) -> &[Symbol<V, T>] {
        &self.right
    }

    /// Invokes the reduction action.
    pub(crate) fn reduce(&self, values: Vec<Value>) -> Value {
        (self.action)(values)
    }
}

impl<V, T> Rule<V, T>
where
    V: Copy,
    T: Copy,
{
    /// The rightmost terminal of the rule, if any. Drives associativity and
    /// precedence lookups during conflict resolution.
    pub(crate) fn last_terminal(&self) -> Option<Symbol<V, T>> {
        self.right
            .iter()
            .rev()
            .find(|s| matches!(s, Symbol::Terminal(_)))
            .copied()
    }
}

impl<V, T> Rule<V, T>
where
    V: Variable,
    T: Terminal,
{
    /// Whether the rule is an empty production, i.e. its right-hand side
    /// contains the epsilon terminal.
    pub(crate) fn is_empty_production(&self) -> bool {
        self.right.contains(&Symbol::Terminal(T::EPSILON))
    }
}

// Rule identity is the left side plus the right-hand shape. The reduction
// action is deliberately not part of it: two rules with the same shape are
// one rule as far as items and the action table are concerned, so only the
// first of them ever has its action invoked.
impl<V, T> PartialEq for Rule<V, T>
where
    V: PartialEq,
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.right == other.right
    }
}

impl<V, T> Eq for Rule<V, T>
where
    V: Eq,
    T: Eq,
{
}

impl<V, T> Hash for Rule<V, T>
where
    V: Hash,
    T: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.left.hash(state);
        self.right.hash(state);
    }
}

impl<V, T> Debug for Rule<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("left", &self.left)
            .field("right", &self.right)
            .finish_non_exhaustive()
    }
}

impl<V, T> fmt::Display for Rule<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ->", self.left)?;
        for symbol in &self.right {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// An associativity declaration for a terminal.
///
/// `Left` resolves a shift/reduce conflict on that terminal by reducing,
/// `Right` by shifting. The order of declarations doubles as a precedence
/// list, lowest first: when a conflict involves two different declared
/// terminals, the later declared one wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc<T> {
    Left(T),
    Right(T),
}

impl<T> Assoc<T>
where
    T: Copy,
{
    pub(crate) fn terminal(&self) -> T {
        match self {
            Assoc::Left(t) | Assoc::Right(t) => *t,
        }
    }
}

/// FIRST sets for every symbol of the grammar: the terminals (possibly
/// including epsilon) that can begin a derivation from it.
pub(crate) struct FirstTable<V, T> {
    sets: HashMap<Symbol<V, T>, IndexSet<T>>,
}

impl<V, T> FirstTable<V, T>
where
    V: Variable,
    T: Terminal,
{
    /// Computes the table to a fixed point over the rule list.
    pub(crate) fn build(rules: &[Arc<Rule<V, T>>]) -> Self {
        let mut sets = HashMap::new();
        for v in V::all() {
            sets.insert(Symbol::Variable(v), IndexSet::new());
        }
        for t in T::all() {
            sets.insert(Symbol::Terminal(t), IndexSet::from_iter([t]));
        }

        let mut table = Self { sets };
        while table.sweep(rules) {}
        table
    }

    /// One pass over every rule, returning whether any set grew.
    ///
    /// For a rule `A -> X1 .. Xn` the walk unions `FIRST(Xi) \ {epsilon}`
    /// into `FIRST(A)` and stops at the first `Xi` whose FIRST set lacks
    /// epsilon; if the walk falls off the end, epsilon joins `FIRST(A)`.
    fn sweep(&mut self, rules: &[Arc<Rule<V, T>>]) -> bool {
        let mut changed = false;
        for rule in rules {
            let left = Symbol::Variable(*rule.left());
            let mut all_nullable = true;
            for symbol in rule.right() {
                let first = self
                    .sets
                    .get(symbol)
                    .expect("every right-hand symbol has a first set")
                    .clone();
                let target = self
                    .sets
                    .get_mut(&left)
                    .expect("every variable has a first set");
                for t in first.iter().copied().filter(|t| *t != T::EPSILON) {
                    changed |= target.insert(t);
                }
                if !first.contains(&T::EPSILON) {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable {
                changed |= self
                    .sets
                    .get_mut(&left)
                    .expect("every variable has a first set")
                    .insert(T::EPSILON);
            }
        }
        changed
    }

    pub(crate) fn first(&self, symbol: &Symbol<V, T>) -> &IndexSet<T> {
        self.sets
            .get(symbol)
            .expect("every grammar symbol has a first set")
    }
}
