use crate::cfsm::{state::State, Cfsm, StateId};
use crate::diag::Diagnostics;
use crate::grammar::{Assoc, Rule};
use crate::parser::error::GrammarError;
use crate::{Symbol, Terminal, Variable};

use std::fmt::{self, Debug};
use std::sync::Arc;

use indexmap::IndexMap;

/// One entry of the parse table.
#[derive(Clone)]
pub(crate) enum Action<V, T> {
    /// Consume the lookahead and move to the target state.
    Shift(StateId),
    /// Rewrite the top of the stacks using a grammar rule.
    Reduce(Arc<Rule<V, T>>),
    /// Follow a variable transition after a reduction.
    Goto(StateId),
    /// Terminate the parse successfully.
    Accept,
}

impl<V, T> fmt::Display for Action<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift(state) => write!(f, "shift[{}]", state),
            Action::Reduce(rule) => write!(f, "reduce[{}]", rule),
            Action::Goto(state) => write!(f, "goto[{}]", state),
            Action::Accept => write!(f, "accept"),
        }
    }
}

/// The compiled parse table: one action row per automaton state.
///
/// Built once per grammar and immutable afterwards. Registration conflicts
/// are resolved here, deterministically, or reported as grammar errors.
pub(crate) struct ActionTable<V, T> {
    rows: Vec<IndexMap<Symbol<V, T>, Action<V, T>>>,
}

impl<V, T> ActionTable<V, T>
where
    V: Variable,
    T: Terminal,
{
    /// Compiles the automaton into a table.
    ///
    /// Transitions become shifts (terminals) and gotos (variables); complete
    /// items become reduces on their lookahead, or accept for the starting
    /// rule on end of input.
    pub(crate) fn build(
        cfsm: &Cfsm<V, T>,
        priorities: &[Assoc<T>],
        verbose: bool,
        diag: &dyn Diagnostics,
    ) -> Result<Self, GrammarError> {
        let mut table = Self {
            rows: vec![IndexMap::new(); cfsm.states().len()],
        };

        for state in cfsm.states() {
            for (&symbol, &target) in &state.transitions {
                let action = match symbol {
                    Symbol::Terminal(_) => Action::Shift(target),
                    Symbol::Variable(_) => Action::Goto(target),
                };
                table.insert(state, symbol, action, priorities, verbose, diag)?;
            }

            for item in &state.items {
                if !item.is_complete() {
                    continue;
                }
                let action = if *item.rule.left() == V::START && item.follow == T::EOF {
                    Action::Accept
                } else {
                    Action::Reduce(Arc::clone(&item.rule))
                };
                table.insert(
                    state,
                    Symbol::Terminal(item.follow),
                    action,
                    priorities,
                    verbose,
                    diag,
                )?;
            }
        }

        Ok(table)
    }

    /// Registers an action, resolving any collision with the policy below.
    ///
    /// An `accept` already in place always stays, and an incoming `accept`
    /// always wins. A standing reduce of an empty production is silently
    /// overwritable. A standing shift against an incoming reduce is decided
    /// by associativity, then by declaration-order precedence. Everything
    /// else is an ambiguity error.
    fn insert(
        &mut self,
        state: &State<V, T>,
        word: Symbol<V, T>,
        action: Action<V, T>,
        priorities: &[Assoc<T>],
        verbose: bool,
        diag: &dyn Diagnostics,
    ) -> Result<(), GrammarError> {
        let existing = match self.rows[state.id].get(&word) {
            None => {
                self.rows[state.id].insert(word, action);
                return Ok(());
            }
            Some(existing) => existing.clone(),
        };

        match &existing {
            Action::Accept => Ok(()),
            Action::Shift(_) => {
                self.solve_shift_conflict(state, word, &existing, action, priorities, verbose, diag)
            }
            Action::Reduce(rule) => {
                let standing = Arc::clone(rule);
                self.solve_reduce_conflict(state, word, standing, action)
            }
            Action::Goto(_) => Err(GrammarError::AmbiguousGrammar {
                state: state.id,
                existing: existing.to_string(),
                incoming: action.to_string(),
            }),
        }
    }

    /// The slot already holds a reduce.
    fn solve_reduce_conflict(
        &mut self,
        state: &State<V, T>,
        word: Symbol<V, T>,
        standing: Arc<Rule<V, T>>,
        action: Action<V, T>,
    ) -> Result<(), GrammarError> {
        if matches!(action, Action::Accept) {
            self.rows[state.id].insert(word, action);
            return Ok(());
        }

        // Reducing an empty production is a fallback, never worth defending.
        if standing.is_empty_production() {
            self.rows[state.id].insert(word, action);
            return Ok(());
        }

        Err(GrammarError::AmbiguousGrammar {
            state: state.id,
            existing: Action::Reduce(standing).to_string(),
            incoming: action.to_string(),
        })
    }

    /// The slot already holds a shift.
    fn solve_shift_conflict(
        &mut self,
        state: &State<V, T>,
        word: Symbol<V, T>,
        standing: &Action<V, T>,
        action: Action<V, T>,
        priorities: &[Assoc<T>],
        verbose: bool,
        diag: &dyn Diagnostics,
    ) -> Result<(), GrammarError> {
        let Action::Reduce(reduce_rule) = &action else {
            if matches!(action, Action::Accept) {
                self.rows[state.id].insert(word, action);
                return Ok(());
            }
            return Err(GrammarError::AmbiguousGrammar {
                state: state.id,
                existing: standing.to_string(),
                incoming: action.to_string(),
            });
        };
        let reduce_rule = Arc::clone(reduce_rule);

        let Symbol::Terminal(word_terminal) = word else {
            unreachable!("shift actions are only registered on terminals");
        };

        if verbose {
            diag.emit(&format!(
                "shift/reduce conflict between {} and {}",
                standing, action
            ));
        }

        // Associativity of the conflicting terminal, when it is also the
        // rule's rightmost terminal: left means reduce, right means shift.
        for priority in priorities {
            match priority {
                Assoc::Left(t) if *t == word_terminal => {
                    if reduce_rule.last_terminal() == Some(word) {
                        if verbose {
                            diag.emit("resolved by REDUCE");
                        }
                        self.rows[state.id].insert(word, action);
                        return Ok(());
                    }
                }
                Assoc::Right(t) if *t == word_terminal => {
                    if reduce_rule.last_terminal() == Some(word) {
                        if verbose {
                            diag.emit("resolved by SHIFT");
                        }
                        return Ok(());
                    }
                }
                _ => {}
            }
        }

        // Precedence: both terminals must be declared; the later declaration
        // has the higher precedence.
        let involved: Vec<T> = priorities
            .iter()
            .map(Assoc::terminal)
            .filter(|t| *t == word_terminal || Some(Symbol::Terminal(*t)) == reduce_rule.last_terminal())
            .collect();
        if involved.len() != 2 {
            return Err(GrammarError::ShiftReduceConflict {
                word: format!("{:?}", word_terminal),
                action: action.to_string(),
            });
        }

        if Some(Symbol::Terminal(involved[1])) == reduce_rule.last_terminal() {
            if verbose {
                diag.emit("resolved by REDUCE");
            }
            self.rows[state.id].insert(word, action);
        } else if verbose {
            diag.emit("resolved by SHIFT");
        }
        Ok(())
    }
}

impl<V, T> ActionTable<V, T> {
    pub(crate) fn row(&self, state: StateId) -> &IndexMap<Symbol<V, T>, Action<V, T>> {
        &self.rows[state]
    }

    pub(crate) fn rows(&self) -> &[IndexMap<Symbol<V, T>, Action<V, T>>] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, ActionTable};
    use crate::cfsm::state::State;
    use crate::diag::BufferDiagnostics;
    use crate::grammar::{Assoc, Rule};
    use crate::parser::error::GrammarError;
    use crate::{value, Symbol, Terminal, Variable};

    use std::sync::Arc;

    use indexmap::{IndexMap, IndexSet};

    #[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
    enum Var {
        Start,
        Expr,
    }

    #[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
    enum Term {
        Number,
        Plus,
        Times,
        Eof,
        Epsilon,
    }

    impl Variable for Var {
        const START: Self = Var::Start;

        fn all() -> Vec<Self> {
            vec![Var::Start, Var::Expr]
        }
    }

    impl Terminal for Term {
        const EOF: Self = Term::Eof;
        const EPSILON: Self = Term::Epsilon;

        fn all() -> Vec<Self> {
            vec![
                Term::Number,
                Term::Plus,
                Term::Times,
                Term::Eof,
                Term::Epsilon,
            ]
        }
    }

    fn sum_rule() -> Arc<Rule<Var, Term>> {
        Arc::new(Rule::new(
            Var::Expr,
            vec![
                Symbol::Variable(Var::Expr),
                Symbol::Terminal(Term::Plus),
                Symbol::Variable(Var::Expr),
            ],
            |_| value(()),
        ))
    }

    fn product_rule() -> Arc<Rule<Var, Term>> {
        Arc::new(Rule::new(
            Var::Expr,
            vec![
                Symbol::Variable(Var::Expr),
                Symbol::Terminal(Term::Times),
                Symbol::Variable(Var::Expr),
            ],
            |_| value(()),
        ))
    }

    fn empty_rule() -> Arc<Rule<Var, Term>> {
        Arc::new(Rule::new(Var::Expr, vec![Symbol::epsilon()], |_| value(())))
    }

    fn harness() -> (ActionTable<Var, Term>, State<Var, Term>, BufferDiagnostics) {
        let table = ActionTable {
            rows: vec![IndexMap::new()],
        };
        let state = State::new(0, IndexSet::new());
        (table, state, BufferDiagnostics::new())
    }

    fn register(
        table: &mut ActionTable<Var, Term>,
        state: &State<Var, Term>,
        word: Symbol<Var, Term>,
        action: Action<Var, Term>,
        priorities: &[Assoc<Term>],
        diag: &BufferDiagnostics,
    ) -> Result<(), GrammarError> {
        table.insert(state, word, action, priorities, true, diag)
    }

    #[test]
    fn accept_is_never_overwritten() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Eof);

        register(&mut table, &state, word, Action::Accept, &[], &diag).unwrap();
        register(&mut table, &state, word, Action::Shift(1), &[], &diag).unwrap();

        assert!(matches!(table.row(0)[&word], Action::Accept));
    }

    #[test]
    fn accept_overwrites_anything() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Eof);

        register(&mut table, &state, word, Action::Reduce(sum_rule()), &[], &diag).unwrap();
        register(&mut table, &state, word, Action::Accept, &[], &diag).unwrap();

        assert!(matches!(table.row(0)[&word], Action::Accept));
    }

    #[test]
    fn empty_production_reduce_is_overwritable() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Plus);

        register(&mut table, &state, word, Action::Reduce(empty_rule()), &[], &diag).unwrap();
        register(&mut table, &state, word, Action::Shift(1), &[], &diag).unwrap();

        assert!(matches!(table.row(0)[&word], Action::Shift(1)));
    }

    #[test]
    fn reduce_reduce_is_ambiguous() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Plus);

        register(&mut table, &state, word, Action::Reduce(sum_rule()), &[], &diag).unwrap();
        let err = register(
            &mut table,
            &state,
            word,
            Action::Reduce(product_rule()),
            &[],
            &diag,
        )
        .unwrap_err();

        assert!(matches!(err, GrammarError::AmbiguousGrammar { state: 0, .. }));
    }

    #[test]
    fn goto_collision_is_ambiguous() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Variable(Var::Expr);

        register(&mut table, &state, word, Action::Goto(1), &[], &diag).unwrap();
        let err = register(&mut table, &state, word, Action::Goto(2), &[], &diag).unwrap_err();

        assert!(matches!(err, GrammarError::AmbiguousGrammar { .. }));
    }

    #[test]
    fn undeclared_shift_reduce_is_a_conflict() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Plus);

        register(&mut table, &state, word, Action::Shift(1), &[], &diag).unwrap();
        let err = register(&mut table, &state, word, Action::Reduce(sum_rule()), &[], &diag)
            .unwrap_err();

        assert!(matches!(err, GrammarError::ShiftReduceConflict { .. }));
    }

    #[test]
    fn left_associativity_prefers_reduce() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Plus);
        let priorities = [Assoc::Left(Term::Plus)];

        register(&mut table, &state, word, Action::Shift(1), &priorities, &diag).unwrap();
        register(
            &mut table,
            &state,
            word,
            Action::Reduce(sum_rule()),
            &priorities,
            &diag,
        )
        .unwrap();

        assert!(matches!(table.row(0)[&word], Action::Reduce(_)));
        assert!(diag.messages().iter().any(|m| m == "resolved by REDUCE"));
    }

    #[test]
    fn right_associativity_prefers_shift() {
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Plus);
        let priorities = [Assoc::Right(Term::Plus)];

        register(&mut table, &state, word, Action::Shift(1), &priorities, &diag).unwrap();
        register(
            &mut table,
            &state,
            word,
            Action::Reduce(sum_rule()),
            &priorities,
            &diag,
        )
        .unwrap();

        assert!(matches!(table.row(0)[&word], Action::Shift(1)));
        assert!(diag.messages().iter().any(|m| m == "resolved by SHIFT"));
    }

    #[test]
    fn every_reachable_state_is_fully_covered() {
        use crate::cfsm::Cfsm;
        use crate::diag::LogDiagnostics;
        use crate::grammar::FirstTable;

        let rules = vec![
            Arc::new(Rule::new(
                Var::Start,
                vec![Symbol::Variable(Var::Expr)],
                |_| value(()),
            )),
            sum_rule(),
            Arc::new(Rule::new(
                Var::Expr,
                vec![Symbol::Terminal(Term::Number)],
                |_| value(()),
            )),
        ];
        let first = FirstTable::build(&rules);
        let cfsm = Cfsm::from_rules(&rules[0], &rules, &first);
        let table = ActionTable::build(
            &cfsm,
            &[Assoc::Left(Term::Plus)],
            false,
            &LogDiagnostics,
        )
        .expect("the sum grammar compiles");

        for state in cfsm.states() {
            let row = table.row(state.id);
            assert!(!row.is_empty(), "state {} has no actions", state.id);

            // Every transition and every complete item got an entry.
            for (symbol, _) in &state.transitions {
                assert!(row.contains_key(symbol));
            }
            for item in &state.items {
                if item.is_complete() {
                    assert!(row.contains_key(&Symbol::Terminal(item.follow)));
                }
            }
        }
    }

    #[test]
    fn later_declaration_has_higher_precedence() {
        // Times is declared after Plus, so it binds tighter both ways.
        let priorities = [Assoc::Left(Term::Plus), Assoc::Left(Term::Times)];

        // Standing shift on Times against a reduce ending in Plus: shift.
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Times);
        register(&mut table, &state, word, Action::Shift(1), &priorities, &diag).unwrap();
        register(
            &mut table,
            &state,
            word,
            Action::Reduce(sum_rule()),
            &priorities,
            &diag,
        )
        .unwrap();
        assert!(matches!(table.row(0)[&word], Action::Shift(1)));

        // Standing shift on Plus against a reduce ending in Times: reduce.
        let (mut table, state, diag) = harness();
        let word = Symbol::Terminal(Term::Plus);
        register(&mut table, &state, word, Action::Shift(1), &priorities, &diag).unwrap();
        register(
            &mut table,
            &state,
            word,
            Action::Reduce(product_rule()),
            &priorities,
            &diag,
        )
        .unwrap();
        assert!(matches!(table.row(0)[&word], Action::Reduce(_)));
    }
}
