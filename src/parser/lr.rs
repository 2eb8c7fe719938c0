use crate::cfsm::{Cfsm, StateId};
use crate::diag::{Diagnostics, LogDiagnostics};
use crate::grammar::{Assoc, FirstTable, Rule};
use crate::parser::error::{GrammarError, ParseError};
use crate::parser::table::{Action, ActionTable};
use crate::{Symbol, Terminal, Token, Value, Variable};

use std::sync::Arc;

/// A compiled LR(1) parser for one grammar.
///
/// Construction is the expensive part: it builds the automaton and the parse
/// table. Instances are meant to be built once and reused across many
/// [`Lr::parse`] calls; a parse touches no shared mutable state, so a parser
/// can be shared between threads freely.
pub struct Lr<V, T> {
    rules: Vec<Arc<Rule<V, T>>>,
    priorities: Vec<Assoc<T>>,
    table: ActionTable<V, T>,
    start_state: StateId,
    verbose: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<V, T> std::fmt::Debug for Lr<V, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lr").finish_non_exhaustive()
    }
}

/// Configures and builds an [`Lr`] parser.
pub struct LrBuilder<V, T> {
    rules: Vec<Rule<V, T>>,
    priorities: Vec<Assoc<T>>,
    verbose: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

/// The compiled artifacts of one grammar, swapped into the parser as a unit
/// so a failed compilation never leaves a half-replaced instance behind.
struct Compiled<V, T> {
    rules: Vec<Arc<Rule<V, T>>>,
    table: ActionTable<V, T>,
    start_state: StateId,
}

fn compile<V, T>(
    rules: Vec<Rule<V, T>>,
    priorities: &[Assoc<T>],
    verbose: bool,
    diag: &dyn Diagnostics,
) -> Result<Compiled<V, T>, GrammarError>
where
    V: Variable,
    T: Terminal,
{
    if rules.iter().any(|rule| rule.right().is_empty()) {
        return Err(GrammarError::EmptyRule);
    }
    let rules: Vec<Arc<Rule<V, T>>> = rules.into_iter().map(Arc::new).collect();

    let mut start_rules = rules.iter().filter(|rule| *rule.left() == V::START);
    let start_rule = match (start_rules.next(), start_rules.next()) {
        (Some(_), Some(_)) => return Err(GrammarError::MultipleStartingRules),
        (Some(rule), None) => Arc::clone(rule),
        (None, _) => return Err(GrammarError::NoStartingRule),
    };

    let first = FirstTable::build(&rules);
    let cfsm = Cfsm::from_rules(&start_rule, &rules, &first);

    if verbose {
        for state in cfsm.states() {
            diag.emit(&state.to_string());
        }
    }

    let table = ActionTable::build(&cfsm, priorities, verbose, diag)?;

    if verbose {
        for (id, row) in table.rows().iter().enumerate() {
            let entries: Vec<String> = row
                .iter()
                .map(|(symbol, action)| format!("{}->{}", symbol, action))
                .collect();
            diag.emit(&format!("{}  {}", id, entries.join("  ")));
        }
    }

    Ok(Compiled {
        rules,
        table,
        start_state: cfsm.start_state(),
    })
}

impl<V, T> LrBuilder<V, T>
where
    V: Variable,
    T: Terminal,
{
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            priorities: Vec::new(),
            verbose: false,
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    /// Adds a rule to the grammar.
    pub fn with_rule(mut self, rule: Rule<V, T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a batch of rules to the grammar.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rule<V, T>>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Declares associativity and precedence, lowest precedence first.
    pub fn with_priorities(mut self, priorities: impl IntoIterator<Item = Assoc<T>>) -> Self {
        self.priorities.extend(priorities);
        self
    }

    /// Enables diagnostic traces during compilation and parsing.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Replaces the default [`LogDiagnostics`] sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Compiles the grammar into a ready-to-use parser.
    pub fn build(self) -> Result<Lr<V, T>, GrammarError> {
        let compiled = compile(
            self.rules,
            &self.priorities,
            self.verbose,
            self.diagnostics.as_ref(),
        )?;
        Ok(Lr {
            rules: compiled.rules,
            priorities: self.priorities,
            table: compiled.table,
            start_state: compiled.start_state,
            verbose: self.verbose,
            diagnostics: self.diagnostics,
        })
    }
}

impl<V, T> Lr<V, T>
where
    V: Variable,
    T: Terminal,
{
    /// Creates a new [`LrBuilder`].
    pub fn builder() -> LrBuilder<V, T> {
        LrBuilder::new()
    }

    /// Compiles a parser from rules and priorities with default settings.
    pub fn new(rules: Vec<Rule<V, T>>, priorities: Vec<Assoc<T>>) -> Result<Self, GrammarError> {
        Self::builder()
            .with_rules(rules)
            .with_priorities(priorities)
            .build()
    }

    /// Replaces the grammar of this parser, rebuilding all compiled
    /// artifacts. Costs as much as initial construction and fails the same
    /// way; on failure the previous grammar stays active.
    pub fn set(
        &mut self,
        rules: Vec<Rule<V, T>>,
        priorities: Vec<Assoc<T>>,
    ) -> Result<(), GrammarError> {
        let compiled = compile(rules, &priorities, self.verbose, self.diagnostics.as_ref())?;
        self.rules = compiled.rules;
        self.table = compiled.table;
        self.start_state = compiled.start_state;
        self.priorities = priorities;
        Ok(())
    }

    /// The rules of the currently compiled grammar.
    pub fn rules(&self) -> impl Iterator<Item = &Rule<V, T>> {
        self.rules.iter().map(Arc::as_ref)
    }

    /// The priority declarations of the currently compiled grammar.
    pub fn priorities(&self) -> &[Assoc<T>] {
        &self.priorities
    }

    /// Runs the table against a token stream.
    ///
    /// The stream must be finite and end with the [`Token::eof`] sentinel,
    /// appended by the caller or its lexer. Returns the semantic value left
    /// by the final reduction, or `None` when the grammar never reduced one.
    /// The first missing table entry aborts the parse; there is no recovery.
    pub fn parse(&self, tokens: Vec<Token<T>>) -> Result<Option<Value>, ParseError<V, T>> {
        let mut tokens = tokens;
        tokens.reverse();

        let mut symbols: Vec<Symbol<V, T>> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        let mut states: Vec<StateId> = vec![self.start_state];

        loop {
            let Some(lookahead) = tokens.last().map(|token| token.terminal) else {
                break;
            };
            let current = *states.last().expect("the state stack never drains");
            let row = self.table.row(current);

            if self.verbose {
                self.diagnostics.emit(&format!(
                    "state {}  lookahead {:?}  symbols {:?}  values {}  states {:?}",
                    current,
                    lookahead,
                    symbols,
                    values.len(),
                    states,
                ));
            }

            let Some(action) = row.get(&Symbol::Terminal(lookahead)) else {
                return Err(ParseError {
                    expected: row.keys().copied().collect(),
                    found: tokens.pop().expect("the lookahead token is present"),
                });
            };

            match action.clone() {
                Action::Shift(target) => {
                    let token = tokens.pop().expect("the lookahead token is present");
                    symbols.push(Symbol::Terminal(token.terminal));
                    values.push(token.value);
                    states.push(target);
                }
                Action::Reduce(rule) => {
                    if rule.is_empty_production() {
                        // An empty production consumes nothing.
                        values.push(rule.reduce(Vec::new()));
                        symbols.push(Symbol::Variable(*rule.left()));
                    } else {
                        let count = rule.right().len();
                        if symbols.len() < count || values.len() < count || states.len() <= count {
                            panic!("stack underflow while reducing {}", rule);
                        }
                        symbols.truncate(symbols.len() - count);
                        states.truncate(states.len() - count);
                        let inputs = values.split_off(values.len() - count);
                        values.push(rule.reduce(inputs));
                        symbols.push(Symbol::Variable(*rule.left()));
                    }

                    let top = *states.last().expect("the state stack never drains");
                    let left = Symbol::Variable(*rule.left());
                    match self.table.row(top).get(&left) {
                        Some(Action::Goto(target)) => states.push(*target),
                        // A missing goto after a reduce is a table
                        // construction bug, not a parse failure.
                        _ => panic!("no goto entry for {} in state {}", left, top),
                    }
                }
                Action::Goto(target) => states.push(target),
                Action::Accept => {
                    tokens.pop();
                }
            }
        }

        Ok(values.pop())
    }
}
