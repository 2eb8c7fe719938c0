use crate::{Symbol, Token};

use std::fmt::{self, Debug};

use thiserror::Error;

/// Errors raised while compiling a grammar into a parse table.
///
/// All of them are terminal: no parser instance is produced, and a failed
/// regrammar leaves the previous grammar in place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rules should have at least one right component; use the epsilon terminal for empty rules")]
    EmptyRule,
    #[error("rules should have a single starting rule")]
    MultipleStartingRules,
    #[error("rules should have a starting rule")]
    NoStartingRule,
    #[error("ambiguous grammar: conflict between {existing} and {incoming} in state {state}")]
    AmbiguousGrammar {
        state: usize,
        existing: String,
        incoming: String,
    },
    #[error("ambiguous grammar: shift/reduce conflict between shift[{word}] and {action}")]
    ShiftReduceConflict { word: String, action: String },
}

/// The single parse-time error: no action exists for the current state and
/// lookahead. Carries the symbols the table did expect and the offending
/// token. Parsing is not resumable after this.
pub struct ParseError<V, T> {
    pub expected: Vec<Symbol<V, T>>,
    pub found: Token<T>,
}

impl<V, T> fmt::Display for ParseError<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parsing error: expected one of [")?;
        for (i, symbol) in self.expected.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", symbol)?;
        }
        write!(f, "], found {:?}", self.found.terminal)
    }
}

impl<V, T> Debug for ParseError<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseError")
            .field("expected", &self.expected)
            .field("found", &self.found)
            .finish()
    }
}

impl<V, T> std::error::Error for ParseError<V, T>
where
    V: Debug,
    T: Debug,
{
}
