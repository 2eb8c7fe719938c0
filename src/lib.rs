use std::any::Any;
use std::fmt::Debug;

pub use diag::{BufferDiagnostics, Diagnostics, LogDiagnostics};
pub use grammar::{Assoc, ReductionAction, Rule};
pub use parser::{
    error::{GrammarError, ParseError},
    lr::{Lr, LrBuilder},
};

mod cfsm;
mod diag;
mod grammar;
mod parser;

/// A terminal token type: the atomic symbols produced by an external lexer.
///
/// The domain is closed and must be fully enumerable through [`Terminal::all`],
/// including the two reserved values: [`Terminal::EOF`] marks the end of the
/// token stream and [`Terminal::EPSILON`] stands for the empty word in rule
/// bodies.
pub trait Terminal: Copy + Eq + std::hash::Hash + Debug + 'static {
    /// The end-of-input marker, appended to the token stream by the caller.
    const EOF: Self;
    /// The empty-word marker, used as the sole right-hand symbol of an empty
    /// production.
    const EPSILON: Self;

    /// Every value of the terminal domain, reserved values included.
    fn all() -> Vec<Self>;
}

/// A non-terminal (variable) of the grammar.
///
/// Like [`Terminal`], the domain is closed and enumerable. One value,
/// [`Variable::START`], is reserved as the left side of the single starting
/// rule.
pub trait Variable: Copy + Eq + std::hash::Hash + Debug + 'static {
    /// The start symbol of the grammar.
    const START: Self;

    /// Every value of the non-terminal domain.
    fn all() -> Vec<Self>;
}

/// Represents a single terminal/variable in a rule body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Symbol<V, T> {
    Terminal(T),
    Variable(V),
}

impl<V, T> Symbol<V, T>
where
    V: Variable,
    T: Terminal,
{
    /// The epsilon terminal wrapped as a symbol.
    pub fn epsilon() -> Self {
        Symbol::Terminal(T::EPSILON)
    }

    /// The full exploration alphabet: every variable followed by every
    /// terminal except epsilon. Epsilon is consumed by item closure and never
    /// labels an automaton transition.
    pub(crate) fn all() -> Vec<Self> {
        V::all()
            .into_iter()
            .map(Symbol::Variable)
            .chain(
                T::all()
                    .into_iter()
                    .filter(|t| *t != T::EPSILON)
                    .map(Symbol::Terminal),
            )
            .collect()
    }
}

impl<V, T> std::fmt::Display for Symbol<V, T>
where
    V: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Terminal(t) => write!(f, "{:?}", t),
            Symbol::Variable(v) => write!(f, "{:?}", v),
        }
    }
}

/// A type-erased semantic value flowing through reductions.
pub type Value = Box<dyn Any + Send>;

/// Boxes a concrete value into a [`Value`].
pub fn value<U: Any + Send>(v: U) -> Value {
    Box::new(v)
}

/// Unboxes a [`Value`] into a concrete type.
///
/// Panics with a descriptive message when the value does not hold a `U`.
/// A mismatch means a reduction action disagrees with the values the grammar
/// actually produced, which is a fatal authoring bug rather than a
/// recoverable condition.
pub fn downcast<U: Any>(v: Value) -> U {
    match v.downcast::<U>() {
        Ok(v) => *v,
        Err(_) => panic!(
            "semantic value does not hold the expected type `{}`",
            std::any::type_name::<U>()
        ),
    }
}

/// A lexed token: a terminal tag plus an opaque payload.
pub struct Token<T> {
    pub terminal: T,
    pub value: Value,
}

impl<T> Token<T>
where
    T: Terminal,
{
    pub fn new(terminal: T, value: impl Any + Send) -> Self {
        Self {
            terminal,
            value: Box::new(value),
        }
    }

    /// A token with no meaningful payload.
    pub fn empty(terminal: T) -> Self {
        Self::new(terminal, ())
    }

    /// The end-of-input sentinel closing every token stream.
    pub fn eof() -> Self {
        Self::empty(T::EOF)
    }
}

impl<T> Debug for Token<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}
