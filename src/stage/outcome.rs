use crate::{foundation::core::Surface, settings::value::Value};

/// What a renderer or stage callback produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Outcome {
    /// Nothing worth threading forward.
    #[default]
    Done,
    /// A surface; becomes the next stage's source unless the stage keeps its source.
    Surface(Surface),
    /// A plain value, recorded as the stage result.
    Value(Value),
    /// Stop processing the rest of this tick's stage lists.
    Abort,
}

/// Surfaces and result carried out of a stage or stage list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Envelope {
    /// Source surface after the stage ran.
    pub source: Option<Surface>,
    /// Destination surface after the stage ran.
    pub destination: Option<Surface>,
    /// Result value of an action or renderer, if any.
    pub result: Option<Value>,
}

/// Control-flow result of processing a stage or stage list.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    /// The stage ran (or was a no-op); carry its surfaces forward.
    Continue(Envelope),
    /// A condition was false; this stage only is skipped.
    Skip,
    /// Halt every enclosing stage list up to the pipeline tick.
    Abort,
}

impl Flow {
    /// True for [`Flow::Abort`].
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort)
    }
}

/// Result of evaluating a stage condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Plain truth value.
    Truth(bool),
    /// The condition produced the abort sentinel.
    Abort,
}

impl Verdict {
    /// Logical negation; the abort sentinel is falsy, so it negates to true.
    pub fn negated(self) -> Self {
        match self {
            Self::Truth(b) => Self::Truth(!b),
            Self::Abort => Self::Truth(true),
        }
    }

    /// True only for `Truth(true)`.
    pub fn is_true(self) -> bool {
        matches!(self, Self::Truth(true))
    }
}
