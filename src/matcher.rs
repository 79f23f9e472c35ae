//! Text comparison operators for output assertions.
//!
//! A [`Matcher`] judges an observed string against an expected pattern with
//! one of five operators. Failures are returned as values ([`Check`]) rather
//! than raised, so a wait loop can retry the comparison as more data arrives
//! and report the most recent failure if it never passes.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from constructing a matcher.
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The operator string is not one of the five supported operators.
    #[error("Unknown operation: {0}")]
    UnknownOperator(String),

    /// The expected value for a `match` operator is not a valid regex.
    #[error("Invalid match pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// The five comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    /// Exact equality.
    Be,
    /// Substring containment.
    Contain,
    /// Regular expression match.
    Match,
    /// Prefix match.
    StartWith,
    /// Suffix match.
    EndWith,
}

impl MatchOp {
    /// The operator phrase as it appears in behavioral steps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Be => "be",
            Self::Contain => "contain",
            Self::Match => "match",
            Self::StartWith => "start with",
            Self::EndWith => "end with",
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchOp {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "be" => Ok(Self::Be),
            "contain" => Ok(Self::Contain),
            "match" => Ok(Self::Match),
            "start with" => Ok(Self::StartWith),
            "end with" => Ok(Self::EndWith),
            other => Err(MatcherError::UnknownOperator(other.to_string())),
        }
    }
}

/// A failed comparison, with everything needed for an actionable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected output to {op} {expected:?}, but observed {observed:?}")]
pub struct MatchFailure {
    /// The operator that was applied.
    pub op: MatchOp,
    /// The expected pattern or value.
    pub expected: String,
    /// The value actually observed.
    pub observed: String,
}

/// Outcome of one predicate evaluation over accumulated channel data.
///
/// `Mismatch` carries comparison detail worth surfacing to the user;
/// `NoMatch` is a plain "not yet" from a predicate with nothing to report.
/// The wait loop retains the most recent `Mismatch` across retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The predicate holds.
    Match,
    /// The predicate does not hold and has no diagnostic detail.
    NoMatch,
    /// The predicate does not hold; detail should be reported on timeout.
    Mismatch(MatchFailure),
}

impl Check {
    /// Whether this outcome is a successful match.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl From<bool> for Check {
    fn from(passed: bool) -> Self {
        if passed {
            Self::Match
        } else {
            Self::NoMatch
        }
    }
}

/// A compiled comparison of observed output against an expected value.
///
/// The regex for [`MatchOp::Match`] is compiled once at construction so that
/// repeated evaluation inside a wait loop is infallible.
#[derive(Debug, Clone)]
pub struct Matcher {
    op: MatchOp,
    expected: String,
    pattern: Option<Regex>,
}

impl Matcher {
    /// Build a matcher for the given operator and expected value.
    pub fn new(op: MatchOp, expected: impl Into<String>) -> Result<Self, MatcherError> {
        let expected = expected.into();
        let pattern = match op {
            MatchOp::Match => {
                let regex =
                    Regex::new(&expected).map_err(|source| MatcherError::InvalidPattern {
                        pattern: expected.clone(),
                        source,
                    })?;
                Some(regex)
            }
            _ => None,
        };
        Ok(Self {
            op,
            expected,
            pattern,
        })
    }

    /// Build a matcher from an operator phrase (e.g. `"start with"`).
    pub fn parse(op: &str, expected: impl Into<String>) -> Result<Self, MatcherError> {
        Self::new(op.parse()?, expected)
    }

    /// The operator this matcher applies.
    pub fn op(&self) -> MatchOp {
        self.op
    }

    /// Evaluate the matcher against an observed value.
    pub fn check(&self, observed: &str) -> Check {
        let passed = match self.op {
            MatchOp::Be => observed == self.expected,
            MatchOp::Contain => observed.contains(&self.expected),
            MatchOp::Match => self
                .pattern
                .as_ref()
                .map(|re| re.is_match(observed))
                .unwrap_or(false),
            MatchOp::StartWith => observed.starts_with(&self.expected),
            MatchOp::EndWith => observed.ends_with(&self.expected),
        };

        if passed {
            Check::Match
        } else {
            Check::Mismatch(MatchFailure {
                op: self.op,
                expected: self.expected.clone(),
                observed: observed.to_string(),
            })
        }
    }
}
