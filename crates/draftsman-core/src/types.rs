//! Text artifacts that flow through the pipeline.
//!
//! Each is a thin newtype so a plan can never be passed where code is
//! expected. None of them expose mutation after construction.

use std::fmt;

/// The user's free-text request. Guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request(String);

impl Request {
    /// Wrap a request, rejecting empty or whitespace-only text.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plan text returned by the planning round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanArtifact(String);

impl PlanArtifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Script source returned by the code round trip, with fence markup removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeArtifact(String);

impl CodeArtifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PlanArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CodeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
