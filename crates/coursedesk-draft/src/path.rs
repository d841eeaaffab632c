//! Structural addresses into a draft, e.g.
//! `modules[2].topics[0].mcqQuizzes[1].marks`.

use std::fmt;
use std::str::FromStr;

use crate::error::{DraftError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || DraftError::InvalidPath(raw.to_string());
        let mut segments = Vec::new();
        let mut rest = raw;

        loop {
            let end = rest
                .find(|c: char| c == '.' || c == '[')
                .unwrap_or(rest.len());
            let name = &rest[..end];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid());
            }
            segments.push(Segment::Field(name.to_string()));
            rest = &rest[end..];

            while let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']').ok_or_else(invalid)?;
                let digits = &after[..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let index = digits.parse::<usize>().map_err(|_| invalid())?;
                segments.push(Segment::Index(index));
                rest = &after[close + 1..];
            }

            match rest.strip_prefix('.') {
                Some(next) => rest = next,
                None if rest.is_empty() => break,
                None => return Err(invalid()),
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for FieldPath {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Field(name) if i == 0 => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Every ordered list of a draft that supports `insert_at` / `remove_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Modules,
    Topics { module: usize },
    Quizzes { module: usize, topic: usize },
    Resources,
    FormatDetails,
    LearnItems,
    Prerequisites,
    Features,
}

impl Collection {
    pub fn from_path(path: &FieldPath) -> Result<Self> {
        use Segment::{Field, Index};

        let f = |s: &Segment, name: &str| matches!(s, Field(n) if n == name);
        let c = match path.segments() {
            [a] if f(a, "modules") => Collection::Modules,
            [a, Index(m), b] if f(a, "modules") && f(b, "topics") => {
                Collection::Topics { module: *m }
            }
            [a, Index(m), b, Index(t), c] if f(a, "modules") && f(b, "topics") && f(c, "mcqQuizzes") => {
                Collection::Quizzes {
                    module: *m,
                    topic: *t,
                }
            }
            [a] if f(a, "courseResources") => Collection::Resources,
            [a] if f(a, "courseFormatDetails") => Collection::FormatDetails,
            [a] if f(a, "learnItems") => Collection::LearnItems,
            [a] if f(a, "prerequisites") => Collection::Prerequisites,
            [a, b] if f(a, "pricing") && f(b, "features") => Collection::Features,
            _ => return Err(DraftError::InvalidPath(path.to_string())),
        };
        Ok(c)
    }

    /// Lists the editor never lets drop below one element.
    pub fn min_len(self) -> usize {
        match self {
            Collection::Topics { .. } | Collection::Quizzes { .. } => 1,
            _ => 0,
        }
    }
}

impl FromStr for Collection {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self> {
        Collection::from_path(&FieldPath::parse(s)?)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Modules => write!(f, "modules"),
            Collection::Topics { module } => write!(f, "modules[{module}].topics"),
            Collection::Quizzes { module, topic } => {
                write!(f, "modules[{module}].topics[{topic}].mcqQuizzes")
            }
            Collection::Resources => write!(f, "courseResources"),
            Collection::FormatDetails => write!(f, "courseFormatDetails"),
            Collection::LearnItems => write!(f, "learnItems"),
            Collection::Prerequisites => write!(f, "prerequisites"),
            Collection::Features => write!(f, "pricing.features"),
        }
    }
}
