pub mod corpus;
pub mod error;
pub mod persist;
pub mod query;
pub mod similarity;
pub mod tfidf;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use error::{CoreError, Result};

/// Dense column index of a term in a fitted vocabulary.
pub type TermId = usize;

/// One row per problem, one column per vocabulary term.
pub type DocumentVector = Vec<f32>;

/// A judge site with its own corpus and index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Leetcode,
    Codeforces,
    Codechef,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Leetcode, Platform::Codeforces, Platform::Codechef];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leetcode => "leetcode",
            Self::Codeforces => "codeforces",
            Self::Codechef => "codechef",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leetcode" => Ok(Self::Leetcode),
            "codeforces" => Ok(Self::Codeforces),
            "codechef" => Ok(Self::Codechef),
            other => Err(CoreError::Invalid(format!(
                "unknown platform: {other} (expected leetcode|codeforces|codechef)"
            ))),
        }
    }
}

/// Canonical problem row. Its position in a table is its identity and must
/// match the row index of its vector in the document-term matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub name: String,
    pub url: String,
    pub score: f32,
}

/// Round a score to three decimals for display.
pub fn round_score(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}
