use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Locally generated identifier of this anchor.
///
/// Always exactly [`AnchorId::LEN`] lowercase characters without separators.
/// Older deployments persisted hyphenated UUIDs; those are rejected by
/// [`AnchorId::parse`] so the caller can mint a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnchorId(String);

impl AnchorId {
    pub const LEN: usize = 12;

    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        AnchorId(simple[..Self::LEN].to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() != Self::LEN
            || trimmed.contains(['-', ':', '_', ' '])
        {
            return Err(ModelError::InvalidAnchorId(raw.to_string()));
        }
        Ok(AnchorId(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AnchorId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AnchorId::parse(&value)
    }
}

impl From<AnchorId> for String {
    fn from(value: AnchorId) -> Self {
        value.0
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
