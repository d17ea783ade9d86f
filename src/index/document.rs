//! Document records stored in per-cluster metadata files.

use serde::{Deserialize, Serialize};

/// Descriptive fields shared by every document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFields {
    /// Identifier of the record in the upstream dataset
    pub source_id: String,
    pub name: String,
    pub locality: String,
}

/// Closed set of document kinds, tagged by the `kind` field on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentMetadata {
    District(SourceFields),
    School(SourceFields),
}

impl DocumentMetadata {
    /// Shared fields regardless of kind.
    #[must_use]
    pub fn fields(&self) -> &SourceFields {
        match self {
            Self::District(fields) | Self::School(fields) => fields,
        }
    }

    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::District(_) => "district",
            Self::School(_) => "school",
        }
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.fields().source_id
    }
}

/// One embedded text chunk.
///
/// Records are owned by exactly one cluster and sit at the same position as
/// their vector in that cluster's embeddings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique within the whole index
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}
