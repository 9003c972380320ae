//! Error types raised before or while loading run inputs.

/// Problems with the evidence filter configuration.
///
/// These are reported before any variant is processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown evidence filter attribute: {0}")]
    UnknownAttribute(String),
    #[error("Invalid evidence level '{0}' (expected one of A, B, C, D, E)")]
    InvalidLevel(String),
    #[error("Evidence filter attribute '{0}' has no accepted values")]
    EmptyValues(String),
    #[error("Malformed evidence filter constraint '{0}' (expected attribute=value[,value...])")]
    MalformedConstraint(String),
    #[error("Declared cancer type '{0}' could not be resolved in the disease ontology")]
    UnresolvedCancerType(String),
}

/// Problems encountered while reading a disease ontology definition file.
#[derive(thiserror::Error, Debug)]
pub enum OntologyError {
    #[error("[Term] stanza ending at line {0} has no id field")]
    MissingId(usize),
    #[error("Malformed line {line}: '{content}' (expected 'key: value')")]
    MalformedLine { line: usize, content: String },
    #[error("Duplicate term id {0}")]
    DuplicateId(String),
    #[error("Failed to read ontology file")]
    Io(#[from] std::io::Error),
}
