use crate::{fetch::TransportError, store::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum QuellError {
    /// The query text couldn't be parsed
    #[error("could not parse query: {0}")]
    Parse(#[from] async_graphql_parser::Error),
    /// The query parsed, but has a structure we can't work with
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    #[error("unknown fragment `{0}`")]
    UnknownFragment(String),
    #[error("fragment `{0}` spreads itself")]
    FragmentCycle(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QuellError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        QuellError::MalformedQuery(message.into())
    }

    /// Errors that we recover from by sending the query through untouched
    pub fn forces_pass_through(&self) -> bool {
        matches!(self, QuellError::UnknownFragment(_) | QuellError::FragmentCycle(_))
    }
}
