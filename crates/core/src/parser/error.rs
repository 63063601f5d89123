//! Recipe parser errors.

use thiserror::Error;

/// Errors that can occur while turning a recipe document into a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    /// The document has no text.
    #[error("recipe document is empty")]
    EmptyDocument,

    /// The document exceeds the size the parser accepts.
    #[error("recipe document is {len} characters, the limit is {max}")]
    DocumentTooLong {
        /// Characters in the document.
        len: usize,
        /// Accepted maximum.
        max: usize,
    },

    /// The model answered with something that is not a usable recipe.
    #[error("could not read recipe from model response: {0}")]
    InvalidResponse(String),

    /// The request never got an answer.
    #[error("network error: {0}")]
    Transport(String),

    /// The request took longer than the configured timeout.
    #[error("recipe parser timed out")]
    Timeout,

    /// The upstream API refused the API key.
    #[error("recipe parser API key was rejected")]
    Unauthorized,

    /// The upstream API is throttling requests.
    #[error("recipe parser is rate limited")]
    RateLimited,

    /// Any other non-success status.
    #[error("recipe parser returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

impl ParserError {
    /// True when the fault lies with the submitted document.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyDocument | Self::DocumentTooLong { .. })
    }
}
