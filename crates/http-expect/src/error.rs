//! Error types for the expectation engine.
//!
//! Every variant renders a non-empty diagnostic. The fatal adapters on
//! [`crate::Registry`] forward that text to the configured failure sink.

/// Errors produced while registering, consuming, or answering requests.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MockError {
    /// An expectation or assertion URL could not be parsed.
    #[error("failed to parse url {url:?}. Error: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The received body stream failed while being buffered.
    #[error("http-expect: failed to read requested body. Error: {0}")]
    BodyRead(String),

    /// Nothing matched exactly, but a closest candidate exists.
    #[error(
        "\n\nhttp-expect: Unexpected Request\n-----------------------------\n\n{request}\n\nThe closest request I have is: \n\n{closest}\nDiff: {diff}\n"
    )]
    Unmatched {
        request: String,
        closest: String,
        diff: String,
    },

    /// Nothing is registered that resembles the request.
    #[error(
        "http-expect: I don't know what to return because the request was unexpected.\n\tEither do Registry::on({method:?}, {url:?}), or remove the request.\n"
    )]
    Unexpected { method: String, url: String },

    /// An expectation matched but has no uses left.
    #[error(
        "http-expect: The request has been called over {total_uses} times.\n\tEither do one more Registry::on({method:?}, {url:?}), or remove extra request."
    )]
    Exhausted {
        total_uses: usize,
        method: String,
        url: String,
    },

    /// The canned response could not be written to the transport.
    #[error("error writing return body: {0}")]
    ResponseWrite(String),

    /// The server could not bind its listening socket.
    #[error("failed to bind {address}: {reason}")]
    Bind { address: String, reason: String },

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MockError {
    /// Whether the error was caused by the request not matching any usable
    /// expectation.
    pub fn is_match_failure(&self) -> bool {
        matches!(
            self,
            MockError::Unmatched { .. } | MockError::Unexpected { .. } | MockError::Exhausted { .. }
        )
    }
}
