// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/// Errors produced while synchronizing a display surface with a contract.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The wallet or account provider failed or refused access.
    #[error("account provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A read, a transaction or a subscription failed in the contract transport.
    #[error("contract transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A contract function returned values of unexpected shape.
    #[error("unexpected output from `{function}`: expected {expected}")]
    UnexpectedOutput {
        function: String,
        expected: &'static str,
    },

    /// An event payload did not carry the expected values.
    #[error("malformed `{event}` event: expected {expected}")]
    MalformedEvent {
        event: String,
        expected: &'static str,
    },

    /// The display surface has no element with this identifier.
    #[error("no display element with id `{0}`")]
    UnknownElement(String),

    /// An action was requested before the provider granted access to an account.
    #[error("no active account: access to the wallet was not granted")]
    NoActiveAccount,

    /// The synchronizer is no longer accepting triggers.
    #[error("the synchronizer has stopped")]
    Stopped,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wraps any error coming from an account provider implementation.
    pub fn provider(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Provider(error.into())
    }

    /// Wraps any error coming from a contract transport implementation.
    pub fn transport(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Transport(error.into())
    }

    pub(crate) fn unexpected_output(function: &str, expected: &'static str) -> Self {
        Error::UnexpectedOutput {
            function: function.to_owned(),
            expected,
        }
    }
}
