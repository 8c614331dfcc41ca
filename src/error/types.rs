use thiserror::Error;

use crate::anchors::AnchorId;
use crate::connection::ConnectionId;
use crate::parts::PartId;

/// Unified result type for the part engine.
pub type Result<T> = std::result::Result<T, MvcError>;

/// Errors surfaced by structural misuse of the part tree and routing layer.
///
/// Synchronization never fails because of the content it is given; every
/// variant here describes a call that broke a tree or anchor contract.
#[derive(Debug, Error)]
pub enum MvcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("part {0} is not alive in this viewer")]
    StalePart(PartId),
    #[error("anchor {0} not found")]
    UnknownAnchor(AnchorId),
    #[error("connection {0} not found")]
    UnknownConnection(ConnectionId),
    #[error("content part factory failure: {0}")]
    Factory(String),
}

impl MvcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation(message.into())
    }

    /// True for errors that belong to the `InvalidArgument` family.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::StalePart(_)
                | Self::UnknownAnchor(_)
                | Self::UnknownConnection(_)
        )
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionViolation(_))
    }
}
