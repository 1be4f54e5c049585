//! Error taxonomy of the consistency engine.
//!
//! Every engine operation returns a [`TopologyError`]. Store-level
//! [`RepositoryError`]s are folded into it: missing rows become
//! [`TopologyError::NotFound`], constraint violations become
//! [`TopologyError::Conflict`], and everything else is a
//! [`TopologyError::TransactionFailed`].

use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::define_labelled_enum;
use crate::models::SectorId;

/// Result type for engine operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Why a bulk add inserted nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoCandidateReason {
    /// None of the candidates reference an existing sector.
    NoneExist,
    /// Every existing candidate is already related to the primary sector.
    AllAlreadyRelated,
}

define_labelled_enum!(NoCandidateReason {
    NoneExist => "none_exist",
    AllAlreadyRelated => "all_already_related",
});

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("No valid candidates for sector {sector}: {reason}")]
    NoValidCandidates {
        sector: SectorId,
        reason: NoCandidateReason,
        rejected: Vec<SectorId>,
    },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Transaction failed: {source}")]
    TransactionFailed {
        #[source]
        source: RepositoryError,
    },
}

impl TopologyError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NoValidCandidates { .. } => "NO_VALID_CANDIDATES",
            Self::Conflict { .. } => "CONFLICT",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::TransactionFailed { .. } => "TRANSACTION_FAILED",
        }
    }
}

impl From<RepositoryError> for TopologyError {
    fn from(err: RepositoryError) -> Self {
        let err = match err.into_aborted::<TopologyError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };

        match err {
            RepositoryError::NotFound { context, .. } => TopologyError::NotFound {
                entity: context.entity.unwrap_or_else(|| "record".to_string()),
                id: context.entity_id.unwrap_or_default(),
            },
            RepositoryError::Conflict { message, context } => TopologyError::Conflict {
                message: match context.details {
                    Some(details) => format!("{} ({})", message, details),
                    None => message,
                },
            },
            other => TopologyError::TransactionFailed { source: other },
        }
    }
}

impl From<TopologyError> for RepositoryError {
    fn from(err: TopologyError) -> Self {
        match err {
            // Keep the store error itself so retryability survives
            TopologyError::TransactionFailed { source } => source,
            other => RepositoryError::aborted(other),
        }
    }
}
