//! Capability gate.
//!
//! Authentication happens upstream. The gateway forwards the caller's
//! capabilities in the `x-permissions` header as a comma-separated list,
//! e.g. `dnc:write,ecd:write,stations:write`. `*` grants everything.

use std::collections::BTreeSet;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AppError;
use crate::models::SectorKind;

/// Header carrying the caller's capabilities.
pub const PERMISSIONS_HEADER: &str = "x-permissions";

pub const STATIONS_WRITE: &str = "stations:write";
pub const BLOCKS_WRITE: &str = "blocks:write";

/// Write capability for sectors, pairs and train sectors of `kind`.
pub fn sector_write(kind: SectorKind) -> &'static str {
    match kind {
        SectorKind::Dnc => "dnc:write",
        SectorKind::Ecd => "ecd:write",
    }
}

/// Capabilities of the calling identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    /// Parse a comma-separated capability list. Blank entries are ignored.
    pub fn parse(header: &str) -> Self {
        Self(
            header
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    pub fn has(&self, capability: &str) -> bool {
        self.0.contains("*") || self.0.contains(capability)
    }

    /// Fail with `403 Forbidden` unless `capability` was granted.
    pub fn require(&self, capability: &str) -> Result<(), AppError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "missing capability '{}'",
                capability
            )))
        }
    }
}

impl<S> FromRequestParts<S> for Permissions
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .headers
            .get(PERMISSIONS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(Permissions::parse)
            .unwrap_or_default())
    }
}
