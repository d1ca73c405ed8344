//! Entity identifier parsing and validation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which identifier of a create request is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierRole {
    /// The user performing the create request
    Actor,
    /// The user being followed
    Target,
}

impl fmt::Display for IdentifierRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierRole::Actor => write!(f, "actor"),
            IdentifierRole::Target => write!(f, "target"),
        }
    }
}

/// A strictly positive entity identifier accepted by the graph layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// Wrap `id` without consulting any domain predicate. `None` unless
    /// strictly positive.
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain validity check supplied by the graph layer.
pub trait IdentifierPredicate: Send + Sync {
    fn is_valid_identifier(&self, id: i64) -> bool;
}

/// Accepts every positive identifier. Used when the graph layer does not
/// supply a stricter check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPositiveIdentifier;

impl IdentifierPredicate for AnyPositiveIdentifier {
    fn is_valid_identifier(&self, id: i64) -> bool {
        id > 0
    }
}

impl<F> IdentifierPredicate for F
where
    F: Fn(i64) -> bool + Send + Sync,
{
    fn is_valid_identifier(&self, id: i64) -> bool {
        self(id)
    }
}

/// Parses raw form values into [`EntityId`]s.
#[derive(Clone)]
pub struct IdentifierValidator {
    predicate: Arc<dyn IdentifierPredicate>,
}

impl IdentifierValidator {
    pub fn new(predicate: Arc<dyn IdentifierPredicate>) -> Self {
        Self { predicate }
    }

    /// Parse `raw` as an identifier for `role`.
    ///
    /// A missing value is reported the same way as a malformed one, so a
    /// follow request without a target fails as an invalid target identifier.
    pub fn parse(&self, raw: Option<&str>, role: IdentifierRole) -> Result<EntityId, AppError> {
        let invalid = |reason: &str| AppError::InvalidIdentifier {
            role,
            reason: reason.to_string(),
        };

        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(invalid("user identifier is missing."));
        }

        let id: i64 = raw
            .parse()
            .map_err(|_| invalid("user identifier has to be a number."))?;

        if id <= 0 {
            return Err(invalid("user identifier has to be greater than zero."));
        }
        if !self.predicate.is_valid_identifier(id) {
            return Err(invalid("user identifier does not refer to a known user."));
        }

        Ok(EntityId(id))
    }
}

impl Default for IdentifierValidator {
    fn default() -> Self {
        Self::new(Arc::new(AnyPositiveIdentifier))
    }
}

impl fmt::Debug for IdentifierValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierValidator").finish_non_exhaustive()
    }
}
