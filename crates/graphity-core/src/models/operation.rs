use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::identifiers::EntityId;
use crate::models::StatusUpdate;
use crate::responder::ClientResponder;

/// What a create request asks for, parsed from the `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateType {
    Follow,
    /// A status update; carries the template name when the create type names
    /// the template directly (e.g. `type=Photo`).
    StatusUpdate(Option<String>),
}

impl FromStr for CreateType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("follow") {
            Ok(CreateType::Follow)
        } else if s.eq_ignore_ascii_case("status_update") || s.is_empty() {
            Ok(CreateType::StatusUpdate(None))
        } else {
            Ok(CreateType::StatusUpdate(Some(s.to_string())))
        }
    }
}

/// The graph mutation an [`Operation`] requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateFriendship {
        actor_id: EntityId,
        target_id: EntityId,
    },
    CreateStatusUpdate {
        actor_id: EntityId,
        status_update: StatusUpdate,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CreateFriendship { .. } => "create_friendship",
            Command::CreateStatusUpdate { .. } => "create_status_update",
        }
    }

    pub fn actor_id(&self) -> EntityId {
        match self {
            Command::CreateFriendship { actor_id, .. }
            | Command::CreateStatusUpdate { actor_id, .. } => *actor_id,
        }
    }
}

/// An immutable command queued for the graph executor, carrying the
/// responder that reports its eventual outcome.
pub struct Operation {
    id: Uuid,
    command: Command,
    timestamp: DateTime<Utc>,
    responder: Box<dyn ClientResponder>,
}

impl Operation {
    pub fn new(
        command: Command,
        timestamp: DateTime<Utc>,
        responder: Box<dyn ClientResponder>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            timestamp,
            responder,
        }
    }

    pub fn create_friendship(
        actor_id: EntityId,
        target_id: EntityId,
        timestamp: DateTime<Utc>,
        responder: Box<dyn ClientResponder>,
    ) -> Self {
        Self::new(
            Command::CreateFriendship {
                actor_id,
                target_id,
            },
            timestamp,
            responder,
        )
    }

    pub fn create_status_update(
        actor_id: EntityId,
        status_update: StatusUpdate,
        timestamp: DateTime<Utc>,
        responder: Box<dyn ClientResponder>,
    ) -> Self {
        Self::new(
            Command::CreateStatusUpdate {
                actor_id,
                status_update,
            },
            timestamp,
            responder,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Give up the operation, keeping only the responder so the outcome can
    /// be reported.
    pub fn into_responder(self) -> Box<dyn ClientResponder> {
        self.responder
    }

    pub fn into_parts(self) -> (Command, DateTime<Utc>, Box<dyn ClientResponder>) {
        (self.command, self.timestamp, self.responder)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_type_parsing() {
        assert_eq!("FOLLOW".parse::<CreateType>().unwrap(), CreateType::Follow);
        assert_eq!("follow".parse::<CreateType>().unwrap(), CreateType::Follow);
        assert_eq!(
            "status_update".parse::<CreateType>().unwrap(),
            CreateType::StatusUpdate(None)
        );
        assert_eq!(
            "photo".parse::<CreateType>().unwrap(),
            CreateType::StatusUpdate(Some("photo".to_string()))
        );
    }
}
