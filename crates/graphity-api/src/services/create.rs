//! The create pipeline: turns a decoded create request into a queued
//! [`Operation`].
//!
//! Every failure, whatever step raised it, goes through
//! [`CreatePipeline::reject`]: staged files are removed first, then the
//! responder receives exactly one terminal call and nothing is enqueued. On
//! success the responder travels inside the operation and is completed by
//! whoever executes it.

use chrono::{DateTime, Utc};
use graphity_core::constants::{FOLLOW_TARGET, STATUS_UPDATE_TYPE, TYPE, USER_ID};
use graphity_core::models::{CreateType, FormItemSet, Operation, StatusUpdate};
use graphity_core::{
    report_error, AppError, ClientResponder, EntityId, ErrorMetadata, IdentifierRole,
    IdentifierValidator, StatusUpdateFactory, TemplateRegistry,
};
use graphity_storage::{FileStager, StagedFiles};
use graphity_worker::CommandQueue;
use uuid::Uuid;

use crate::error::log_error;

/// What happened to a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// An operation was queued; its executor completes the responder.
    Enqueued { operation_id: Uuid },
    /// Nothing was queued; the responder has already been completed.
    Rejected { error_code: &'static str },
}

/// A validated request, ready to become an operation.
enum Prepared {
    Friendship {
        actor_id: EntityId,
        target_id: EntityId,
    },
    StatusUpdate {
        actor_id: EntityId,
        status_update: StatusUpdate,
        staged: StagedFiles,
    },
}

#[derive(Debug, Clone)]
pub struct CreatePipeline {
    validator: IdentifierValidator,
    registry: TemplateRegistry,
    factory: StatusUpdateFactory,
    stager: FileStager,
    queue: CommandQueue,
}

impl CreatePipeline {
    pub fn new(
        validator: IdentifierValidator,
        registry: TemplateRegistry,
        stager: FileStager,
        queue: CommandQueue,
    ) -> Self {
        Self {
            validator,
            factory: StatusUpdateFactory::new(registry.clone()),
            registry,
            stager,
            queue,
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// False once the command worker has stopped draining the queue.
    pub fn is_accepting(&self) -> bool {
        !self.queue.is_closed()
    }

    /// Run one create request. `form` is the result of decoding the request
    /// body, so decoding failures are reported like every other failure.
    #[tracing::instrument(skip_all)]
    pub async fn handle(
        &self,
        form: Result<FormItemSet, AppError>,
        responder: Box<dyn ClientResponder>,
    ) -> CreateOutcome {
        let mut items = match form {
            Ok(items) => items,
            Err(e) => return Self::reject(responder, &e),
        };

        let timestamp = Utc::now();
        let prepared = match self.prepare(&mut items, timestamp).await {
            Ok(prepared) => prepared,
            Err(e) => return Self::reject(responder, &e),
        };

        let (operation, staged) = match prepared {
            Prepared::Friendship {
                actor_id,
                target_id,
            } => (
                Operation::create_friendship(actor_id, target_id, timestamp, responder),
                None,
            ),
            Prepared::StatusUpdate {
                actor_id,
                status_update,
                staged,
            } => (
                Operation::create_status_update(actor_id, status_update, timestamp, responder),
                Some(staged),
            ),
        };

        let operation_id = operation.id();
        let kind = operation.command().kind();
        let actor_id = operation.command().actor_id();

        if let Err(e) = self.queue.push(operation) {
            let (error, operation) = e.into_parts();
            if let Some(staged) = staged {
                staged.rollback(&mut items).await;
            }
            return Self::reject(operation.into_responder(), &error);
        }

        if let Some(staged) = staged {
            staged.commit();
        }

        tracing::info!(
            operation.id = %operation_id,
            operation.kind = kind,
            actor_id = %actor_id,
            "Create request accepted"
        );
        CreateOutcome::Enqueued { operation_id }
    }

    async fn prepare(
        &self,
        items: &mut FormItemSet,
        timestamp: DateTime<Utc>,
    ) -> Result<Prepared, AppError> {
        let actor_id = self
            .validator
            .parse(items.field(USER_ID), IdentifierRole::Actor)?;

        let create_type: CreateType = items
            .field(TYPE)
            .unwrap_or_default()
            .parse()
            .unwrap_or(CreateType::StatusUpdate(None));

        let template_name = match create_type {
            CreateType::Follow => {
                let target_id = self
                    .validator
                    .parse(items.field(FOLLOW_TARGET), IdentifierRole::Target)?;
                return Ok(Prepared::Friendship {
                    actor_id,
                    target_id,
                });
            }
            CreateType::StatusUpdate(from_type) => items
                .field(STATUS_UPDATE_TYPE)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .or(from_type)
                .ok_or_else(|| AppError::MissingField(STATUS_UPDATE_TYPE.to_string()))?,
        };

        let template = self.registry.lookup(&template_name)?;
        let staged = self.stager.stage(&template, items).await?;

        match self.factory.instantiate(&template_name, items, timestamp) {
            Ok(status_update) => Ok(Prepared::StatusUpdate {
                actor_id,
                status_update,
                staged,
            }),
            Err(e) => {
                staged.rollback(items).await;
                Err(e)
            }
        }
    }

    fn reject(responder: Box<dyn ClientResponder>, error: &AppError) -> CreateOutcome {
        log_error(error);
        report_error(responder, error);
        CreateOutcome::Rejected {
            error_code: error.error_code(),
        }
    }
}
