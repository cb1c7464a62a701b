use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::{
    clerk::{ClerkEvent, EVENT_USER_CREATED, EVENT_USER_UPDATED},
    domain::repositories::users::UserRepository,
};

#[derive(Debug, Error)]
pub enum ClerkWebhookError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ClerkWebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            ClerkWebhookError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Mirrors Clerk user lifecycle events into the users table. Creation and
/// update both land on the same upsert so out-of-order or replayed deliveries
/// converge on the latest identity.
pub struct ClerkWebhookUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
}

impl<U> ClerkWebhookUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn handle(&self, event: ClerkEvent) -> Result<(), ClerkWebhookError> {
        match event.type_.as_str() {
            EVENT_USER_CREATED | EVENT_USER_UPDATED => {
                let user_id = event.data.id.clone();
                let email = event.data.primary_email().unwrap_or_default().to_string();
                let name = event.data.display_name();

                self.user_repo
                    .upsert_identity(&user_id, &email, &name)
                    .await
                    .map_err(|err| {
                        error!(
                            %user_id,
                            event_type = %event.type_,
                            db_error = ?err,
                            "clerk webhook: failed to upsert user"
                        );
                        ClerkWebhookError::Internal(err)
                    })?;

                info!(%user_id, event_type = %event.type_, "clerk webhook: user synced");
                Ok(())
            }
            other => {
                info!(event_type = %other, "clerk webhook: event ignored");
                Ok(())
            }
        }
    }
}
