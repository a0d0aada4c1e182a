use tracing::{info, warn};

use super::{message_in, ApiClient};
use crate::error::ClientError;
use crate::outcome::Outcome;
use crate::session::SessionStore;

const DELETE_FAILED: &str = "Unable to delete the listing";

impl<S> ApiClient<S>
where
    S: SessionStore + 'static,
{
    /// `DELETE /delete-post/{id}`. The caller must have confirmed with the user
    /// before calling; any 2xx counts as success and the body is ignored.
    pub async fn delete_resource(&self, resource_id: &str) -> Outcome<()> {
        match self.delete_listing(resource_id).await {
            Ok(()) => {
                info!(resource_id, "listing deleted");
                Ok(())
            }
            Err(err) => {
                warn!(resource_id, error = %err, "listing delete failed");
                Err(err.into_generic_failure(DELETE_FAILED))
            }
        }
    }

    async fn delete_listing(&self, resource_id: &str) -> Result<(), ClientError> {
        let resource_id = resource_id.trim();
        if resource_id.is_empty() {
            return Err(ClientError::Validation(
                "A listing id is required".to_string(),
            ));
        }

        let url = self.endpoint(&["delete-post", resource_id])?;
        let response = self.http.delete(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Server {
            status: Some(status),
            message: message_in(&body),
        })
    }
}
