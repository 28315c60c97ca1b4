//! Response lifecycle: `pending -> processing -> {completed, failed, cancelled}` state machine
//! over [`gw_storage::Storage`]'s response methods. Terminal states are sticky; the repository
//! itself refuses to overwrite one, so this service only needs to translate storage errors and
//! enforce per-caller ownership.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use gw_common::{GatewayError, GatewayResult, IdKind, ids};
use gw_storage::{ItemPage, NewResponse, ResponseRecord, Storage};

pub struct ResponseService {
    storage: Arc<dyn Storage>,
}

impl ResponseService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// `Create`: a `Response` row is written for every completion — streamed, unary, and background
    /// alike — so every completion is auditable through the same surface.
    pub async fn create(
        &self,
        user_id: i64,
        model: &str,
        input: JsonValue,
        params: JsonValue,
        conversation_id: Option<i64>,
        previous_response_id: Option<i64>,
    ) -> GatewayResult<ResponseRecord> {
        self.storage
            .create_response(NewResponse {
                public_id: ids::generate(IdKind::Response),
                user_id,
                conversation_id,
                previous_response_id,
                model: model.to_string(),
                input,
                params,
            })
            .await
            .map_err(GatewayError::internal)
    }

    /// `GetByPublicID`, scoped to the caller. Unlike conversations, a response owned by another tenant
    /// is reported as plain `NotFound` — responses carry no shareable/private distinction of their own,
    /// they inherit whatever the conversation they belong to already enforces.
    pub async fn get(&self, public_id: &str, user_id: i64) -> GatewayResult<ResponseRecord> {
        let response = self
            .storage
            .get_response_by_public_id(public_id)
            .await
            .map_err(GatewayError::internal)?
            .ok_or(GatewayError::NotFound)?;
        if response.user_id != user_id {
            return Err(GatewayError::NotFound);
        }
        Ok(response)
    }

    pub async fn mark_processing(&self, response_id: i64) -> GatewayResult<()> {
        self.storage
            .mark_response_processing(response_id)
            .await
            .map_err(GatewayError::internal)
    }

    pub async fn complete(
        &self,
        response_id: i64,
        output: JsonValue,
        usage: Option<JsonValue>,
    ) -> GatewayResult<()> {
        self.storage
            .complete_response(response_id, output, usage)
            .await
            .map_err(GatewayError::internal)
    }

    pub async fn fail(&self, response_id: i64, error: String) -> GatewayResult<()> {
        self.storage
            .fail_response(response_id, error)
            .await
            .map_err(GatewayError::internal)
    }

    /// `Cancel(publicID, userID)`: sets `cancelledAt` and flips the status only if it's still
    /// non-terminal; a cancel racing a completion is a no-op, not an error.
    pub async fn cancel(&self, public_id: &str, user_id: i64) -> GatewayResult<ResponseRecord> {
        let response = self.get(public_id, user_id).await?;
        self.storage
            .cancel_response(response.id)
            .await
            .map_err(GatewayError::internal)?;
        self.get(public_id, user_id).await
    }

    /// `ListInputItems(responseID, cursor)`.
    pub async fn list_input_items(
        &self,
        public_id: &str,
        user_id: i64,
        after_id: Option<i64>,
        limit: u64,
    ) -> GatewayResult<ItemPage> {
        let response = self.get(public_id, user_id).await?;
        self.storage
            .list_response_input_items(response.id, after_id, limit)
            .await
            .map_err(GatewayError::internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_storage::test_support::InMemoryStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn cancel_is_a_no_op_once_terminal() {
        let storage = Arc::new(InMemoryStorage::default());
        let service = ResponseService::new(storage.clone());
        let user = storage.seed_user("u@example.com").await;

        let response = service
            .create(user, "gpt-test", JsonValue::Null, JsonValue::Null, None, None)
            .await
            .unwrap();
        service
            .complete(response.id, serde_json::json!({"ok": true}), None)
            .await
            .unwrap();

        let cancelled = service.cancel(&response.public_id, user).await.unwrap();
        assert_eq!(cancelled.status, "completed");
    }

    #[tokio::test]
    async fn cancel_flips_a_pending_response() {
        let storage = Arc::new(InMemoryStorage::default());
        let service = ResponseService::new(storage.clone());
        let user = storage.seed_user("u@example.com").await;

        let response = service
            .create(user, "gpt-test", JsonValue::Null, JsonValue::Null, None, None)
            .await
            .unwrap();
        let cancelled = service.cancel(&response.public_id, user).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");
    }

    #[tokio::test]
    async fn get_from_another_user_is_not_found() {
        let storage = Arc::new(InMemoryStorage::default());
        let service = ResponseService::new(storage.clone());
        let owner = storage.seed_user("owner@example.com").await;
        let intruder = storage.seed_user("intruder@example.com").await;

        let response = service
            .create(owner, "gpt-test", JsonValue::Null, JsonValue::Null, None, None)
            .await
            .unwrap();

        let err = service.get(&response.public_id, intruder).await;
        assert!(matches!(err, Err(GatewayError::NotFound)));
    }
}
