use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::saju_tests::{NewSajuTestEntity, SajuTestEntity};

#[automock]
#[async_trait]
pub trait SajuTestRepository {
    async fn insert(&self, new_test: NewSajuTestEntity) -> Result<SajuTestEntity>;

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SajuTestEntity>>;

    async fn find_by_id_for_user(
        &self,
        test_id: Uuid,
        user_id: &str,
    ) -> Result<Option<SajuTestEntity>>;

    /// Owner-scoped hard delete. Returns false when no matching row existed.
    async fn delete_by_id_for_user(&self, test_id: Uuid, user_id: &str) -> Result<bool>;
}
