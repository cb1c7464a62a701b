use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::users::{NewUserEntity, UserEntity};
use crate::domain::value_objects::enums::user_statuses::UserSubscriptionStatus;

#[automock]
#[async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserEntity>>;

    /// Insert from an identity-provider webhook; updates email/name when the
    /// row already exists.
    async fn upsert_identity(&self, user_id: &str, email: &str, name: &str) -> Result<()>;

    /// Lazy creation on first analysis request. Returns the existing row
    /// untouched when the user is already known.
    async fn insert_if_missing(&self, new_user: NewUserEntity) -> Result<UserEntity>;

    async fn set_entitlement(
        &self,
        user_id: &str,
        status: UserSubscriptionStatus,
        test_count: i32,
    ) -> Result<()>;

    /// Atomic decrement with a zero floor. Returns the remaining count, or
    /// None when no credit was available (the row is left untouched).
    async fn claim_test_credit(&self, user_id: &str) -> Result<Option<i32>>;

    /// Compensating increment for a claimed credit whose analysis failed.
    async fn refund_test_credit(&self, user_id: &str) -> Result<()>;
}
