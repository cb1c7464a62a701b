use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{NewSubscriptionEntity, SubscriptionEntity};

/// Lifecycle transitions that touch both the subscriptions row and the users
/// row run inside a single database transaction, so the pair changes together
/// or not at all.
#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_non_terminated_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionEntity>>;

    async fn find_by_billing_key(&self, billing_key: &str)
        -> Result<Option<SubscriptionEntity>>;

    async fn insert(&self, new_subscription: NewSubscriptionEntity)
        -> Result<SubscriptionEntity>;

    /// Compensating delete for a subscription whose first charge failed.
    async fn delete_by_id(&self, subscription_id: Uuid) -> Result<()>;

    /// active -> cancelled; user row follows. Benefits persist until the
    /// renewal date, so next_billing_date is left untouched.
    async fn mark_cancelled(&self, subscription_id: Uuid, user_id: &str) -> Result<()>;

    /// cancelled -> active; user row back to pro.
    async fn mark_resumed(&self, subscription_id: Uuid, user_id: &str) -> Result<()>;

    /// Renewal charge succeeded: advance the billing horizon and replenish
    /// the user's analysis count.
    async fn record_renewal(
        &self,
        subscription_id: Uuid,
        user_id: &str,
        next_billing_date: NaiveDate,
        charged_at: DateTime<Utc>,
        test_count: i32,
    ) -> Result<()>;

    /// Renewal charge failed: both rows move to payment_failed;
    /// next_billing_date stays as the retry/eligibility marker.
    async fn mark_payment_failed(&self, subscription_id: Uuid, user_id: &str) -> Result<()>;

    /// Cancelled subscription passed its renewal date: the row is retired and
    /// the user drops back to free with zero credits.
    async fn mark_terminated(
        &self,
        subscription_id: Uuid,
        user_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Sweep pass 1 candidates: status=active, next_billing_date <= today.
    async fn list_due_for_renewal(&self, today: NaiveDate) -> Result<Vec<SubscriptionEntity>>;

    /// Sweep pass 2 candidates: status=cancelled, next_billing_date < today.
    async fn list_due_for_termination(&self, today: NaiveDate)
        -> Result<Vec<SubscriptionEntity>>;
}
