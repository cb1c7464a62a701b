use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{Connection, OptionalExtension, RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::{NewSubscriptionEntity, SubscriptionEntity},
        repositories::subscriptions::SubscriptionRepository,
        value_objects::enums::{
            subscription_statuses::SubscriptionStatus, user_statuses::UserSubscriptionStatus,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{subscriptions, users},
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_non_terminated_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::status.ne(SubscriptionStatus::Terminated.to_string()))
            .order(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_billing_key(
        &self,
        billing_key: &str,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::billing_key.eq(billing_key))
            .filter(subscriptions::status.ne(SubscriptionStatus::Terminated.to_string()))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn insert(
        &self,
        new_subscription: NewSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(subscriptions::table)
            .values(&new_subscription)
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn delete_by_id(&self, subscription_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        delete(subscriptions::table.find(subscription_id)).execute(&mut conn)?;

        Ok(())
    }

    async fn mark_cancelled(&self, subscription_id: Uuid, user_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            update(subscriptions::table.find(subscription_id))
                .set(subscriptions::status.eq(SubscriptionStatus::Cancelled.to_string()))
                .execute(conn)?;

            update(users::table.find(user_id))
                .set((
                    users::subscription_status
                        .eq(UserSubscriptionStatus::Cancelled.to_string()),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn mark_resumed(&self, subscription_id: Uuid, user_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            update(subscriptions::table.find(subscription_id))
                .set(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .execute(conn)?;

            update(users::table.find(user_id))
                .set((
                    users::subscription_status.eq(UserSubscriptionStatus::Pro.to_string()),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn record_renewal(
        &self,
        subscription_id: Uuid,
        user_id: &str,
        next_billing_date: NaiveDate,
        charged_at: DateTime<Utc>,
        test_count: i32,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            update(subscriptions::table.find(subscription_id))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Active.to_string()),
                    subscriptions::next_billing_date.eq(next_billing_date),
                    subscriptions::last_billing_date.eq(Some(charged_at)),
                ))
                .execute(conn)?;

            update(users::table.find(user_id))
                .set((
                    users::subscription_status.eq(UserSubscriptionStatus::Pro.to_string()),
                    users::test_count.eq(test_count),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn mark_payment_failed(&self, subscription_id: Uuid, user_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            update(subscriptions::table.find(subscription_id))
                .set(subscriptions::status.eq(SubscriptionStatus::PaymentFailed.to_string()))
                .execute(conn)?;

            update(users::table.find(user_id))
                .set((
                    users::subscription_status
                        .eq(UserSubscriptionStatus::PaymentFailed.to_string()),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn mark_terminated(
        &self,
        subscription_id: Uuid,
        user_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            update(subscriptions::table.find(subscription_id))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Terminated.to_string()),
                    subscriptions::billing_key_deleted_at.eq(Some(revoked_at)),
                ))
                .execute(conn)?;

            update(users::table.find(user_id))
                .set((
                    users::subscription_status.eq(UserSubscriptionStatus::Free.to_string()),
                    users::test_count.eq(0),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn list_due_for_renewal(&self, today: NaiveDate) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::next_billing_date.le(today))
            .order(subscriptions::next_billing_date.asc())
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn list_due_for_termination(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Cancelled.to_string()))
            .filter(subscriptions::next_billing_date.lt(today))
            .order(subscriptions::next_billing_date.asc())
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(result)
    }
}
