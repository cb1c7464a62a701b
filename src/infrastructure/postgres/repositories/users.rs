use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain::{
        entities::users::{NewUserEntity, UserEntity},
        repositories::users::UserRepository,
        value_objects::{
            enums::user_statuses::UserSubscriptionStatus, subscriptions::INITIAL_TEST_COUNT,
        },
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::users},
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .find(user_id)
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert_identity(&self, user_id: &str, email: &str, name: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let new_user = NewUserEntity {
            id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            subscription_status: UserSubscriptionStatus::Free.to_string(),
            test_count: INITIAL_TEST_COUNT,
        };

        // Replays and out-of-order deliveries converge on the latest identity
        // without touching the entitlement columns.
        insert_into(users::table)
            .values(&new_user)
            .on_conflict(users::id)
            .do_update()
            .set((
                users::email.eq(email),
                users::name.eq(name),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn insert_if_missing(&self, new_user: NewUserEntity) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(users::table)
            .values(&new_user)
            .on_conflict(users::id)
            .do_nothing()
            .execute(&mut conn)?;

        let result = users::table
            .find(&new_user.id)
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)?;

        Ok(result)
    }

    async fn set_entitlement(
        &self,
        user_id: &str,
        status: UserSubscriptionStatus,
        test_count: i32,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table.find(user_id))
            .set((
                users::subscription_status.eq(status.to_string()),
                users::test_count.eq(test_count),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn claim_test_credit(&self, user_id: &str) -> Result<Option<i32>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The test_count > 0 guard makes the decrement atomic; two racing
        // requests cannot both take the last credit.
        let remaining = update(
            users::table
                .filter(users::id.eq(user_id))
                .filter(users::test_count.gt(0)),
        )
        .set((
            users::test_count.eq(users::test_count - 1),
            users::updated_at.eq(Utc::now()),
        ))
        .returning(users::test_count)
        .get_result::<i32>(&mut conn)
        .optional()?;

        Ok(remaining)
    }

    async fn refund_test_credit(&self, user_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table.find(user_id))
            .set((
                users::test_count.eq(users::test_count + 1),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
