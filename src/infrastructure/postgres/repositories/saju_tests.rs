use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, delete, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::saju_tests::{NewSajuTestEntity, SajuTestEntity},
        repositories::saju_tests::SajuTestRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::saju_tests},
};

pub struct SajuTestPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SajuTestPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SajuTestRepository for SajuTestPostgres {
    async fn insert(&self, new_test: NewSajuTestEntity) -> Result<SajuTestEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(saju_tests::table)
            .values(&new_test)
            .returning(SajuTestEntity::as_returning())
            .get_result::<SajuTestEntity>(&mut conn)?;

        Ok(result)
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SajuTestEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = saju_tests::table
            .filter(saju_tests::user_id.eq(user_id))
            .order(saju_tests::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(SajuTestEntity::as_select())
            .load::<SajuTestEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id_for_user(
        &self,
        test_id: Uuid,
        user_id: &str,
    ) -> Result<Option<SajuTestEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = saju_tests::table
            .find(test_id)
            .filter(saju_tests::user_id.eq(user_id))
            .select(SajuTestEntity::as_select())
            .first::<SajuTestEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn delete_by_id_for_user(&self, test_id: Uuid, user_id: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(
            saju_tests::table
                .find(test_id)
                .filter(saju_tests::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
