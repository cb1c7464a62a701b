use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::saju_tests;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = saju_tests)]
pub struct SajuTestEntity {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub birth_time: Option<String>,
    pub gender: String,
    pub result: String,
    pub model_used: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = saju_tests)]
pub struct NewSajuTestEntity {
    pub user_id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub birth_time: Option<String>,
    pub gender: String,
    pub result: String,
    pub model_used: String,
}
