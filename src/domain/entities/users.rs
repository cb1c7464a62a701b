use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::users;

/// Identity + entitlement row. `id` is the Clerk user id (opaque string).
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub subscription_status: String,
    pub test_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserEntity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub subscription_status: String,
    pub test_count: i32,
}
