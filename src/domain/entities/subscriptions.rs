use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: String,
    pub billing_key: String,
    pub customer_key: String,
    pub card_number: Option<String>,
    pub card_company: Option<String>,
    pub status: String,
    pub next_billing_date: NaiveDate,
    pub last_billing_date: Option<DateTime<Utc>>,
    pub billing_key_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscriptionEntity {
    pub user_id: String,
    pub billing_key: String,
    pub customer_key: String,
    pub card_number: Option<String>,
    pub card_company: Option<String>,
    pub status: String,
    pub next_billing_date: NaiveDate,
}
