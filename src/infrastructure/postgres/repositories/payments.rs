use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{entities::payments::NewPaymentEntity, repositories::payments::PaymentRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn record_payment(&self, new_payment: NewPaymentEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(payments::table)
            .values(&new_payment)
            .returning(payments::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }
}
