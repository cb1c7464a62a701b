use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::NewPaymentEntity;

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn record_payment(&self, new_payment: NewPaymentEntity) -> Result<Uuid>;
}
