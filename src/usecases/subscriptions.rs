use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{payments::NewPaymentEntity, subscriptions::NewSubscriptionEntity},
        repositories::{
            payments::PaymentRepository, subscriptions::SubscriptionRepository,
            users::UserRepository,
        },
        value_objects::{
            enums::{
                payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus,
                user_statuses::UserSubscriptionStatus,
            },
            subscriptions::{
                BILLING_PERIOD_DAYS, ORDER_NAME, RENEWAL_TEST_COUNT, SUBSCRIPTION_PRICE_KRW,
                SubscriptionInfoDto, billing_order_id,
            },
        },
    },
    payments::toss_client::{BillingCharge, IssuedBillingKey, TossApiError, TossClient},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn issue_billing_key(
        &self,
        auth_key: &str,
        customer_key: &str,
    ) -> AnyResult<IssuedBillingKey>;

    async fn charge_billing_key(
        &self,
        billing_key: &str,
        customer_key: &str,
        amount: i32,
        order_id: &str,
        order_name: &str,
    ) -> AnyResult<BillingCharge>;

    async fn delete_billing_key(&self, billing_key: &str, customer_key: &str) -> AnyResult<()>;
}

#[async_trait]
impl BillingGateway for TossClient {
    async fn issue_billing_key(
        &self,
        auth_key: &str,
        customer_key: &str,
    ) -> AnyResult<IssuedBillingKey> {
        self.issue_billing_key(auth_key, customer_key).await
    }

    async fn charge_billing_key(
        &self,
        billing_key: &str,
        customer_key: &str,
        amount: i32,
        order_id: &str,
        order_name: &str,
    ) -> AnyResult<BillingCharge> {
        self.charge_billing_key(billing_key, customer_key, amount, order_id, order_name)
            .await
    }

    async fn delete_billing_key(&self, billing_key: &str, customer_key: &str) -> AnyResult<()> {
        self.delete_billing_key(billing_key, customer_key).await
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("subscription already exists")]
    AlreadyExists,
    #[error("no subscription found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("{message}")]
    PaymentDeclined { code: String, message: String },
    #[error("{message}")]
    Gateway {
        code: String,
        message: String,
        status: u16,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::AlreadyExists | SubscriptionError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            SubscriptionError::NotFound | SubscriptionError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::PaymentDeclined { .. } => StatusCode::BAD_REQUEST,
            SubscriptionError::Gateway { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Provider error code, preserved for payment-class failures.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            SubscriptionError::PaymentDeclined { code, .. }
            | SubscriptionError::Gateway { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Translates gateway failures, keeping the Toss error code and status and
/// separating card declines from other provider errors.
fn map_gateway_error(err: anyhow::Error) -> SubscriptionError {
    match err.downcast::<TossApiError>() {
        Ok(toss) if toss.is_card_declined() => SubscriptionError::PaymentDeclined {
            code: toss.code,
            message: "한도초과 또는 잔액부족입니다.".to_string(),
        },
        Ok(toss) => SubscriptionError::Gateway {
            code: toss.code,
            message: toss.message,
            status: toss.status,
        },
        Err(other) => SubscriptionError::Internal(other),
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub payment_key: String,
    pub order_id: String,
}

/// Owns every valid transition of the Subscription + User.subscription_status
/// pair: card registration with first charge, cancel/resume, and the renewal
/// charges issued by the daily sweep.
pub struct SubscriptionUseCase<U, S, P, B>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    subscription_repo: Arc<S>,
    payment_repo: Arc<P>,
    billing: Arc<B>,
}

impl<U, S, P, B> SubscriptionUseCase<U, S, P, B>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        subscription_repo: Arc<S>,
        payment_repo: Arc<P>,
        billing: Arc<B>,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
            payment_repo,
            billing,
        }
    }

    /// Registers a billing key and runs the first charge. The subscription
    /// row is inserted before the charge so the charge path can resolve it by
    /// billing key, and deleted again if that first charge fails, so no
    /// active-looking subscription without a successful charge survives.
    pub async fn create_subscription(
        &self,
        user_id: &str,
        auth_key: &str,
        customer_key: &str,
    ) -> UseCaseResult<()> {
        info!(%user_id, "subscriptions: create subscription requested");

        let existing = self
            .subscription_repo
            .find_non_terminated_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to check existing subscription");
                SubscriptionError::Internal(err)
            })?;

        if let Some(existing) = existing {
            let status = SubscriptionStatus::from_str(&existing.status);
            if status != SubscriptionStatus::PaymentFailed {
                warn!(
                    %user_id,
                    subscription_id = %existing.id,
                    status = %existing.status,
                    "subscriptions: subscription already exists"
                );
                return Err(SubscriptionError::AlreadyExists);
            }

            // A payment_failed row is replaceable: revoke its stale billing
            // key best-effort and retire the row before re-registration.
            info!(
                %user_id,
                subscription_id = %existing.id,
                "subscriptions: replacing payment_failed subscription"
            );
            if let Err(err) = self
                .billing
                .delete_billing_key(&existing.billing_key, &existing.customer_key)
                .await
            {
                warn!(
                    %user_id,
                    subscription_id = %existing.id,
                    error = ?err,
                    "subscriptions: failed to revoke stale billing key; continuing"
                );
            }
            self.subscription_repo
                .delete_by_id(existing.id)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        subscription_id = %existing.id,
                        db_error = ?err,
                        "subscriptions: failed to delete payment_failed subscription"
                    );
                    SubscriptionError::Internal(err)
                })?;
        }

        let issued = self
            .billing
            .issue_billing_key(auth_key, customer_key)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "subscriptions: billing key issuance failed");
                map_gateway_error(err)
            })?;

        let next_billing_date = Utc::now().date_naive() + Duration::days(BILLING_PERIOD_DAYS);
        let subscription = self
            .subscription_repo
            .insert(NewSubscriptionEntity {
                user_id: user_id.to_string(),
                billing_key: issued.billing_key.clone(),
                customer_key: customer_key.to_string(),
                card_number: issued.card.as_ref().and_then(|card| card.last4()),
                card_company: issued
                    .card
                    .as_ref()
                    .and_then(|card| card.issuer_name.clone()),
                status: SubscriptionStatus::Active.to_string(),
                next_billing_date,
            })
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to insert subscription");
                SubscriptionError::Internal(err)
            })?;

        info!(
            %user_id,
            subscription_id = %subscription.id,
            %next_billing_date,
            "subscriptions: subscription row created, running first charge"
        );

        if let Err(err) = self
            .charge_subscription(
                &issued.billing_key,
                customer_key,
                SUBSCRIPTION_PRICE_KRW,
                user_id,
                Some(subscription.id),
            )
            .await
        {
            warn!(
                %user_id,
                subscription_id = %subscription.id,
                error = %err,
                "subscriptions: first charge failed, rolling back subscription row"
            );
            if let Err(delete_err) = self.subscription_repo.delete_by_id(subscription.id).await {
                error!(
                    %user_id,
                    subscription_id = %subscription.id,
                    db_error = ?delete_err,
                    "subscriptions: failed to roll back subscription row"
                );
            }
            return Err(err);
        }

        // The charge has already succeeded here; an entitlement-update
        // failure is logged and corrected by the next successful renewal.
        if let Err(err) = self
            .user_repo
            .set_entitlement(user_id, UserSubscriptionStatus::Pro, RENEWAL_TEST_COUNT)
            .await
        {
            error!(
                %user_id,
                subscription_id = %subscription.id,
                db_error = ?err,
                "subscriptions: failed to update user entitlement after first charge"
            );
        }

        info!(
            %user_id,
            subscription_id = %subscription.id,
            "subscriptions: subscription registered"
        );
        Ok(())
    }

    /// Approves one charge against a billing key and records the attempt in
    /// the payments ledger when the subscription is resolvable. The order id
    /// is derived from (subscription, billing period), so a retried call for
    /// the same period carries the same id and the gateway can deduplicate.
    /// No retry happens here; retries are the caller's decision.
    pub async fn charge_subscription(
        &self,
        billing_key: &str,
        customer_key: &str,
        amount: i32,
        user_id: &str,
        subscription_id: Option<Uuid>,
    ) -> UseCaseResult<ChargeOutcome> {
        let resolved = match self.subscription_repo.find_by_billing_key(billing_key).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to resolve subscription by billing key"
                );
                None
            }
        };

        let subscription_id = subscription_id.or_else(|| resolved.as_ref().map(|sub| sub.id));
        let order_id = match (subscription_id, resolved.as_ref()) {
            (_, Some(subscription)) => {
                billing_order_id(subscription.id, subscription.next_billing_date)
            }
            (Some(id), None) => billing_order_id(id, Utc::now().date_naive()),
            (None, None) => format!(
                "ORDER_{}_{}",
                Utc::now().timestamp_millis(),
                &Uuid::new_v4().simple().to_string()[..8]
            ),
        };

        info!(%user_id, %order_id, amount, "subscriptions: charge requested");

        match self
            .billing
            .charge_billing_key(billing_key, customer_key, amount, &order_id, ORDER_NAME)
            .await
        {
            Ok(charge) => {
                info!(
                    %user_id,
                    %order_id,
                    payment_key = %charge.payment_key,
                    "subscriptions: charge approved"
                );
                if let Some(subscription_id) = subscription_id {
                    self.record_attempt(
                        user_id,
                        subscription_id,
                        Some(charge.payment_key.clone()),
                        &order_id,
                        amount,
                        PaymentStatus::Done,
                    )
                    .await;
                }
                Ok(ChargeOutcome {
                    payment_key: charge.payment_key,
                    order_id,
                })
            }
            Err(err) => {
                let err = map_gateway_error(err);
                warn!(
                    %user_id,
                    %order_id,
                    error = %err,
                    provider_code = ?err.provider_code(),
                    "subscriptions: charge failed"
                );
                if let (Some(subscription_id), Some(_)) = (subscription_id, err.provider_code()) {
                    self.record_attempt(
                        user_id,
                        subscription_id,
                        None,
                        &order_id,
                        amount,
                        PaymentStatus::Failed,
                    )
                    .await;
                }
                Err(err)
            }
        }
    }

    // Ledger writes are best-effort; a failure here never fails the charge.
    async fn record_attempt(
        &self,
        user_id: &str,
        subscription_id: Uuid,
        payment_key: Option<String>,
        order_id: &str,
        amount: i32,
        status: PaymentStatus,
    ) {
        let paid_at = (status == PaymentStatus::Done).then(Utc::now);
        if let Err(err) = self
            .payment_repo
            .record_payment(NewPaymentEntity {
                user_id: user_id.to_string(),
                subscription_id,
                payment_key,
                order_id: order_id.to_string(),
                amount,
                status: status.to_string(),
                paid_at,
            })
            .await
        {
            error!(
                %user_id,
                %subscription_id,
                %order_id,
                db_error = ?err,
                "subscriptions: failed to record payment attempt"
            );
        }
    }

    /// Schedules a cancellation. Benefits persist until the renewal date, at
    /// which point the sweep terminates the subscription.
    pub async fn cancel_subscription(&self, user_id: &str) -> UseCaseResult<()> {
        let subscription = self
            .subscription_repo
            .find_non_terminated_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load subscription for cancel");
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "subscriptions: no subscription to cancel");
                SubscriptionError::NotFound
            })?;

        if SubscriptionStatus::from_str(&subscription.status) != SubscriptionStatus::Active {
            warn!(
                %user_id,
                status = %subscription.status,
                "subscriptions: cancel rejected, subscription is not active"
            );
            return Err(SubscriptionError::InvalidState(
                "only an active subscription can be cancelled",
            ));
        }

        self.subscription_repo
            .mark_cancelled(subscription.id, user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to mark subscription cancelled"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(%user_id, subscription_id = %subscription.id, "subscriptions: cancellation scheduled");
        Ok(())
    }

    /// Undoes a scheduled cancellation; only valid while the subscription is
    /// still in the cancelled state (before the sweep terminates it).
    pub async fn resume_subscription(&self, user_id: &str) -> UseCaseResult<()> {
        let subscription = self
            .subscription_repo
            .find_non_terminated_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load subscription for resume");
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "subscriptions: no subscription to resume");
                SubscriptionError::NotFound
            })?;

        if SubscriptionStatus::from_str(&subscription.status) != SubscriptionStatus::Cancelled {
            warn!(
                %user_id,
                status = %subscription.status,
                "subscriptions: resume rejected, subscription is not cancelled"
            );
            return Err(SubscriptionError::InvalidState(
                "only a cancelled subscription can be resumed",
            ));
        }

        self.subscription_repo
            .mark_resumed(subscription.id, user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to mark subscription resumed"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(%user_id, subscription_id = %subscription.id, "subscriptions: subscription resumed");
        Ok(())
    }

    /// Subscription page payload: user entitlement plus card/renewal details
    /// while pro benefits are still in effect.
    pub async fn get_subscription_info(&self, user_id: &str) -> UseCaseResult<SubscriptionInfoDto> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load user");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::UserNotFound)?;

        let status = UserSubscriptionStatus::from_str(&user.subscription_status);
        let mut info = SubscriptionInfoDto {
            user_email: user.email,
            status,
            test_count: user.test_count,
            next_billing_date: None,
            card_number: None,
            card_company: None,
        };

        if status.has_pro_benefits() {
            let subscription = self
                .subscription_repo
                .find_non_terminated_by_user_id(user_id)
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "subscriptions: failed to load subscription info");
                    SubscriptionError::Internal(err)
                })?;
            if let Some(subscription) = subscription {
                info.next_billing_date = Some(subscription.next_billing_date);
                info.card_number = subscription.card_number;
                info.card_company = subscription.card_company;
            }
        }

        Ok(info)
    }
}
