use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::domain::{
    repositories::{
        payments::PaymentRepository, subscriptions::SubscriptionRepository, users::UserRepository,
    },
    value_objects::subscriptions::{
        BILLING_PERIOD_DAYS, RENEWAL_TEST_COUNT, SUBSCRIPTION_PRICE_KRW, SweepRowResult,
        SweepSummary,
    },
};

use super::subscriptions::{BillingGateway, SubscriptionUseCase};

/// Daily cron pass over due subscriptions: renew the active ones, terminate
/// the cancelled ones whose paid period has ended. Each row is processed
/// independently so one bad card never stalls the rest of the batch.
pub struct BillingSweepUseCase<U, S, P, B>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    subscription_usecase: Arc<SubscriptionUseCase<U, S, P, B>>,
    subscription_repo: Arc<S>,
    billing: Arc<B>,
}

impl<U, S, P, B> BillingSweepUseCase<U, S, P, B>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    pub fn new(
        subscription_usecase: Arc<SubscriptionUseCase<U, S, P, B>>,
        subscription_repo: Arc<S>,
        billing: Arc<B>,
    ) -> Self {
        Self {
            subscription_usecase,
            subscription_repo,
            billing,
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<SweepSummary> {
        info!(%today, "billing sweep: starting");

        let due = self.subscription_repo.list_due_for_renewal(today).await?;
        let mut results = Vec::with_capacity(due.len());

        for subscription in due {
            let outcome = self
                .subscription_usecase
                .charge_subscription(
                    &subscription.billing_key,
                    &subscription.customer_key,
                    SUBSCRIPTION_PRICE_KRW,
                    &subscription.user_id,
                    Some(subscription.id),
                )
                .await;

            match outcome {
                Ok(_) => {
                    let next_billing_date = today + Duration::days(BILLING_PERIOD_DAYS);
                    match self
                        .subscription_repo
                        .record_renewal(
                            subscription.id,
                            &subscription.user_id,
                            next_billing_date,
                            Utc::now(),
                            RENEWAL_TEST_COUNT,
                        )
                        .await
                    {
                        Ok(()) => {
                            info!(
                                subscription_id = %subscription.id,
                                user_id = %subscription.user_id,
                                %next_billing_date,
                                "billing sweep: renewal recorded"
                            );
                            results.push(SweepRowResult {
                                subscription_id: subscription.id,
                                success: true,
                                error: None,
                            });
                        }
                        Err(err) => {
                            // Charged but not recorded. Surface it loudly and
                            // report the row failed so it gets looked at.
                            error!(
                                subscription_id = %subscription.id,
                                user_id = %subscription.user_id,
                                db_error = ?err,
                                "billing sweep: charge approved but renewal update failed"
                            );
                            results.push(SweepRowResult {
                                subscription_id: subscription.id,
                                success: false,
                                error: Some(format!("renewal update failed: {err}")),
                            });
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        subscription_id = %subscription.id,
                        user_id = %subscription.user_id,
                        error = %err,
                        "billing sweep: renewal charge failed"
                    );
                    if let Err(db_err) = self
                        .subscription_repo
                        .mark_payment_failed(subscription.id, &subscription.user_id)
                        .await
                    {
                        error!(
                            subscription_id = %subscription.id,
                            user_id = %subscription.user_id,
                            db_error = ?db_err,
                            "billing sweep: failed to mark subscription payment_failed"
                        );
                    }
                    results.push(SweepRowResult {
                        subscription_id: subscription.id,
                        success: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let expired = self
            .subscription_repo
            .list_due_for_termination(today)
            .await?;
        let mut terminated = 0;

        for subscription in expired {
            if let Err(err) = self
                .billing
                .delete_billing_key(&subscription.billing_key, &subscription.customer_key)
                .await
            {
                warn!(
                    subscription_id = %subscription.id,
                    user_id = %subscription.user_id,
                    error = ?err,
                    "billing sweep: billing key revocation failed; terminating anyway"
                );
            }

            match self
                .subscription_repo
                .mark_terminated(subscription.id, &subscription.user_id, Utc::now())
                .await
            {
                Ok(()) => {
                    info!(
                        subscription_id = %subscription.id,
                        user_id = %subscription.user_id,
                        "billing sweep: cancelled subscription terminated"
                    );
                    terminated += 1;
                }
                Err(err) => {
                    error!(
                        subscription_id = %subscription.id,
                        user_id = %subscription.user_id,
                        db_error = ?err,
                        "billing sweep: failed to terminate subscription"
                    );
                }
            }
        }

        let summary = SweepSummary {
            processed: results.len(),
            results,
            terminated,
        };
        info!(
            processed = summary.processed,
            succeeded = summary.results.iter().filter(|row| row.success).count(),
            terminated = summary.terminated,
            "billing sweep: finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::subscriptions::SubscriptionEntity;
    use crate::domain::repositories::payments::MockPaymentRepository;
    use crate::domain::repositories::subscriptions::MockSubscriptionRepository;
    use crate::domain::repositories::users::MockUserRepository;
    use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;
    use crate::payments::toss_client::{BillingCharge, TossApiError};
    use crate::usecases::subscriptions::MockBillingGateway;
    use uuid::Uuid;

    fn due_subscription(status: SubscriptionStatus, due: NaiveDate) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: "user_2abc".to_string(),
            billing_key: "bill_key_1".to_string(),
            customer_key: "cust_key_1".to_string(),
            card_number: Some("1234".to_string()),
            card_company: Some("신한카드".to_string()),
            status: status.to_string(),
            next_billing_date: due,
            last_billing_date: None,
            billing_key_deleted_at: None,
            created_at: Utc::now(),
        }
    }

    fn charge() -> BillingCharge {
        BillingCharge {
            payment_key: "pay_key_1".to_string(),
            order_id: "ORDER_x".to_string(),
            total_amount: SUBSCRIPTION_PRICE_KRW as i64,
            status: "DONE".to_string(),
            approved_at: None,
        }
    }

    fn sweep(
        subscription_repo: MockSubscriptionRepository,
        payment_repo: MockPaymentRepository,
        billing: MockBillingGateway,
    ) -> BillingSweepUseCase<
        MockUserRepository,
        MockSubscriptionRepository,
        MockPaymentRepository,
        MockBillingGateway,
    > {
        let subscription_repo = Arc::new(subscription_repo);
        let billing = Arc::new(billing);
        let usecase = Arc::new(SubscriptionUseCase::new(
            Arc::new(MockUserRepository::new()),
            Arc::clone(&subscription_repo),
            Arc::new(payment_repo),
            Arc::clone(&billing),
        ));
        BillingSweepUseCase::new(usecase, subscription_repo, billing)
    }

    #[tokio::test]
    async fn renewal_extends_period_and_resets_test_count() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let due = due_subscription(SubscriptionStatus::Active, today);
        let due_id = due.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        let listed = due.clone();
        subscription_repo
            .expect_list_due_for_renewal()
            .withf(move |date| *date == today)
            .returning(move |_| Ok(vec![listed.clone()]));
        let resolved = due.clone();
        subscription_repo
            .expect_find_by_billing_key()
            .returning(move |_| Ok(Some(resolved.clone())));
        subscription_repo
            .expect_record_renewal()
            .withf(move |id, user_id, next, _, test_count| {
                *id == due_id
                    && user_id == "user_2abc"
                    && *next == NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
                    && *test_count == RENEWAL_TEST_COUNT
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        subscription_repo
            .expect_list_due_for_termination()
            .returning(|_| Ok(vec![]));

        let mut billing = MockBillingGateway::new();
        billing
            .expect_charge_billing_key()
            .returning(|_, _, _, _, _| Ok(charge()));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_payment()
            .returning(|_| Ok(Uuid::new_v4()));

        let summary = sweep(subscription_repo, payment_repo, billing)
            .run(today)
            .await
            .expect("sweep should run");
        assert_eq!(summary.processed, 1);
        assert!(summary.results[0].success);
        assert_eq!(summary.terminated, 0);
    }

    #[tokio::test]
    async fn failed_charge_marks_subscription_payment_failed() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let due = due_subscription(SubscriptionStatus::Active, today);
        let due_id = due.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        let listed = due.clone();
        subscription_repo
            .expect_list_due_for_renewal()
            .returning(move |_| Ok(vec![listed.clone()]));
        let resolved = due.clone();
        subscription_repo
            .expect_find_by_billing_key()
            .returning(move |_| Ok(Some(resolved.clone())));
        subscription_repo
            .expect_mark_payment_failed()
            .withf(move |id, user_id| *id == due_id && user_id == "user_2abc")
            .times(1)
            .returning(|_, _| Ok(()));
        subscription_repo
            .expect_list_due_for_termination()
            .returning(|_| Ok(vec![]));

        let mut billing = MockBillingGateway::new();
        billing.expect_charge_billing_key().returning(|_, _, _, _, _| {
            Err(anyhow::Error::new(TossApiError {
                code: "REJECT_CARD_PAYMENT".to_string(),
                message: "한도초과".to_string(),
                status: 400,
            }))
        });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_payment()
            .withf(|new| new.status == "failed")
            .returning(|_| Ok(Uuid::new_v4()));

        let summary = sweep(subscription_repo, payment_repo, billing)
            .run(today)
            .await
            .expect("sweep should run");
        assert_eq!(summary.processed, 1);
        assert!(!summary.results[0].success);
        assert!(summary.results[0].error.is_some());
    }

    #[tokio::test]
    async fn cancelled_subscription_past_period_is_terminated() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let expired = due_subscription(SubscriptionStatus::Cancelled, today);
        let expired_id = expired.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_list_due_for_renewal()
            .returning(|_| Ok(vec![]));
        let listed = expired.clone();
        subscription_repo
            .expect_list_due_for_termination()
            .returning(move |_| Ok(vec![listed.clone()]));
        subscription_repo
            .expect_mark_terminated()
            .withf(move |id, user_id, _| *id == expired_id && user_id == "user_2abc")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut billing = MockBillingGateway::new();
        billing
            .expect_delete_billing_key()
            .withf(|billing_key, customer_key| {
                billing_key == "bill_key_1" && customer_key == "cust_key_1"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let summary = sweep(subscription_repo, MockPaymentRepository::new(), billing)
            .run(today)
            .await
            .expect("sweep should run");
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.terminated, 1);
    }

    #[tokio::test]
    async fn termination_proceeds_when_key_revocation_fails() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let expired = due_subscription(SubscriptionStatus::Cancelled, today);

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_list_due_for_renewal()
            .returning(|_| Ok(vec![]));
        let listed = expired.clone();
        subscription_repo
            .expect_list_due_for_termination()
            .returning(move |_| Ok(vec![listed.clone()]));
        subscription_repo
            .expect_mark_terminated()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut billing = MockBillingGateway::new();
        billing
            .expect_delete_billing_key()
            .returning(|_, _| Err(anyhow::anyhow!("provider unavailable")));

        let summary = sweep(subscription_repo, MockPaymentRepository::new(), billing)
            .run(today)
            .await
            .expect("sweep should run");
        assert_eq!(summary.terminated, 1);
    }

    #[tokio::test]
    async fn one_bad_row_does_not_stop_the_batch() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let bad = due_subscription(SubscriptionStatus::Active, today);
        let mut good = due_subscription(SubscriptionStatus::Active, today);
        good.billing_key = "bill_key_2".to_string();
        good.user_id = "user_2def".to_string();

        let mut subscription_repo = MockSubscriptionRepository::new();
        let listed = vec![bad.clone(), good.clone()];
        subscription_repo
            .expect_list_due_for_renewal()
            .returning(move |_| Ok(listed.clone()));
        let bad_resolved = bad.clone();
        let good_resolved = good.clone();
        subscription_repo
            .expect_find_by_billing_key()
            .returning(move |billing_key| {
                if billing_key == "bill_key_1" {
                    Ok(Some(bad_resolved.clone()))
                } else {
                    Ok(Some(good_resolved.clone()))
                }
            });
        subscription_repo
            .expect_mark_payment_failed()
            .times(1)
            .returning(|_, _| Ok(()));
        subscription_repo
            .expect_record_renewal()
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        subscription_repo
            .expect_list_due_for_termination()
            .returning(|_| Ok(vec![]));

        let mut billing = MockBillingGateway::new();
        billing
            .expect_charge_billing_key()
            .returning(|billing_key, _, _, _, _| {
                if billing_key == "bill_key_1" {
                    Err(anyhow::anyhow!("network error"))
                } else {
                    Ok(charge())
                }
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_payment()
            .returning(|_| Ok(Uuid::new_v4()));

        let summary = sweep(subscription_repo, payment_repo, billing)
            .run(today)
            .await
            .expect("sweep should run");
        assert_eq!(summary.processed, 2);
        assert_eq!(
            summary.results.iter().filter(|row| row.success).count(),
            1
        );
    }

    #[tokio::test]
    async fn second_run_on_same_day_finds_nothing_due() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_list_due_for_renewal()
            .returning(|_| Ok(vec![]));
        subscription_repo
            .expect_list_due_for_termination()
            .returning(|_| Ok(vec![]));

        let summary = sweep(
            subscription_repo,
            MockPaymentRepository::new(),
            MockBillingGateway::new(),
        )
        .run(today)
        .await
        .expect("sweep should run");
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.terminated, 0);
    }
}
