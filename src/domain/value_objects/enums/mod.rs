pub mod genders;
pub mod model_tiers;
pub mod payment_statuses;
pub mod subscription_statuses;
pub mod user_statuses;
