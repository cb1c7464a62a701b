pub mod billing_sweep;
pub mod clerk_webhook;
pub mod subscriptions;
