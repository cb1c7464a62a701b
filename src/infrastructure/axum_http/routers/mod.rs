pub mod clerk_webhook;
pub mod saju_tests;
pub mod subscriptions;
