pub mod payments;
pub mod saju_tests;
pub mod subscriptions;
pub mod users;
