pub mod enums;
pub mod saju;
pub mod subscriptions;
