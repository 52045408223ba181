pub mod expiry;
pub mod money;
