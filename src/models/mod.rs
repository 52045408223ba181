pub mod payment;
pub mod response;
pub mod transaction;
