pub mod app_data;
pub mod payments;
