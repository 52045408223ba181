pub mod credential_provider;
pub mod http_client;
pub mod payment_processor_client;
pub mod payment_service;

pub use credential_provider::OAuthCredentialProvider;
pub use payment_processor_client::PaymentProcessorClient;
pub use payment_service::{PaymentService, ServiceError};
