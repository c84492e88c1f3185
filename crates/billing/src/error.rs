//! Billing error types

use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Organization not found: {0}")]
    NotFound(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Serialization(err.to_string())
    }
}

impl From<glowdesk_shared::InvalidPlan> for BillingError {
    fn from(err: glowdesk_shared::InvalidPlan) -> Self {
        BillingError::InvalidPlan(err.0)
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
