use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment settles exactly once: `Pending` to `Success` or `Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    Wallet,
    #[default]
    Mock,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "success" => Some(PaymentStatus::Success),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Mock => "mock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            "wallet" => Some(PaymentMethod::Wallet),
            "mock" => Some(PaymentMethod::Mock),
            _ => None,
        }
    }
}

/// Result of settling a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Success,
    Failed,
}

impl Payment {
    /// Decides whether a settlement should be written. `Ok(false)` means
    /// the payment already holds that outcome and nothing changes.
    pub fn check_settlement(&self, outcome: Settlement) -> Result<bool> {
        match (self.status, outcome) {
            (PaymentStatus::Pending, _) => Ok(true),
            (PaymentStatus::Success, Settlement::Success) => Ok(false),
            (PaymentStatus::Failed, Settlement::Failed) => Ok(false),
            (current, _) => Err(AppError::Conflict(format!(
                "Payment already settled as {}",
                current.as_str()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: String,
}

/// Generates a transaction id such as `PAY-4F1C9A2B7D3E8C10`.
pub fn generate_transaction_id(prefix: &str) -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}-{}", prefix, hex::encode_upper(bytes))
}
