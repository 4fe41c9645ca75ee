//! Orders, license issuance and activation for Empire Run.
//!
//! This module handles:
//! - Order intake, listing and cancellation ([`OrderBook`])
//! - Approval of pending orders: key generation, persistence and delivery
//!   by email, compensated in full if the mail fails ([`LicenseIssuer`])
//! - One-time key activation ([`Activator`])
//!
//! # Design Principles
//!
//! - **Paid means delivered**: an order only becomes `paid` once its key has
//!   been accepted by the mail provider
//! - **Keys are unique forever**: a key is never reused for another order
//! - **Activate once**: concurrent activations of one key yield one success
//!
//! # License Key Format
//!
//! Ten characters from `ABCDEFGHJKLMNPQRSTUVWXYZ23456789`, see [`keygen`].

mod activation;
mod error;
mod issuance;
pub mod keygen;
mod order;

pub use activation::{ActivationReason, ActivationResult, Activator};
pub use error::{LicenseError, LicenseResult};
pub use issuance::{ApproveOutcome, LicenseIssuer, DEFAULT_MAIL_TIMEOUT, MAX_KEY_ATTEMPTS};
pub use keygen::{KeyGenerator, RandomKeyGenerator};
pub use order::{
    KeyStatus, LicenseKeyRecord, Order, OrderBook, OrderStatus, DEFAULT_LIST_LIMIT,
    MAX_LIST_LIMIT,
};
