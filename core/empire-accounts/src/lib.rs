//! Player accounts: gameplay reports and moderation.
//!
//! An account is an `(email, username)` pair ([`AccountRef`]). Rows are
//! created lazily by the first gameplay event:
//! - [`ReportAggregator`] keeps win/loss/achievement counters and records
//!   every device an account reports from
//! - [`ModerationService`] warns accounts through the devices they used and
//!   bans devices
//!
//! Bans are device-scoped and warnings account-scoped. Warning a device
//! flags every account ever seen on it; banning a device blocks that device
//! only.

mod error;
mod moderation;
mod reports;

pub use empire_types::AccountRef;
pub use error::{AccountError, AccountResult};
pub use moderation::{DeviceRecord, DeviceStatus, ModerationService};
pub use reports::{AccountReport, Achievement, ReportAggregator, ReportEvent};
