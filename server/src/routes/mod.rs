pub mod admin;
pub mod public;

use empire_types::{AccountRef, FieldResult};
use serde::Deserialize;

/// Body naming one account.
#[derive(Debug, Deserialize)]
pub struct AccountBody {
    pub(crate) email: Option<String>,
    pub(crate) username: Option<String>,
}

/// Builds an account from optional request fields.
pub(crate) fn account_ref(email: Option<&str>, username: Option<&str>) -> FieldResult<AccountRef> {
    AccountRef::new(email.unwrap_or_default(), username.unwrap_or_default())
}
