//! Property-based tests for account identity normalization.

use empire_types::{normalize_email, AccountRef};
use proptest::prelude::*;

fn email_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ \\t]{0,3}[A-Za-z0-9._]{1,12}@[A-Za-z0-9]{1,8}\\.[A-Za-z]{2,4}[ \\t]{0,3}")
        .unwrap()
}

proptest! {
    #[test]
    fn normalize_email_is_idempotent(email in email_strategy()) {
        let once = normalize_email(&email);
        prop_assert_eq!(normalize_email(&once), once);
    }

    #[test]
    fn normalized_email_has_no_case_or_padding(email in email_strategy()) {
        let n = normalize_email(&email);
        prop_assert_eq!(n.trim(), n.as_str());
        prop_assert_eq!(n.to_lowercase(), n.clone());
    }

    #[test]
    fn accounts_differing_only_in_email_case_are_equal(
        email in email_strategy(),
        username in "[a-z]{1,10}",
    ) {
        let a = AccountRef::new(&email, &username).unwrap();
        let b = AccountRef::new(&email.to_uppercase(), &username).unwrap();
        prop_assert_eq!(a, b);
    }
}
