//! Property-based tests for changes and change sets
//!
//! These verify the invariants that should hold for any dates and payloads:
//! selection is monotonic in the requested version, and the reversible
//! changes undo exactly what they do.

use datever_core::{Change, ChangeSet, Field, Payload, VersionIdentifier};
use proptest::prelude::*;
use serde_json::Value;

// Strategy functions for property testing

/// Strategy for generating version identifiers between 2000 and 2040
fn version_strategy() -> impl Strategy<Value = VersionIdentifier> {
    (2000i32..2040, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| VersionIdentifier::from_ymd(y, m, d).unwrap())
}

/// Strategy for generating scalar JSON values
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,20}".prop_map(Value::String),
    ]
}

/// Strategy for generating payloads with lowercase keys
fn payload_strategy() -> impl Strategy<Value = Payload> {
    proptest::collection::vec(("[a-z]{1,8}", scalar_strategy()), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Strategy for generating change sets with distinct dates
fn change_set_strategy() -> impl Strategy<Value = ChangeSet> {
    proptest::collection::btree_set(version_strategy(), 0..10).prop_map(|versions| {
        let mut set = ChangeSet::new();
        for version in versions {
            set.insert(version, vec![Change::NoOp]).unwrap();
        }
        set
    })
}

proptest! {
    #[test]
    fn prop_older_requests_see_more_changes(
        set in change_set_strategy(),
        a in version_strategy(),
        b in version_strategy(),
    ) {
        let (older, newer) = if a <= b { (a, b) } else { (b, a) };
        let older_active = set.active_changes(Some(older));
        let newer_active = set.active_changes(Some(newer));

        prop_assert!(older_active.len() >= newer_active.len());
        for version in newer_active.versions() {
            prop_assert!(older_active.contains(version));
        }
        for version in older_active.versions() {
            prop_assert!(version > older);
        }
    }

    #[test]
    fn prop_downgrade_order_is_newest_first(
        set in change_set_strategy(),
        current in version_strategy(),
    ) {
        let active = set.active_changes(Some(current));
        let down: Vec<_> = active.downgrade_order().map(|(v, _)| v).collect();
        let mut up: Vec<_> = active.upgrade_order().map(|(v, _)| v).collect();
        prop_assert!(down.windows(2).all(|w| w[0] > w[1]));
        up.reverse();
        prop_assert_eq!(down, up);
    }

    #[test]
    fn prop_rename_round_trip(
        payload in payload_strategy(),
        value in scalar_strategy(),
    ) {
        let mut payload = payload;
        payload.shift_remove("zzzold");
        payload.insert("zzznew".to_string(), value);

        let change = Change::rename_field("zzzold", "zzznew");
        let (_, older) = change.unapply(None, Some(payload.clone())).unwrap();
        let older = older.unwrap();
        prop_assert!(!older.contains_key("zzznew"));
        prop_assert_eq!(change.apply(older).unwrap(), payload);
    }

    #[test]
    fn prop_add_field_round_trip(payload in payload_strategy(), default in scalar_strategy()) {
        let mut payload = payload;
        payload.shift_remove("zzzadded");

        let change = Change::add_field("zzzadded", Field::char()).with_default(default.clone());
        let newer = change.apply(payload.clone()).unwrap();
        prop_assert_eq!(&newer["zzzadded"], &default);

        let (_, older) = change.unapply(None, Some(newer)).unwrap();
        prop_assert_eq!(older.unwrap(), payload);
    }

    #[test]
    fn prop_change_field_type_round_trip(payload in payload_strategy(), height in any::<i32>()) {
        let mut payload = payload;
        payload.insert("height".to_string(), Value::from(height));

        let change = Change::change_field_type("height", Field::char(), Field::integer());
        let (_, older) = change.unapply(None, Some(payload.clone())).unwrap();
        let older = older.unwrap();
        prop_assert_eq!(&older["height"], &Value::String(height.to_string()));
        prop_assert_eq!(change.apply(older).unwrap(), payload);
    }
}
