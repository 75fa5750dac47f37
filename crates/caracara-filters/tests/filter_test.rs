//! Caracara Filters Tests
//!
//! Tests for building FQL strings through the public API.

use caracara_filters::{
    Dialect, FalconFilter, FilterAttribute, FilterError, FilterValue, Fql, Operator, PLATFORMS,
    catalogue::{HOST_LAST_SEEN, HOST_OS},
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============== Host Filter Tests ==============

#[test]
fn test_windows_domain_controllers() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    filter
        .create_new_filter("OS", Some("Windows".into()), None)
        .unwrap();
    filter
        .create_new_filter("Role", Some("DC".into()), None)
        .unwrap();

    assert_eq!(
        filter.get_fql(),
        "platform_name: 'Windows'+product_type_desc: 'Domain Controller'"
    );
}

#[test]
fn test_containment_status_mapping() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    filter
        .create_new_filter_from_kv_string("Contained", "Contained,Containment Pending")
        .unwrap();

    assert_eq!(
        filter.get_fql(),
        "status: ['contained','containment_pending']"
    );
}

#[test]
fn test_invalid_platform_rejected() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    let err = filter
        .create_new_filter("OS", Some("BeOS".into()), None)
        .unwrap_err();

    assert!(matches!(err, FilterError::InvalidValue { .. }));
    assert!(filter.is_empty());
}

#[test]
fn test_date_range() {
    let now = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

    let mut after = FilterAttribute::new(&HOST_LAST_SEEN);
    after.set_value("-30d").unwrap();

    let mut before = FilterAttribute::new(&HOST_LAST_SEEN);
    before.set_value("2024-01-30T00:00:00Z").unwrap();
    before.set_operator(Operator::Less).unwrap();

    assert_eq!(after.fql_at(now), "last_seen: >='2024-01-01T00:00:00Z'");
    assert_eq!(before.fql_at(now), "last_seen: <'2024-01-30T00:00:00Z'");

    let filter = FalconFilter::with_filters(Dialect::Hosts, [after, before]);
    assert_eq!(filter.len(), 2);
}

#[test]
fn test_stale_sensor_filter() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    let id = filter
        .create_new_filter_from_kv_string("LastSeen__LTE", "-7d")
        .unwrap();

    let attr = filter.get(&id).unwrap();
    assert_eq!(attr.operator(), Operator::LessOrEqual);
    assert!(attr.fql().starts_with("last_seen: <='"));
}

#[test]
fn test_not_operator_on_list() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    filter
        .create_new_filter_from_kv_string("Hostname__NOT", "web-01,web-02")
        .unwrap();

    assert_eq!(filter.get_fql(), "hostname: !['web-01','web-02']");
}

#[test]
fn test_timestamp_operator_rejected_on_string_field() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    let err = filter
        .create_new_filter_from_kv_string("Hostname__GTE", "web-01")
        .unwrap_err();

    assert!(matches!(err, FilterError::InvalidOperator { .. }));
}

// ============== Dialect Tests ==============

#[test]
fn test_users_dialect() {
    let mut filter = FalconFilter::new(Dialect::Users);
    filter
        .create_new_filter("FirstName", Some("Alice".into()), None)
        .unwrap();

    assert_eq!(filter.get_fql(), "first_name: 'Alice'");
    assert!(filter.create_new_filter("OS", None, None).is_err());
}

#[test]
fn test_rtr_dialect_command_restriction() {
    let mut filter = FalconFilter::new(Dialect::Rtr);
    filter
        .create_new_filter("Command", Some("ls".into()), None)
        .unwrap();
    assert_eq!(filter.get_fql(), "base_command: 'ls'");

    assert!(
        filter
            .create_new_filter("Command", Some("format".into()), None)
            .is_err()
    );
    assert!(
        filter
            .create_new_filter("Command", Some(vec!["ls", "cd"].into()), None)
            .is_err()
    );
}

#[test]
fn test_available_filters() {
    let filter = FalconFilter::new(Dialect::Generic);
    let names: Vec<&str> = filter.available_filters().iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Name"]);

    let hosts = FalconFilter::new(Dialect::Hosts);
    assert!(hosts.available_filters().iter().any(|a| a.name == "Hostname"));
}

// ============== Fql Argument Tests ==============

#[test]
fn test_fql_from_filter() {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    filter
        .create_new_filter("Hostname", Some("dc01".into()), None)
        .unwrap();

    assert_eq!(Fql::from(&filter).as_deref(), Some("hostname: 'dc01'"));
    assert_eq!(Fql::from(filter.clone()).to_string(), filter.get_fql());
}

#[test]
fn test_fql_empty_filter_is_none() {
    let filter = FalconFilter::new(Dialect::Hosts);
    assert!(Fql::from(&filter).is_none());
}

// ============== Property Tests ==============

proptest! {
    #[test]
    fn prop_delimited_values_round_trip(parts in prop::collection::vec("[a-z0-9-]{1,12}", 2..8)) {
        let joined = parts.join(",");
        prop_assert_eq!(FilterValue::from_delimited(&joined), FilterValue::Many(parts));
    }

    #[test]
    fn prop_free_list_renders_every_value(parts in prop::collection::vec("[a-z0-9-]{1,12}", 1..8)) {
        let mut filter = FalconFilter::new(Dialect::Hosts);
        filter
            .create_new_filter("Hostname", Some(parts.clone().into()), None)
            .unwrap();

        let quoted: Vec<String> = parts.iter().map(|p| format!("'{p}'")).collect();
        prop_assert_eq!(filter.get_fql(), format!("hostname: [{}]", quoted.join(",")));
    }

    #[test]
    fn prop_platform_options(index in 0..PLATFORMS.len()) {
        let mut attr = HOST_OS.instantiate();
        prop_assert!(attr.set_value(PLATFORMS[index]).is_ok());
        prop_assert!(attr.set_value(PLATFORMS[index].to_uppercase()).is_err());
    }

    #[test]
    fn prop_relative_timestamps_accepted(amount in 1u32..10_000, unit in "[smhd]", sign in "[-+]") {
        let mut attr = HOST_LAST_SEEN.instantiate();
        let value = format!("{sign}{amount}{unit}");
        prop_assert!(attr.set_value(value).is_ok());
    }

    #[test]
    fn prop_filters_join_in_insertion_order(count in 1usize..6) {
        let mut filter = FalconFilter::new(Dialect::Hosts);
        for i in 0..count {
            filter
                .create_new_filter("Hostname", Some(format!("host-{i}").into()), None)
                .unwrap();
        }

        let expected: Vec<String> = (0..count).map(|i| format!("hostname: 'host-{i}'")).collect();
        prop_assert_eq!(filter.get_fql(), expected.join("+"));
    }
}
