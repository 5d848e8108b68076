//! 解析器编排：批量加载、直写、连接串与子键枚举。

use std::{sync::Arc, thread};

use spark_tenant_config::{
    ClientOptions, OrganizationalUnit, RemoteOperation, Setting, TenantConfigError,
    TenantConfigurationProvider, test_stubs::InMemoryConfigurationService,
};

const GROUP: &str = "billing";

fn provider_at(home: &str) -> (Arc<InMemoryConfigurationService>, TenantConfigurationProvider) {
    let service = Arc::new(InMemoryConfigurationService::new());
    let provider = TenantConfigurationProvider::new(
        ClientOptions::new(OrganizationalUnit::new(home), GROUP),
        service.clone(),
        service.clone(),
    )
    .expect("valid options");
    (service, provider)
}

#[test]
fn load_is_idempotent() {
    let (service, provider) = provider_at("acme");
    service.add_to_group(GROUP, "Timeout");
    service.define_value("acme", "Timeout", "30");

    provider.load().expect("first load");
    provider.load().expect("second load");
    provider.try_get("Timeout").expect("lookup");

    assert_eq!(service.load_group_calls(), 1);
    assert!(provider.cache().is_initial_load_complete());
}

#[test]
fn failed_load_is_retried_on_next_read() {
    let (service, provider) = provider_at("");
    service.fail_next(RemoteOperation::LoadGroup);

    let error = provider.try_get("Timeout").expect_err("load fails");
    assert!(matches!(error, TenantConfigError::Remote(ref remote) if remote.operation() == RemoteOperation::LoadGroup));
    assert!(!provider.cache().is_initial_load_complete());
    assert!(provider.snapshot().is_empty());

    provider.try_get("Timeout").expect("second attempt");
    assert_eq!(service.load_group_calls(), 2);
}

#[test]
fn bulk_loaded_values_skip_fetch() {
    let (service, provider) = provider_at("");
    service.add_to_group(GROUP, "Timeout");
    service.define_value("", "Timeout", "30");

    let lookup = provider.try_get("Timeout").expect("lookup");
    assert!(lookup.found);
    assert_eq!(lookup.value.as_deref(), Some("30"));
    assert_eq!(service.fetch_one_calls(), 0);
}

#[test]
fn set_value_round_trips_without_remote_read() {
    let (service, provider) = provider_at("");
    provider.load().expect("load");
    let token = provider.reload_token();
    let reads = service.read_calls();

    provider.set_value("Timeout", "45").expect("write");
    let lookup = provider.try_get("Timeout").expect("lookup");

    assert_eq!(lookup.value.as_deref(), Some("45"));
    assert_eq!(service.read_calls(), reads);
    assert_eq!(service.write_calls(), 1);
    assert!(token.has_changed());
    assert!(!provider.reload_token().has_changed());
}

#[test]
fn set_value_below_root_is_served_from_cache() {
    let (service, provider) = provider_at("acme.eu");
    service.define_value("", "Timeout", "10");
    provider.load().expect("load");

    provider.set_value("Timeout", "45").expect("write");
    assert_eq!(service.fetched_nodes(), ["|Timeout", "acme|Timeout"]);
    let reads = service.read_calls();

    let lookup = provider.try_get("Timeout").expect("lookup");
    assert_eq!(lookup.value.as_deref(), Some("45"));
    assert_eq!(service.read_calls(), reads);
}

#[test]
fn set_value_keeps_locked_ancestor_in_force() {
    let (service, provider) = provider_at("acme.eu");
    service.define_locked("acme", "Timeout", "99");
    provider.load().expect("load");

    provider.set_value("Timeout", "45").expect("write");
    let reads = service.read_calls();

    assert_eq!(
        provider.try_get("Timeout").expect("lookup").value.as_deref(),
        Some("99")
    );
    assert_eq!(service.read_calls(), reads);
}

#[test]
fn failed_warm_up_does_not_fail_the_write() {
    let (service, provider) = provider_at("acme.eu");
    service.define_value("", "Timeout", "10");
    provider.load().expect("load");
    let token = provider.reload_token();

    service.fail_next(RemoteOperation::FetchOne);
    provider.set_value("Timeout", "45").expect("write still applied");

    assert!(token.has_changed());
    assert_eq!(service.defined("acme.eu", "Timeout").expect("written").value, "45");
    assert_eq!(
        provider.try_get("Timeout").expect("lookup").value.as_deref(),
        Some("45")
    );
}

#[test]
fn rejected_write_leaves_cache_unchanged() {
    let (service, provider) = provider_at("");
    service.add_to_group(GROUP, "Timeout");
    service.define_value("", "Timeout", "30");
    provider.load().expect("load");
    let before = provider.snapshot();
    let token = provider.reload_token();

    service.fail_next(RemoteOperation::Write);
    let error = provider.set_value("Timeout", "45").expect_err("write rejected");

    assert!(matches!(error, TenantConfigError::WriteRejected { ref key, .. } if key.canonical() == "|Timeout"));
    assert_eq!(provider.snapshot(), before);
    assert!(!token.has_changed());
    assert_eq!(
        provider.try_get("Timeout").expect("lookup").value.as_deref(),
        Some("30")
    );
}

#[test]
fn set_value_honours_explicit_unit() {
    let (service, provider) = provider_at("acme.eu");

    provider.set_value("acme|Timeout", "15").expect("write");

    let stored = service.defined("acme", "Timeout").expect("written at acme");
    assert_eq!(stored.value, "15");
    assert_eq!(stored.value_type, "string");
    assert!(!stored.locked);
    let cached = provider.snapshot();
    assert!(matches!(cached.get("acme|Timeout"), Some(Setting::Value(v)) if v.value == "15"));
}

#[test]
fn blank_keys_are_rejected() {
    let (_, provider) = provider_at("");
    assert!(matches!(provider.try_get(" "), Err(TenantConfigError::EmptyKey)));
    assert!(matches!(provider.set_value("", "x"), Err(TenantConfigError::EmptyKey)));
}

#[test]
fn child_keys_flatten_structured_value() {
    let (service, provider) = provider_at("");
    service.define_value(
        "",
        "parentPath",
        r#"{"One":1,"Two":"2","Three":{"ThreeHasChildren":true}}"#,
    );

    let keys = provider
        .child_keys(Vec::new(), Some("parentPath"))
        .expect("child keys");
    assert_eq!(
        keys,
        [
            "parentPath:One",
            "parentPath:Three",
            "parentPath:Three:ThreeHasChildren",
            "parentPath:Two",
        ]
    );

    let merged = provider
        .child_keys(vec!["aardvark".to_owned()], Some("parentPath"))
        .expect("child keys");
    assert_eq!(merged.first().map(String::as_str), Some("aardvark"));
    assert_eq!(merged.len(), 5);
}

#[test]
fn child_keys_without_parent_list_cache() {
    let (service, provider) = provider_at("");
    service.define_value("", "Timeout", "30");
    provider.try_get("Timeout").expect("lookup");

    let keys = provider.child_keys(Vec::new(), None).expect("child keys");
    assert!(keys.contains(&"|Timeout".to_owned()));
    assert!(keys.contains(&"|ConnectionStrings".to_owned()));
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn connection_strings_are_aggregated() {
    let (service, provider) = provider_at("");
    service.add_to_group(GROUP, "Orders");
    service.add_to_group(GROUP, "TenancyDatabaseConnection");
    service.define_connection_string("", "Orders", "Server=orders");
    service.define_connection_string("", "TenancyDatabaseConnection", "Server=tenancy");
    service.define_connection_string("", "Audit", "Server=audit");

    assert_eq!(
        provider.get_connection_string("Orders").expect("lookup").as_deref(),
        Some("Server=orders")
    );
    assert_eq!(
        provider.tenancy_connection_string().expect("lookup").as_deref(),
        Some("Server=tenancy")
    );
    assert_eq!(provider.get_connection_string("Audit").expect("lookup"), None);

    // 树遍历中发现的连接串同步进入聚合视图。
    provider.try_get("Audit").expect("lookup");
    assert_eq!(
        provider.get_connection_string("Audit").expect("lookup").as_deref(),
        Some("Server=audit")
    );

    let aggregate = provider.try_get("ConnectionStrings").expect("lookup");
    assert_eq!(
        aggregate.value.as_deref(),
        Some(r#"{"Audit":"Server=audit","Orders":"Server=orders","TenancyDatabaseConnection":"Server=tenancy"}"#)
    );
}

#[test]
fn explicit_unit_connection_strings_read_that_units_aggregate() {
    let (service, provider) = provider_at("acme.eu");
    service.define_connection_string("acme", "Orders", "Server=acme");
    provider.load().expect("load");
    let reads = service.read_calls();

    let empty = provider.try_get("acme|ConnectionStrings").expect("lookup");
    assert!(empty.found);
    assert_eq!(empty.value.as_deref(), Some("{}"));
    assert_eq!(service.read_calls(), reads);
    assert!(service.fetched_nodes().is_empty());

    provider.try_get("acme|Orders").expect("lookup");
    assert_eq!(
        provider
            .try_get("acme|ConnectionStrings:Orders")
            .expect("lookup")
            .value
            .as_deref(),
        Some("Server=acme")
    );
    assert!(
        service
            .fetched_nodes()
            .iter()
            .all(|node| !node.ends_with("ConnectionStrings"))
    );
    assert_eq!(provider.get_connection_string("Orders").expect("lookup"), None);
}

#[test]
fn queried_keys_become_managed() {
    let (_, provider) = provider_at("acme");
    assert!(!provider.has_managed_key("Timeout").expect("parse"));

    provider.try_get("Timeout").expect("lookup");

    assert!(provider.has_managed_key("timeout").expect("parse"));
    assert!(provider.has_managed_key("|Timeout").expect("parse"));
    assert!(!provider.has_managed_key("other|Timeout").expect("parse"));
}

#[test]
fn concurrent_lookups_fetch_each_node_once() {
    let (service, provider) = provider_at("");
    for index in 0..8 {
        service.define_value("", &format!("Key{index}"), &index.to_string());
    }

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for index in 0..8 {
                    let lookup = provider.try_get(&format!("Key{index}")).expect("lookup");
                    assert_eq!(lookup.value, Some(index.to_string()));
                }
            });
        }
    });

    assert_eq!(service.fetch_one_calls(), 8);
    assert_eq!(service.load_group_calls(), 1);
}
