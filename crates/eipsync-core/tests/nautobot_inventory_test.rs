// Integration tests for `NautobotInventory` and the target adapter on top
// of it, using wiremock.
#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use eipsync_core::{
    Address, AddressChanges, EntityRepository, ExternalId, InventoryStore, NautobotConfig,
    NautobotInventory, Outcome, PrefixKey, Status, StoreError, SyncScope, TargetAdapter,
    TlsVerification,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NautobotInventory) {
    let server = MockServer::start().await;
    let inventory = NautobotInventory::new(&NautobotConfig {
        url: server.uri(),
        token: SecretString::from("t0ken".to_owned()),
        namespace: "Global".into(),
        tls: TlsVerification::SystemDefaults,
        page_size: 100,
    })
    .unwrap();
    (server, inventory)
}

fn page(results: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "count": results.as_array().map_or(0, Vec::len),
        "next": null,
        "previous": null,
        "results": results
    }))
}

// ── Loads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_domain_load_uses_substring_filter_in_namespace() {
    let (server, inventory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/ip-addresses/"))
        .and(query_param("namespace", "Global"))
        .and(query_param("dns_name__ic", "example.net"))
        .respond_with(page(json!([
            {
                "id": "a1",
                "address": "10.0.0.1/24",
                "dns_name": "a.example.net",
                "status": { "name": "Active" },
                "custom_fields": { "solidserver_addr_id": 11 }
            },
            { "id": "bad", "address": "garbage" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let scope = SyncScope::parse(None, Some("example.net"), true, false).unwrap();
    let addresses = inventory.list_addresses(&scope).await.unwrap();

    assert_eq!(addresses.len(), 1);
    let addr = &addresses[0];
    assert_eq!(addr.prefix_length, Some(24));
    assert_eq!(addr.status, Some(Status::Active));
    assert_eq!(addr.external_id, ExternalId::Linked("11".into()));
}

#[tokio::test]
async fn test_cidr_load_uses_native_containment() {
    let (server, inventory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/prefixes/"))
        .and(query_param("within_include", "10.0.0.0/16"))
        .respond_with(page(json!([
            { "id": "p1", "prefix": "10.0.1.0/24", "description": "lab" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let scope = SyncScope::parse(Some("10.0.0.0/16"), None, false, true).unwrap();
    let prefixes = inventory.list_prefixes(&scope).await.unwrap();
    assert_eq!(prefixes[0].key.to_string(), "10.0.1.0/24");
    assert_eq!(prefixes[0].external_id, ExternalId::Unlinked);
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_posts_import_status_and_linkage() {
    let (server, inventory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/ip-addresses/"))
        .and(query_param("address", "10.0.0.5"))
        .respond_with(page(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ipam/ip-addresses/"))
        .and(body_json(json!({
            "address": "10.0.0.5/24",
            "dns_name": "e.example.net",
            "description": "",
            "status": { "name": "Imported From Solidserver" },
            "namespace": { "name": "Global" },
            "custom_fields": { "solidserver_addr_id": "15" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "new1",
            "address": "10.0.0.5/24",
            "dns_name": "e.example.net"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = TargetAdapter::new(&inventory);
    let source = Address {
        dns_name: "e.example.net".into(),
        external_id: ExternalId::Linked("15".into()),
        prefix_length: Some(24),
        ..Address::new("10.0.0.5".parse().unwrap())
    };
    let outcome = EntityRepository::<Address>::create(&adapter, &source).await;
    assert!(outcome.is_applied());
}

#[tokio::test]
async fn test_cleared_name_patches_status_and_sentinel() {
    let (server, inventory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/ip-addresses/"))
        .and(query_param("address", "10.0.0.1"))
        .respond_with(page(json!([
            { "id": "a1", "address": "10.0.0.1/24", "dns_name": "a.example.net" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/ipam/ip-addresses/a1/"))
        .and(body_json(json!({
            "dns_name": "",
            "status": { "name": "NO-IPAM-RECORD" },
            "custom_fields": { "solidserver_addr_id": "-1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "address": "10.0.0.1/24",
            "dns_name": "",
            "status": { "name": "NO-IPAM-RECORD" },
            "custom_fields": { "solidserver_addr_id": "-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = TargetAdapter::new(&inventory);
    let changes = AddressChanges {
        dns_name: Some(String::new()),
        ..AddressChanges::default()
    };
    let outcome =
        EntityRepository::<Address>::update(&adapter, &"10.0.0.1".parse().unwrap(), &changes)
            .await;
    match outcome {
        Outcome::Applied(updated) => {
            assert_eq!(updated.status, Some(Status::NoIpamRecord));
            assert_eq!(updated.external_id, ExternalId::Unlinked);
        }
        other => panic!("expected Applied, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_request_is_a_validation_error() {
    let (server, inventory) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/ipam/prefixes/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"status": ["Object not found"]}"#),
        )
        .mount(&server)
        .await;

    let prefix = eipsync_core::Prefix {
        status: Some(Status::ImportedFromSolidserver),
        ..eipsync_core::Prefix::new("10.2.0.0/16".parse().unwrap())
    };
    match inventory.insert_prefix(&prefix).await.unwrap_err() {
        StoreError::Validation { message } => assert!(message.contains("Object not found")),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_of_absent_prefix_is_not_found() {
    let (server, inventory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/prefixes/"))
        .and(query_param("prefix", "10.3.0.0/16"))
        .respond_with(page(json!([])))
        .mount(&server)
        .await;

    let key: PrefixKey = "10.3.0.0/16".parse().unwrap();
    let err = inventory.delete_prefix(key).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}
