//! Integration tests against a mocked Falcon API
//!
//! Each test starts a wiremock server, points the client at it with a base
//! URL override and mounts the endpoints the operation is expected to call.

use caracara_client::{
    CaracaraError, Client, ClientConfig, PolicyStyle, SortOrder, Target,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 1799,
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> Client {
    Client::new(
        ClientConfig::new("client-id", "client-secret")
            .with_base_url(&server.uri())
            .with_max_retries(2),
    )
    .unwrap()
}

fn ok(resources: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "meta": {"query_time": 0.01},
        "resources": resources,
        "errors": []
    }))
}

fn paged(resources: Value, offset: u64, total: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "meta": {"pagination": {"offset": offset, "limit": 100, "total": total}},
        "resources": resources,
        "errors": []
    }))
}

// ============== Authentication ==============

#[tokio::test]
async fn test_token_cached_between_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 1799
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors/queries/installers/ccid/v1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ok(json!(["0123456789ABCDEF0123456789ABCDEF-A1"])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cid = client.sensor_download().get_cid(false).await.unwrap();
    assert_eq!(cid, "0123456789abcdef0123456789abcdef");
    let ccid = client.sensor_download().get_cid(true).await.unwrap();
    assert_eq!(ccid, "0123456789ABCDEF0123456789ABCDEF-A1");
}

#[tokio::test]
async fn test_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(403).set_body_string("access denied"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.sensor_download().get_cid(false).await.unwrap_err();
    assert!(matches!(err, CaracaraError::Auth(_)));
    assert_eq!(err.code(), 401);
}

#[tokio::test]
async fn test_rate_limited_request_retried() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/sensors/queries/installers/ccid/v1"))
        .respond_with(ResponseTemplate::new(429).insert_header("X-RateLimit-RetryAfter", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors/queries/installers/ccid/v1"))
        .respond_with(ok(json!(["ABCDEF-12"])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.sensor_download().get_cid(false).await.unwrap(), "abcdef");
}

#[tokio::test]
async fn test_api_errors_surface() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/mssp/queries/children/v1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "resources": [],
            "errors": [{"code": 403, "message": "access denied, authorization failed"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.flight_control().get_child_cids().await.unwrap_err();
    assert_eq!(err.code(), 403);
    assert!(err.to_string().contains("access denied"));
}

#[tokio::test]
async fn test_close_revokes_token() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth2/revoke"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();
    assert!(client.http().is_authenticated());
    client.close().await.unwrap();
    assert!(!client.http().is_authenticated());
}

#[tokio::test]
async fn test_rejected_token_reauthenticates_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 1799
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors/queries/installers/ccid/v1"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors/queries/installers/ccid/v1"))
        .respond_with(ok(json!(["ABCDEF-12"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.sensor_download().get_cid(false).await.unwrap(), "abcdef");
}

#[tokio::test]
async fn test_repeated_unauthorized_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 1799
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors/queries/installers/ccid/v1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.sensor_download().get_cid(false).await.unwrap_err();
    assert!(matches!(err, CaracaraError::Api(_)));
    assert_eq!(err.code(), 401);
}

// ============== Hosts ==============

#[tokio::test]
async fn test_describe_devices_scrolls_and_batches() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/queries/devices-scroll/v1"))
        .and(query_param("offset", "next-page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"pagination": {"offset": "", "total": 3}},
            "resources": ["dev3"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices/queries/devices-scroll/v1"))
        .and(query_param("filter", "platform_name: 'Windows'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"pagination": {"offset": "next-page", "total": 3}},
            "resources": ["dev1", "dev2"]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/entities/devices/v2"))
        .respond_with(ok(json!([
            {"device_id": "dev1", "hostname": "web-01"},
            {"device_id": "dev2", "hostname": "web-02"},
            {"device_id": "dev3", "hostname": "db-01"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let devices = client
        .hosts()
        .describe_devices("platform_name: 'Windows'")
        .await
        .unwrap();

    assert_eq!(devices.len(), 3);
    assert_eq!(devices["dev3"]["hostname"], "db-01");
}

#[tokio::test]
async fn test_contain_requires_filter() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert!(matches!(
        client.hosts().contain(()).await,
        Err(CaracaraError::MustProvideFilter)
    ));
}

#[tokio::test]
async fn test_contain_performs_action() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/queries/devices-scroll/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"pagination": {"total": 1}},
            "resources": ["dev1"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/entities/devices-actions/v2"))
        .and(query_param("action_name", "contain"))
        .and(body_partial_json(json!({"ids": ["dev1"]})))
        .respond_with(ok(json!([{"id": "dev1", "path": "/devices/entities/devices/v1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.hosts().contain("hostname: 'web-01'").await.unwrap();
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn test_group_lookup_not_found() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/queries/host-groups/v1"))
        .respond_with(paged(json!([]), 0, 0))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .hosts()
        .delete_group(Target::filter("name: 'missing'"))
        .await
        .unwrap_err();
    assert!(matches!(err, CaracaraError::HostGroupNotFound));
}

#[tokio::test]
async fn test_add_to_group_without_matching_devices() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/queries/devices-scroll/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"pagination": {"total": 0}},
            "resources": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/entities/host-group-actions/v1"))
        .respond_with(ok(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .hosts()
        .add_to_group(Target::ids(vec!["group-1".to_string()]), Target::filter("hostname: 'none'"))
        .await
        .unwrap_err();
    assert!(matches!(err, CaracaraError::DeviceNotFound));
}

#[tokio::test]
async fn test_add_to_group_batches_devices() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/devices/entities/host-group-actions/v1"))
        .and(query_param("action_name", "add-hosts"))
        .and(body_partial_json(json!({"ids": ["group-1"]})))
        .respond_with(ok(json!([{"id": "group-1"}])))
        .expect(2)
        .mount(&server)
        .await;

    let device_ids: Vec<String> = (0..150).map(|i| format!("dev{i}")).collect();
    let client = client_for(&server);
    let result = client
        .hosts()
        .add_to_group(Target::ids(vec!["group-1".to_string()]), Target::ids(device_ids))
        .await
        .unwrap();
    assert_eq!(result.len(), 2);

    let requests = server.received_requests().await.unwrap();
    let filters: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/devices/entities/host-group-actions/v1")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["action_parameters"][0]["value"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(filters.len(), 2);
    assert!(filters[0].contains("'dev99'"));
    assert!(!filters[0].contains("'dev100'"));
    assert!(filters[1].starts_with("(device_id:['dev100',"));
}

// ============== RTR ==============

async fn mock_batch_init(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/real-time-response/combined/batch-init-session/v1"))
        .and(query_param("timeout_duration", "30s"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "batch_id": "batch-1",
            "resources": {
                "dev1": {"session_id": "s1", "complete": true},
                "dev2": {"session_id": "s2", "complete": true}
            },
            "errors": []
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_session_command() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    mock_batch_init(&server).await;
    Mock::given(method("POST"))
        .and(path("/real-time-response/combined/batch-command/v1"))
        .and(body_partial_json(json!({
            "base_command": "ls",
            "batch_id": "batch-1",
            "command_string": "ls /tmp"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "combined": {"resources": {
                "dev1": {"stdout": "a", "complete": true},
                "dev2": {"stdout": "b", "complete": true}
            }},
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = client.rtr().batch_session();
    let device_ids = vec!["dev1".to_string(), "dev2".to_string()];
    session.connect(&device_ids, false, 30).await.unwrap();

    let mut connected = session.device_ids().await.unwrap();
    connected.sort();
    assert_eq!(connected, device_ids);

    let results = session.run_generic_command("ls /tmp", None, 30).await.unwrap();
    assert_eq!(results["dev2"]["stdout"], "b");
}

#[tokio::test]
async fn test_raw_script_uses_admin_endpoint_and_optional_hosts() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    mock_batch_init(&server).await;
    Mock::given(method("POST"))
        .and(path("/real-time-response/combined/batch-admin-command/v1"))
        .and(query_param("timeout", "70"))
        .and(body_partial_json(json!({
            "base_command": "runscript",
            "command_string": "runscript -Raw=```whoami``` -Timeout=60",
            "optional_hosts": ["dev1"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "combined": {"resources": {"dev1": {"stdout": "root"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = client.rtr().batch_session();
    session
        .connect(&["dev1".to_string(), "dev2".to_string()], false, 30)
        .await
        .unwrap();

    let results = session
        .run_raw_script("whoami", 60, Some(&["dev1".to_string()]), None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results["dev1"]["stdout"], "root");
}

#[tokio::test]
async fn test_batch_get_and_status() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    mock_batch_init(&server).await;
    Mock::given(method("POST"))
        .and(path("/real-time-response/combined/batch-get-command/v1"))
        .and(body_partial_json(json!({"file_path": "C:\\Windows\\win.ini"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "batch_get_cmd_req_id": "req-1",
            "combined": {"resources": {"dev1": {"complete": true}}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/real-time-response/combined/batch-get-command/v1"))
        .and(query_param("batch_get_cmd_req_id", "req-1"))
        .respond_with(ok(json!({
            "dev1": {
                "name": "C:\\Windows\\win.ini",
                "session_id": "s1",
                "sha256": "deadbeef",
                "size": 92
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/real-time-response/entities/extracted-file-contents/v1"))
        .and(query_param("sha256", "deadbeef"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"7z-archive-bytes".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = client.rtr().batch_session();
    session.connect(&["dev1".to_string()], false, 30).await.unwrap();

    let requests = session.get("C:\\Windows\\win.ini", None, 30).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].batch_get_cmd_req_id, "req-1");

    let files = session.get_status(&requests, 30).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].basename(), "win.ini");
    assert_eq!(files[0].size, 92);

    let dir = tempfile::tempdir().unwrap();
    let written = files[0].download(dir.path(), false, false).await.unwrap();
    assert_eq!(
        written.file_name().unwrap().to_str().unwrap(),
        "win_deadbeef_dev1.ini.7z"
    );
    assert_eq!(std::fs::read(&written).unwrap(), b"7z-archive-bytes");
}

#[tokio::test]
async fn test_empty_get_status() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/real-time-response/combined/batch-get-command/v1"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let session = client.rtr().batch_session();
    let files = session.get_status_by_req_id("req-1", 30).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_clear_queued_sessions() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/real-time-response/queries/sessions/v1"))
        .and(query_param("filter", "offline_queued: 1+deleted_at: null"))
        .respond_with(paged(json!(["s1", "s2"]), 0, 2))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/real-time-response/entities/sessions/v1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.rtr().clear_queued_sessions().await.unwrap();
}

#[tokio::test]
async fn test_create_put_file() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/real-time-response/entities/put-files/v1"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("collect.ps1");
    std::fs::write(&file, "Get-Process").unwrap();

    let client = client_for(&server);
    client.rtr().create_put_file(&file, None, None).await.unwrap();

    let missing = dir.path().join("missing.ps1");
    assert!(matches!(
        client.rtr().create_put_file(&missing, None, None).await,
        Err(CaracaraError::InvalidArgument(_))
    ));
}

// ============== Users ==============

#[tokio::test]
async fn test_describe_users_attaches_roles() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/user-management/queries/users/v1"))
        .respond_with(paged(json!(["u1", "u2"]), 0, 2))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user-management/entities/users/GET/v1"))
        .respond_with(ok(json!([
            {"uuid": "u1", "uid": "alice@example.com"},
            {"uuid": "u2", "uid": "bob@example.com"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user-management/combined/user-roles/v1"))
        .and(query_param("user_uuid", "u1"))
        .and(query_param("direct_only", "false"))
        .respond_with(ok(json!([
            {"uuid": "u1", "role_id": "falcon_analyst"},
            {"uuid": "u1", "role_id": "custom_role"},
            {"uuid": "u1", "role_id": "falcon_analyst"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user-management/combined/user-roles/v1"))
        .and(query_param("user_uuid", "u2"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let users = client.users().describe_users((), None).await.unwrap();
    assert_eq!(users["u1"]["roles"], json!(["custom_role", "falcon_analyst"]));
    assert_eq!(users["u2"]["roles"], json!([]));
}

#[tokio::test]
async fn test_add_user_without_resources_fails() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/user-management/entities/users/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": null,
            "errors": [{"code": 409, "message": "user already exists"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .users()
        .add_user("Alice", "Smith", "alice@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, CaracaraError::Api(_)));
    assert_eq!(err.code(), 409);
}

#[tokio::test]
async fn test_add_user_without_record_or_errors() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/user-management/entities/users/v1"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .users()
        .add_user("Alice", "Smith", "alice@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, CaracaraError::InvalidArgument(_)));
    assert!(err.to_string().contains("alice@example.com"));
    assert_eq!(err.code(), 400);
}

#[tokio::test]
async fn test_uuid_by_email_not_found() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/users/queries/user-uuids-by-email/v1"))
        .and(query_param("uid", "nobody@example.com"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .users()
        .get_uuid_by_email("nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, CaracaraError::UserNotFound(ref email) if email == "nobody@example.com"));
    assert_eq!(err.code(), 404);
    assert_eq!(err.to_string(), "no user found for nobody@example.com");
}

#[tokio::test]
async fn test_uuid_by_email_found() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/users/queries/user-uuids-by-email/v1"))
        .respond_with(ok(json!(["user-uuid-1"])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let uuid = client.users().get_uuid_by_email("alice@example.com").await.unwrap();
    assert_eq!(uuid, "user-uuid-1");
}

// ============== Policies and Tokens ==============

#[tokio::test]
async fn test_push_prevention_policy() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/policy/entities/prevention/v1"))
        .and(body_partial_json(json!({"resources": [{"platform_name": "Linux"}]})))
        .respond_with(ok(json!([{
            "id": "policy-1",
            "name": "Example Prevention Policy",
            "platform_name": "Linux",
            "prevention_settings": []
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let policy = client.prevention_policies().new_policy("Linux").unwrap();
    let created = client.prevention_policies().push_policy(&policy).await.unwrap();
    assert_eq!(created.style, PolicyStyle::Prevention);
    assert_eq!(created.policy_id.as_deref(), Some("policy-1"));
}

#[tokio::test]
async fn test_describe_response_policies_sorted() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/policy/combined/response/v1"))
        .and(query_param("sort", "precedence|desc"))
        .respond_with(paged(
            json!([{"id": "p1", "name": "Servers", "settings": []}]),
            0,
            1,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let policies = client
        .response_policies()
        .describe_policies((), SortOrder::Desc)
        .await
        .unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].name.as_deref(), Some("Servers"));
}

#[tokio::test]
async fn test_modify_policy_requires_id() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let policy = client.response_policies().new_policy("Windows").unwrap();
    assert!(matches!(
        client.response_policies().modify_policy(&policy).await,
        Err(CaracaraError::MissingArgument(_))
    ));
}

#[tokio::test]
async fn test_bulk_maintenance_token() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/policy/combined/reveal-uninstall-token/v1"))
        .and(body_partial_json(json!({
            "device_id": "MAINTENANCE",
            "audit_message": "rotation"
        })))
        .respond_with(ok(json!([{"device_id": "MAINTENANCE", "uninstall_token": "tok-123"}])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let token = client
        .sensor_update_policies()
        .get_bulk_maintenance_token(Some("rotation"))
        .await
        .unwrap();
    assert_eq!(token, "tok-123");
}

#[tokio::test]
async fn test_describe_child_cids() {
    let server = MockServer::start().await;
    mock_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/mssp/queries/children/v1"))
        .respond_with(paged(json!(["c1"]), 0, 1))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mssp/entities/children/GET/v2"))
        .respond_with(ok(json!([{"child_cid": "c1", "name": "Child One"}])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let children = client.flight_control().describe_child_cids().await.unwrap();
    assert_eq!(children["c1"]["name"], "Child One");
}
