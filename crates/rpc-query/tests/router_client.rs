//! End-to-end flow: a local router served through the query client
//! Run: cargo test -p rpc-query --test router_client

use rpc_query::prelude::*;
use rpc_query::QueryFilter;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct AppState {
    users: Arc<Mutex<HashMap<u64, String>>>,
}

#[derive(Deserialize)]
struct GetUser {
    id: u64,
}

#[derive(Deserialize)]
struct UpdateName {
    id: u64,
    name: String,
}

async fn get_user(ctx: Context<AppState>, input: GetUser) -> RpcResult<Value> {
    let users = ctx.users.lock().map_err(|e| RpcError::internal(e.to_string()))?;
    users
        .get(&input.id)
        .map(|name| json!({ "id": input.id, "name": name }))
        .ok_or_else(|| RpcError::not_found(format!("user {} not found", input.id)))
}

async fn update_name(ctx: Context<AppState>, input: UpdateName) -> RpcResult<Value> {
    let mut users = ctx.users.lock().map_err(|e| RpcError::internal(e.to_string()))?;
    users.insert(input.id, input.name.clone());
    Ok(json!({ "id": input.id, "name": input.name }))
}

fn router(state: AppState) -> Router<AppState> {
    let users = Router::new()
        .context(state.clone())
        .query("get", get_user)
        .mutation("updateName", update_name)
        .stream("changes");
    Router::new().context(state).merge("users", users)
}

fn client() -> (Arc<RpcQueryClient>, Injector) {
    let transport = RouterTransport::new(router(AppState::default()));
    let group = transport.contract();
    let factory = create_rpc_query_client(
        RpcQueryClientConfigInput::new(group, Arc::new(transport)).with_key_prefix("app"),
    );
    let injector = Injector::new(factory.providers());
    let client = factory.inject_client(&injector).unwrap();
    (client, injector)
}

#[tokio::test]
async fn test_mutate_then_fetch() {
    let (client, _injector) = client();

    let renamed = client
        .mutation("users.updateName")
        .unwrap()
        .call(json!({ "id": 1, "name": "Ada" }))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(renamed, json!({ "id": 1, "name": "Ada" }));

    let options = client
        .query("users.get")
        .unwrap()
        .query_options(json!({ "id": 1 }), QueryOptionsInput::new())
        .unwrap();
    assert_eq!(
        serde_json::to_value(&options.query_key).unwrap(),
        json!([["app", "users", "get"], { "input": { "id": 1 }, "type": "query" }])
    );
    assert_eq!(options.fetch().await.unwrap()["name"], "Ada");
}

#[tokio::test]
async fn test_handler_error_reaches_caller() {
    let (client, _injector) = client();

    let error = client
        .query("users.get")
        .unwrap()
        .call_effect(json!({ "id": 404 }))
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(error, RpcError::not_found("user 404 not found"));
}

#[test]
fn test_contract_shapes_helpers() {
    let (client, _injector) = client();

    let users = client.namespace("users").unwrap();
    assert_eq!(users.keys().collect::<Vec<_>>(), ["changes", "get", "updateName"]);
    assert_eq!(client.procedure("users.updateName").unwrap().kind(), ProcedureKind::Mutation);

    let changes = client.query("users.changes").unwrap();
    assert!(changes.is_stream());
    assert!(matches!(
        changes.call(Value::Null),
        Err(ClientError::StreamUnsupported { .. })
    ));
}

#[test]
fn test_filter_addresses_namespace() {
    let (client, _injector) = client();

    let key = client
        .query("users.get")
        .unwrap()
        .query_key(json!({ "id": 1 }), KeyOverrides::new());
    let filter: QueryFilter = client.query_filter(&["users"], QueryFilterOptions::new());
    assert!(filter.matches(&key));

    let other_prefix = client.query_filter(&["users"], QueryFilterOptions::new().with_prefix("admin"));
    assert!(!other_prefix.matches(&key));

    assert_eq!(
        client.path_key(&["users"], PathOptions::new()).path(),
        ["app", "users"]
    );
}
