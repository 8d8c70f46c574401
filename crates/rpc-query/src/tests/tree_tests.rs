//! Tree tests - Helper tree shape and construction errors

use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

use crate::transport::{Transport, TransportLayer};
use crate::{
    ClassifiedRpc, ClientError, ClientResult, HelperNode, KeyOverrides, ProcedureKind, Rpc,
    RpcError, RpcGroup, RpcQueryClient, RpcQueryClientConfigInput, RpcResult, as_mutation,
};
use async_trait::async_trait;

struct Unreachable;

#[async_trait]
impl TransportLayer for Unreachable {
    async fn acquire(&self) -> RpcResult<Box<dyn Transport>> {
        Err(RpcError::service_unavailable("unreachable"))
    }
}

fn client(procedures: Vec<ClassifiedRpc>) -> ClientResult<RpcQueryClient> {
    let group = RpcGroup::make(procedures)?;
    RpcQueryClient::build(RpcQueryClientConfigInput::new(group, Arc::new(Unreachable)).into())
}

fn tags_of(client: &RpcQueryClient) -> Vec<String> {
    client.procedures().iter().map(|h| h.tag().to_string()).collect()
}

// =============================================================================
// Property-Based Tests
// =============================================================================

proptest! {
    /// The tree shape, and whether construction fails at all, do not depend on
    /// the order procedures are declared in.
    #[test]
    fn prop_order_independent_shape(
        (tags, shuffled) in prop::collection::btree_set("[a-c]{1,2}(\\.[a-c]{1,2}){0,2}", 1..8)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_flat_map(|tags| (Just(tags.clone()), Just(tags).prop_shuffle()))
    ) {
        let declared = client(tags.iter().map(|t| Rpc::new(t.as_str()).into()).collect());
        let reordered = client(shuffled.iter().map(|t| Rpc::new(t.as_str()).into()).collect());

        prop_assert_eq!(declared.is_ok(), reordered.is_ok());
        if let (Ok(declared), Ok(reordered)) = (declared, reordered) {
            prop_assert_eq!(tags_of(&declared), tags_of(&reordered));
            let mut found = tags_of(&declared);
            found.sort();
            prop_assert_eq!(found, tags);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn test_nested_helpers_have_distinct_shapes() {
    let client = client(vec![
        Rpc::new("users.get").into(),
        as_mutation(Rpc::new("users.updateName")),
    ])
    .unwrap();

    let users = client.namespace("users").unwrap();
    assert_eq!(users.keys().collect::<Vec<_>>(), ["get", "updateName"]);

    let get = client.query("users.get").unwrap();
    let update = client.mutation("users.updateName").unwrap();
    assert_eq!(get.kind(), ProcedureKind::Query);
    assert_eq!(update.kind(), ProcedureKind::Mutation);

    assert_eq!(
        serde_json::to_value(get.query_key(json!({ "id": "1" }), KeyOverrides::new())).unwrap(),
        json!([["users", "get"], { "input": { "id": "1" }, "type": "query" }])
    );
    assert_eq!(
        serde_json::to_value(update.mutation_key(KeyOverrides::new())).unwrap(),
        json!([["users", "updateName"], { "type": "mutation" }])
    );
}

#[test]
fn test_collision_names_segment() {
    let error = client(vec![Rpc::new("a").into(), Rpc::new("a.b").into()]).unwrap_err();
    assert!(error.to_string().contains("\"a\""));
    assert!(matches!(error, ClientError::PathConflict { ref segment, .. } if segment == "a"));
}

#[test]
fn test_reserved_root_name() {
    for tag in ["pathKey", "queryFilter"] {
        assert_eq!(
            client(vec![Rpc::new(tag).into()]).unwrap_err(),
            ClientError::ReservedName { tag: tag.into() }
        );
    }
}

#[test]
fn test_stream_procedure_is_navigable() {
    let client = client(vec![Rpc::stream("events.tail").into()]).unwrap();
    let node = client.namespace("events").and_then(|events| events.get("tail"));
    assert!(matches!(node, Some(HelperNode::Procedure(_))));
    assert!(client.query("events.tail").unwrap().is_stream());
}
