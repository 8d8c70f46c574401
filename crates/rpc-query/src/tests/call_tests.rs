//! Call tests - Calls through helpers, scoped release and error passthrough

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::transport::{CancellationSignal, Transport, TransportLayer, TransportRequest};
use crate::{
    ClientError, Injector, KeyOverrides, MutationOptionsInput, MutationOptionsOverrides,
    QueryFnContext, QueryOptionsInput, Rpc, RpcError, RpcErrorCode, RpcGroup, RpcQueryClient,
    RpcQueryClientConfigInput, RpcResult, as_mutation, create_rpc_query_client,
};

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Counters {
    fn balanced(&self) -> bool {
        self.acquired.load(Ordering::SeqCst) == self.released.load(Ordering::SeqCst)
    }
}

/// Echoes `users.*`, fails `broken`, never answers `slow`.
struct CountingLayer {
    counters: Arc<Counters>,
}

struct CountingConnection {
    counters: Arc<Counters>,
}

#[async_trait]
impl Transport for CountingConnection {
    async fn send(
        &mut self,
        request: TransportRequest,
        _signal: CancellationSignal,
    ) -> RpcResult<Value> {
        match request.path.as_str() {
            "broken" => Err(broken_error()),
            "slow" => {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            }
            _ => Ok(json!({ "path": request.path, "input": request.input })),
        }
    }

    fn release(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportLayer for CountingLayer {
    async fn acquire(&self) -> RpcResult<Box<dyn Transport>> {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingConnection {
            counters: self.counters.clone(),
        }))
    }
}

fn broken_error() -> RpcError {
    RpcError::new(RpcErrorCode::Conflict, "version mismatch").with_details(json!({ "expected": 3 }))
}

fn setup() -> (Arc<RpcQueryClient>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let layer = Arc::new(CountingLayer {
        counters: counters.clone(),
    });
    let group = RpcGroup::make([
        Rpc::new("users.get").into(),
        as_mutation(Rpc::new("users.updateName")),
        Rpc::new("broken").into(),
        Rpc::new("slow").into(),
        Rpc::stream("events.tail").into(),
    ])
    .unwrap();

    let factory = create_rpc_query_client(
        RpcQueryClientConfigInput::new(group, layer)
            .with_key_prefix("app")
            .with_mutation_defaults(MutationOptionsOverrides::new().with_retry(false)),
    );
    let injector = Injector::new(factory.providers());
    (factory.inject_client(&injector).unwrap(), counters)
}

#[tokio::test]
async fn test_call_releases_on_success() {
    let (client, counters) = setup();

    let result = client
        .query("users.get")
        .unwrap()
        .call(json!({ "id": 1 }))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(result, json!({ "path": "users.get", "input": { "id": 1 } }));
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
    assert!(counters.balanced());
}

#[tokio::test]
async fn test_transport_error_passes_through_unchanged() {
    let (client, counters) = setup();

    let via_call = client.query("broken").unwrap().call(Value::Null).unwrap().await;
    let via_effect = client.query("broken").unwrap().call_effect(Value::Null).unwrap().await;
    let via_fn = {
        let helper = client.query("broken").unwrap();
        let query_fn = helper.query_fn(Value::Null).unwrap();
        query_fn(QueryFnContext::new(helper.query_key(Value::Null, KeyOverrides::new()))).await
    };

    assert_eq!(via_call.unwrap_err(), broken_error());
    assert_eq!(via_effect.unwrap_err(), broken_error());
    assert_eq!(via_fn.unwrap_err(), broken_error());
    assert!(counters.balanced());
}

#[tokio::test]
async fn test_signal_cancels_and_releases() {
    let (client, counters) = setup();
    let helper = client.query("slow").unwrap();
    let query_fn = helper.query_fn(Value::Null).unwrap();
    let signal = CancellationSignal::new();
    let context = QueryFnContext::new(helper.query_key(Value::Null, KeyOverrides::new()))
        .with_signal(signal.clone());

    let task = tokio::spawn(query_fn(context));
    tokio::time::sleep(Duration::from_millis(20)).await;
    signal.cancel();

    let error = task.await.unwrap().unwrap_err();
    assert_eq!(error.code, RpcErrorCode::Cancelled);
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
    assert!(counters.balanced());
}

#[tokio::test]
async fn test_dropped_effect_releases() {
    let (client, counters) = setup();
    let call = client.query("slow").unwrap().call_effect(Value::Null).unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(20), call.into_future()).await;
    assert!(outcome.is_err());
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
    assert!(counters.balanced());
}

#[tokio::test]
async fn test_call_effect_is_lazy() {
    let (client, counters) = setup();
    let call = client.query("users.get").unwrap().call_effect(json!(7)).unwrap();
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);

    let value: serde_json::Map<String, Value> = call.run_as().await.unwrap();
    assert_eq!(value["input"], json!(7));
    assert!(counters.balanced());
}

#[tokio::test]
async fn test_mutation_options_run_through_transport() {
    let (client, counters) = setup();
    let options = client
        .mutation("users.updateName")
        .unwrap()
        .mutation_options(MutationOptionsInput::new())
        .unwrap();

    assert_eq!(options.retry, Some(crate::Retry::Enabled(false)));
    assert_eq!(options.mutation_key.path(), ["app", "users", "updateName"]);

    let out = options.mutate(json!({ "name": "Ada" })).await.unwrap();
    assert_eq!(out["input"], json!({ "name": "Ada" }));
    assert!(counters.balanced());
}

#[tokio::test]
async fn test_stream_guard_never_touches_transport() {
    let (client, counters) = setup();
    let helper = client.query("events.tail").unwrap();
    let expected = ClientError::StreamUnsupported {
        tag: "events.tail".into(),
    };

    assert_eq!(helper.call(Value::Null).err(), Some(expected.clone()));
    assert_eq!(helper.call_effect(Value::Null).err(), Some(expected.clone()));
    let error = helper
        .query_options(Value::Null, QueryOptionsInput::new())
        .unwrap_err();
    assert!(error.to_string().contains("\"events.tail\""));
    assert!(error.to_string().contains("stream"));
    assert_eq!(error, expected);
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stream_mutation_guard() {
    let counters = Arc::new(Counters::default());
    let layer = Arc::new(CountingLayer {
        counters: counters.clone(),
    });
    let group = RpcGroup::make([as_mutation(Rpc::stream("x.y"))]).unwrap();
    let factory = create_rpc_query_client(RpcQueryClientConfigInput::new(group, layer));
    let client = factory.inject_client(&Injector::new(factory.providers())).unwrap();
    let helper = client.mutation("x.y").unwrap();
    let expected = Some(ClientError::StreamUnsupported { tag: "x.y".into() });

    assert_eq!(helper.call(Value::Null).err(), expected);
    assert_eq!(helper.call_effect(Value::Null).err(), expected);
    assert_eq!(helper.mutation_fn().err(), expected);
    assert_eq!(
        helper.mutation_options(MutationOptionsInput::new()).err(),
        expected
    );
    assert_eq!(helper.mutation_key(KeyOverrides::new()).path(), ["x", "y"]);
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_singleton_identity() {
    let group = RpcGroup::make([Rpc::new("users.get")]).unwrap();
    let layer = Arc::new(CountingLayer {
        counters: Arc::new(Counters::default()),
    });
    let factory = create_rpc_query_client(RpcQueryClientConfigInput::new(group, layer));
    let injector = Injector::new(factory.providers());

    let first = factory.inject_client(&injector).unwrap();
    let second = injector.get(&factory.token()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(std::ptr::eq(
        first.query("users.get").unwrap(),
        second.query("users.get").unwrap()
    ));
}
