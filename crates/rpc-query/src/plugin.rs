//! Tauri state integration
//!
//! Registers an injected query client in Tauri's managed state so commands
//! and setup hooks can reach it through [`RpcQueryExt`].
//!
//! ```rust,ignore
//! tauri::Builder::default().setup(move |app| {
//!     manage_client(app, &factory, &injector)?;
//!     Ok(())
//! });
//!
//! #[tauri::command]
//! async fn user(app: tauri::AppHandle, id: u64) -> Result<Value, RpcError> {
//!     let client = app.rpc_query_client().ok_or_else(|| RpcError::internal("no client"))?;
//!     client.query("users.get").map_err(|e| RpcError::internal(e.to_string()))?
//!         .call_effect(json!({ "id": id }))
//!         .map_err(|e| RpcError::internal(e.to_string()))?
//!         .await
//! }
//! ```

use crate::client::{RpcQueryClient, RpcQueryClientFactory};
use crate::injector::Injector;
use crate::ClientResult;
use std::sync::Arc;
use tauri::{Manager, Runtime};

struct ClientState(Arc<RpcQueryClient>);

/// Access to the managed query client.
pub trait RpcQueryExt<R: Runtime> {
    /// The client registered with [`manage_client`], if any.
    fn rpc_query_client(&self) -> Option<Arc<RpcQueryClient>>;
}

impl<R: Runtime, T: Manager<R>> RpcQueryExt<R> for T {
    fn rpc_query_client(&self) -> Option<Arc<RpcQueryClient>> {
        self.try_state::<ClientState>().map(|state| state.0.clone())
    }
}

/// Resolve the client in `injector` and put it in Tauri's managed state.
///
/// The first registration wins; later calls return the injected client
/// without replacing the managed one.
pub fn manage_client<R, M>(
    manager: &M,
    factory: &RpcQueryClientFactory,
    injector: &Injector,
) -> ClientResult<Arc<RpcQueryClient>>
where
    R: Runtime,
    M: Manager<R>,
{
    let client = factory.inject_client(injector)?;
    if !manager.manage(ClientState(client.clone())) {
        tracing::debug!("RPC query client already managed");
    }
    Ok(client)
}
