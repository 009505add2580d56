use std::{future::Future, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use server_coin_registry::Error;
use server_coin_types::ServerRecord;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::{parse_hex, ServerRegistry};

/// Lookup of the live server coins of a store.
pub trait ServerLookup: Send + Sync + 'static {
    fn servers(
        &self,
        launcher_id: &[u8],
    ) -> impl Future<Output = server_coin_registry::Result<Vec<ServerRecord>>> + Send;
}

impl ServerLookup for ServerRegistry {
    async fn servers(&self, launcher_id: &[u8]) -> server_coin_registry::Result<Vec<ServerRecord>> {
        self.query(launcher_id).await
    }
}

pub struct App<S> {
    pub registry: Arc<S>,
}

impl<S> Clone for App<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

pub fn router<S: ServerLookup>(app: App<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/servers/{launcher_id}", get(servers::<S>))
        .with_state(app)
        .layer(cors)
}

#[derive(Serialize)]
pub struct ServersResponse {
    pub servers: Vec<ServerRecord>,
}

async fn servers<S: ServerLookup>(
    State(app): State<App<S>>,
    Path(launcher_id): Path<String>,
) -> Result<Json<ServersResponse>, StatusCode> {
    let Ok(launcher_id) = parse_hex(&launcher_id) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    match app.registry.servers(&launcher_id).await {
        Ok(servers) => Ok(Json(ServersResponse { servers })),
        Err(Error::Driver(server_coin_driver::Error::InvalidIdentifier(_))) => {
            Err(StatusCode::BAD_REQUEST)
        }
        Err(error) if error.is_transient() => Err(StatusCode::SERVICE_UNAVAILABLE),
        Err(error) => {
            error!("Query for {} failed: {}", hex::encode(&launcher_id), error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
