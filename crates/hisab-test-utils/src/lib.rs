//! Testing utilities for Hisab workspace
//!
//! Shared test helpers, fixtures, and a scripted transport.

#![allow(missing_docs)]

use async_trait::async_trait;
use hisab_auth::{Permission, Role, User, UserId};
use hisab_query::{Method, QueryCache, QueryClient, ResourceCatalog, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// One request seen by [`FakeTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Scripted in-memory transport
///
/// Each `(method, path)` route has a queue of responses. Responses are
/// consumed in order; the last one keeps being returned. Unscripted routes
/// answer 404. Calls are recorded before the artificial latency elapses, so
/// counts are exact even while requests are still in flight.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Result<Value, TransportError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Mutex<Duration>,
    route_latency: Mutex<HashMap<(Method, String), Duration>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = latency;
        self
    }

    /// Queue a successful response
    pub fn respond(&self, method: Method, path: &str, body: Value) -> &Self {
        self.push(method, path, Ok(body));
        self
    }

    /// Queue a failure
    pub fn fail(&self, method: Method, path: &str, error: TransportError) -> &Self {
        self.push(method, path, Err(error));
        self
    }

    /// Delay responses on one route, overriding [`FakeTransport::with_latency`]
    pub fn delay(&self, method: Method, path: &str, latency: Duration) -> &Self {
        self.route_latency
            .lock()
            .insert((method, path.to_string()), latency);
        self
    }

    fn push(&self, method: Method, path: &str, response: Result<Value, TransportError>) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Every recorded call, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls to a route
    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Number of calls to any route
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_response(&self, method: Method, path: &str) -> Result<Value, TransportError> {
        let mut routes = self.routes.lock();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(Value::Null)),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(Value::Null)),
            None => Err(TransportError::status(404, format!("no route for {method} {path}"))),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let latency = self
            .route_latency
            .lock()
            .get(&(method, path.to_string()))
            .copied()
            .unwrap_or_else(|| *self.latency.lock());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.next_response(method, path)
    }
}

/// Client over `transport` with the default catalog and a given freshness window
pub fn client_with(transport: Arc<FakeTransport>, freshness: Duration) -> QueryClient {
    QueryClient::new(
        transport,
        ResourceCatalog::with_defaults(),
        QueryCache::new(64, freshness),
    )
}

/// Client over `transport` with default settings
pub fn client(transport: Arc<FakeTransport>) -> QueryClient {
    client_with(transport, Duration::from_secs(300))
}

/// `n` transaction records with ids `1..=n`
pub fn transactions_payload(n: usize) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| {
                json!({
                    "id": i,
                    "type": if i % 2 == 0 { "expense" } else { "income" },
                    "amount": i * 100,
                    "description": format!("قيد رقم {i}"),
                })
            })
            .collect(),
    )
}

/// User with `role` and `permissions`
pub fn user(role: Role, permissions: &[Permission]) -> User {
    User::new(UserId::new("1").unwrap(), format!("{role}_user"), role)
        .unwrap()
        .with_permissions(permissions.iter().cloned())
}

/// Administrator holding every well-known permission
pub fn admin() -> User {
    user(Role::Admin, &Permission::WELL_KNOWN)
}

/// Manager with project and transaction rights
pub fn manager() -> User {
    user(
        Role::Manager,
        &[
            Permission::VIEW_REPORTS,
            Permission::MANAGE_PROJECTS,
            Permission::VIEW_PROJECTS,
            Permission::MANAGE_TRANSACTIONS,
            Permission::VIEW_TRANSACTIONS,
        ],
    )
}

/// Viewer that may read reports
pub fn viewer_with_reports() -> User {
    user(Role::Viewer, &[Permission::VIEW_REPORTS])
}

/// Login response body as the backend returns it
pub fn login_response(user: &User) -> String {
    json!({ "token": "test-token", "user": user }).to_string()
}
