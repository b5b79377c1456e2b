//! Request router
//!
//! Turns a query key into exactly one backend call and a normalized payload.
//! No retries, no timeouts and no fallback routes: transport errors reach
//! the caller as they are.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::backend::{BackendKind, BackendSet};
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::key::QueryKey;
use crate::route::{RequestShape, Route, RouteContext, RouteTable, Unwrap};
use crate::stream::EventStream;

/// Envelope field wrapping the payload
const RESPONSE_FIELD: &str = "response";
const ENTITIES_MARKER: &str = "entities";
const REGEXES_MARKER: &str = "regexes";

/// Result of resolving a query key
#[derive(Debug)]
pub enum Payload {
    Json(serde_json::Value),
    Stream(EventStream),
}

impl Payload {
    /// The JSON value, if this is not a stream
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Payload::Stream(_))
    }
}

/// The request a key resolves to, computed without touching the network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub route: &'static str,
    pub backend: BackendKind,
    pub method: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    pub unwrap: Unwrap,
}

impl RoutePlan {
    fn new(route: &'static Route, key: &QueryKey) -> Self {
        let body = match route.request {
            RequestShape::Post(shape) => Some(shape.build(key)),
            _ => None,
        };
        Self {
            route: route.name,
            backend: route.backend,
            method: route.request.method(),
            path: route.request.path(key),
            body,
            unwrap: route.unwrap,
        }
    }
}

/// Dispatches query keys to the backend set
///
/// Cheap to clone; all state is immutable after construction.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    backends: BackendSet,
    table: RouteTable,
    context: RouteContext,
}

impl RequestRouter {
    pub fn new(backends: BackendSet, context: RouteContext) -> Self {
        Self {
            backends,
            table: RouteTable::standard(),
            context,
        }
    }

    /// Build backend clients and routing context from configuration
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        config.validate()?;
        let backends = BackendSet::from_config(&config.backends)?;
        let context = RouteContext::new(config.local, config.mocked_endpoints.clone());
        Ok(Self::new(backends, context))
    }

    pub fn routes(&self) -> &'static [Route] {
        self.table.routes()
    }

    pub fn context(&self) -> &RouteContext {
        &self.context
    }

    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    /// Which rule a key hits and the request it produces
    pub fn explain(&self, key: &QueryKey) -> RoutePlan {
        RoutePlan::new(self.table.select(key, &self.context), key)
    }

    /// Resolve a query key to its payload
    pub async fn resolve(&self, key: &QueryKey) -> Result<Payload> {
        self.resolve_plan(key).await.map(|(_, payload)| payload)
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn resolve_plan(&self, key: &QueryKey) -> Result<(RoutePlan, Payload)> {
        let plan = self.explain(key);
        debug!(
            route = plan.route,
            backend = %plan.backend,
            "{} {}",
            plan.method,
            plan.path
        );

        let client = self.backends.get(plan.backend);
        if plan.unwrap == Unwrap::Stream {
            let stream = client.open_stream(&plan.path).await?;
            return Ok((plan, Payload::Stream(stream)));
        }

        let body = match &plan.body {
            Some(body) => client.post_json(&plan.path, body).await?,
            None => client.get_json(&plan.path).await?,
        };

        let payload = if plan.unwrap == Unwrap::Envelope {
            take_field(body, RESPONSE_FIELD, &plan.path)?
        } else {
            unwrap_tagged(key, body, &plan.path)?
        };
        Ok((plan, Payload::Json(payload)))
    }

    /// Resolve and deserialize into `T`
    pub async fn resolve_as<T: serde::de::DeserializeOwned>(&self, key: &QueryKey) -> Result<T> {
        match self.resolve_plan(key).await? {
            (_, Payload::Json(value)) => {
                serde_json::from_value(value).map_err(|e| ConsoleError::Parse(e.to_string()))
            }
            (plan, Payload::Stream(_)) => Err(ConsoleError::UnexpectedStream(plan.route.into())),
        }
    }
}

/// Final key-tag stage
fn unwrap_tagged(key: &QueryKey, body: serde_json::Value, path: &str) -> Result<serde_json::Value> {
    if key.contains(ENTITIES_MARKER) {
        take_field(body, RESPONSE_FIELD, path)
    } else if key.contains(REGEXES_MARKER) {
        let response = take_field(body, RESPONSE_FIELD, path)?;
        take_field(response, REGEXES_MARKER, path).map_err(|_| ConsoleError::MalformedEnvelope {
            path: path.to_string(),
            field: "response.regexes",
        })
    } else {
        Ok(body)
    }
}

fn take_field(
    mut body: serde_json::Value,
    field: &'static str,
    path: &str,
) -> Result<serde_json::Value> {
    body.as_object_mut()
        .and_then(|obj| obj.remove(field))
        .ok_or_else(|| ConsoleError::MalformedEnvelope {
            path: path.to_string(),
            field,
        })
}
