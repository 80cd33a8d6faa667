//! axum adapter: serving actions through the invoker.
//!
//! Each [`ActionRoute`] becomes one method on one path. Path segments and the
//! query string are exposed to binders as a [`CompositeValueProvider`], path
//! values first.

use crate::binding::{ActionDescriptor, CompositeValueProvider, DictionaryValueProvider, RequestHead, ValueProvider};
use crate::error::{BindingError, Result};
use crate::filters::{apply_conventions, ActionConvention};
use crate::invoker::{ActionHandler, ActionInvoker};
use crate::metadata::BindingSource;
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, Method, Uri},
    response::IntoResponse,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// One action exposed over HTTP.
#[derive(Clone)]
pub struct ActionRoute {
    pub method: Method,
    /// axum path syntax, e.g. `/users/:id`.
    pub path: String,
    pub action: Arc<ActionDescriptor>,
    pub handler: ActionHandler,
}

impl ActionRoute {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        action: ActionDescriptor,
        handler: ActionHandler,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            action: Arc::new(action),
            handler,
        }
    }

    pub fn get(path: impl Into<String>, action: ActionDescriptor, handler: ActionHandler) -> Self {
        Self::new(Method::GET, path, action, handler)
    }

    pub fn post(path: impl Into<String>, action: ActionDescriptor, handler: ActionHandler) -> Self {
        Self::new(Method::POST, path, action, handler)
    }
}

impl std::fmt::Debug for ActionRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("action", &self.action.id())
            .finish_non_exhaustive()
    }
}

/// Build a router for `routes`, applying `conventions` in order to every
/// action first.
///
/// # Errors
///
/// Returns a configuration error for a method axum cannot route, or when two
/// routes share a method and path.
pub fn router(
    invoker: Arc<ActionInvoker>,
    routes: Vec<ActionRoute>,
    conventions: &[&dyn ActionConvention],
) -> Result<Router> {
    let mut paths: BTreeMap<String, (MethodRouter, Vec<Method>)> = BTreeMap::new();

    for mut route in routes {
        apply_conventions(conventions, Arc::make_mut(&mut route.action));

        let filter = MethodFilter::try_from(route.method.clone()).map_err(|e| {
            BindingError::configuration(format!(
                "Cannot route method {} for {}",
                route.method, route.path
            ))
            .with_source(e)
        })?;

        let (method_router, mut methods) = paths
            .remove(&route.path)
            .unwrap_or_else(|| (MethodRouter::new(), Vec::new()));
        if methods.contains(&route.method) {
            return Err(BindingError::configuration(format!(
                "Duplicate route {} {}",
                route.method, route.path
            )));
        }
        methods.push(route.method.clone());

        info!(
            method = %route.method,
            path = %route.path,
            action = %route.action.id(),
            filters = route.action.filters().len(),
            "Registered action route"
        );

        let path = route.path.clone();
        let invoker = invoker.clone();
        let endpoint = move |path: Option<Path<HashMap<String, String>>>,
                             Query(query): Query<Vec<(String, String)>>,
                             method: Method,
                             uri: Uri,
                             headers: HeaderMap| async move {
            let path = path.map(|Path(values)| values).unwrap_or_default();
            let values = request_values(path, query);
            let request = RequestHead::new(method, uri).with_headers(headers);

            match invoker
                .invoke(&route.action, &route.handler, request, &values)
                .await
            {
                Ok(invocation) => invocation.result.into_response(),
                Err(err) => err.into_response(),
            }
        };
        paths.insert(path, (method_router.on(filter, endpoint), methods));
    }

    Ok(paths
        .into_iter()
        .fold(Router::new(), |router, (path, (method_router, _))| {
            router.route(&path, method_router)
        }))
}

/// Path values followed by query values.
pub fn request_values(
    path: HashMap<String, String>,
    query: Vec<(String, String)>,
) -> CompositeValueProvider {
    let path = DictionaryValueProvider::from_pairs(path).with_source(BindingSource::Path);
    let query = DictionaryValueProvider::from_pairs(query).with_source(BindingSource::Query);
    CompositeValueProvider::new(vec![
        Arc::new(path) as Arc<dyn ValueProvider>,
        Arc::new(query),
    ])
}
