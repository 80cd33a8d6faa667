//! Apex Binding Server - demo entry point
//!
//! Serves a few actions whose parameters are bound from the path and query
//! string and validated before the handler runs.

use std::sync::Arc;

use apex_binding::{
    binding::{ActionDescriptor, BindingInfo, ModelBinderFactory, ParameterBinder, ParameterDescriptor},
    config::Config,
    filters::{ActionResult, ApiBehaviorConvention},
    invoker::{handler, ActionArguments, ActionInvoker},
    metadata::{
        BindingSource, DefaultModelMetadataProvider, ModelMetadataProvider, PropertyDescriptor,
        TypeDescriptor, ValidationAnnotation,
    },
    model::Model,
    server::{self, ActionRoute},
    telemetry,
    validation::AnnotationValidatorProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    telemetry::init_telemetry(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Apex Binding Server"
    );

    // Metadata for the demo types
    let metadata: Arc<dyn ModelMetadataProvider> = Arc::new(
        DefaultModelMetadataProvider::builder()
            .register(TypeDescriptor::collection("string[]", "string"))
            .register(
                TypeDescriptor::complex("OrderFilter")
                    .property(
                        PropertyDescriptor::new("status", "string")
                            .annotate(ValidationAnnotation::OneOf(vec![
                                "open".to_string(),
                                "shipped".to_string(),
                                "closed".to_string(),
                            ])),
                    )
                    .property(
                        PropertyDescriptor::new("min_total", "float?")
                            .display_name("Minimum total")
                            .annotate(ValidationAnnotation::Range { min: 0.0, max: 1_000_000.0 }),
                    )
                    .property(
                        PropertyDescriptor::new("email", "string")
                            .annotate(ValidationAnnotation::Email),
                    ),
            )
            .build()?,
    );

    let factory = Arc::new(ModelBinderFactory::with_default_providers(metadata.clone()));
    let binder = ParameterBinder::new(
        metadata,
        factory,
        vec![Arc::new(AnnotationValidatorProvider)],
    )
    .with_options(config.binding.clone());
    let invoker = Arc::new(ActionInvoker::new(Arc::new(binder)));
    tracing::info!(
        max_model_errors = config.binding.max_model_errors,
        "Parameter binder initialized"
    );

    // Build router
    let convention = ApiBehaviorConvention::new(&config.binding);
    let app = server::router(invoker, demo_routes(), &[&convention])?;

    // Start server
    let addr = config.server.bind_address();
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn demo_routes() -> Vec<ActionRoute> {
    let get_user = ActionDescriptor::new(
        "users.get",
        vec![ParameterDescriptor::new("id", "int")
            .with_binding_info(BindingInfo::new().with_binding_source(BindingSource::Path))],
    )
    .api();

    let search_users = ActionDescriptor::new(
        "users.search",
        vec![
            ParameterDescriptor::new("q", "string")
                .bind_required()
                .annotate(ValidationAnnotation::MinLength(2)),
            ParameterDescriptor::new("tags", "string[]")
                .annotate(ValidationAnnotation::MaxItems(5)),
            ParameterDescriptor::new("page", "int?")
                .annotate(ValidationAnnotation::Range { min: 1.0, max: 100.0 }),
        ],
    )
    .api();

    let search_orders = ActionDescriptor::new(
        "orders.search",
        vec![ParameterDescriptor::new("filter", "OrderFilter")],
    )
    .api();

    vec![
        ActionRoute::get(
            "/users/:id",
            get_user,
            handler(|args: ActionArguments| async move {
                ActionResult::ok(serde_json::json!({ "id": arg(&args, "id") }))
            }),
        ),
        ActionRoute::get(
            "/users",
            search_users,
            handler(|args: ActionArguments| async move {
                ActionResult::ok(serde_json::json!({
                    "q": arg(&args, "q"),
                    "tags": arg(&args, "tags"),
                    "page": arg(&args, "page"),
                }))
            }),
        ),
        ActionRoute::get(
            "/orders",
            search_orders,
            handler(|args: ActionArguments| async move {
                ActionResult::ok(serde_json::json!({ "filter": arg(&args, "filter") }))
            }),
        ),
    ]
}

fn arg(args: &ActionArguments, name: &str) -> serde_json::Value {
    args.get(name).map(Model::to_json).unwrap_or_default()
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
