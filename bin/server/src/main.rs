#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use axum::{Router, extract::DefaultBodyLimit, middleware, routing::post};
    use jupiter_ai::{Agent, OpenAiClient};
    use jupiter_conversation::{InMemorySessionManager, RetrievalTool, SessionManager, ToolRegistry};
    use jupiter_server::{
        app::App, config::ServerConfig, session::ensure_session, state::AppState,
        upload::upload_document,
    };
    use leptos::prelude::*;
    use leptos_axum::{LeptosRoutes, generate_route_list};
    use std::sync::Arc;
    use tower_http::services::ServeDir;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(model = %config.model.name, "Loaded configuration");

    let model = OpenAiClient::new(config.openai_api_key.clone(), &config.model)
        .expect("failed to create model client");

    let mut tools = ToolRegistry::new().with_call_timeout(config.agent.tool_timeout());
    tools
        .register(Arc::new(
            RetrievalTool::new().with_default_top_k(config.retrieval.default_top_k),
        ))
        .expect("failed to register retrieval tool");
    tracing::info!(tools = ?tools.names().collect::<Vec<_>>(), "Registered tools");

    let agent = Agent::new(Arc::new(model), Arc::new(tools), config.agent.clone());
    let app_state = Arc::new(AppState::new(
        agent,
        InMemorySessionManager::new(),
        config.server.clone(),
    ));

    // Drop idle sessions periodically
    let cleanup_state = app_state.clone();
    let cleanup_interval_secs = config.server.cleanup_interval_seconds;
    let idle = chrono::Duration::minutes(config.server.session_idle_minutes);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            let cutoff = chrono::Utc::now() - idle;
            let expired = match cleanup_state.sessions.get_expired_sessions(cutoff).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to list expired sessions");
                    continue;
                }
            };
            for id in &expired {
                if let Err(e) = cleanup_state.sessions.delete_session(*id).await {
                    tracing::warn!(error = %e, session_id = %id, "Failed to delete expired session");
                }
                cleanup_state.forget(*id).await;
            }
            if !expired.is_empty() {
                tracing::debug!(deleted_sessions = expired.len(), "Periodic session cleanup");
            }
        }
    });

    let conf = get_configuration(None).expect("failed to get leptos configuration");
    let leptos_options = conf.leptos_options;
    let addr = leptos_options.site_addr;
    let routes = generate_route_list(App);

    let combined_state = CombinedState {
        leptos_options: leptos_options.clone(),
        app_state: app_state.clone(),
    };

    // Multipart framing needs some room beyond the file itself
    let body_limit = usize::try_from(config.server.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024);

    let app = Router::new()
        .route(
            "/documents",
            post(upload_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .leptos_routes(&combined_state, routes, {
            let leptos_options = leptos_options.clone();
            move || shell(leptos_options.clone())
        })
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            ensure_session,
        ))
        .fallback(leptos_axum::file_and_error_handler::<CombinedState, _>(
            shell,
        ))
        .nest_service("/pkg", ServeDir::new("target/site/pkg"))
        // Server functions read the state from request extensions
        .layer(axum::Extension(app_state))
        .with_state(combined_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}

/// Combined state for the application.
#[cfg(feature = "ssr")]
#[derive(Clone)]
struct CombinedState {
    leptos_options: leptos::prelude::LeptosOptions,
    app_state: std::sync::Arc<jupiter_server::state::AppState>,
}

#[cfg(feature = "ssr")]
impl axum::extract::FromRef<CombinedState> for leptos::prelude::LeptosOptions {
    fn from_ref(state: &CombinedState) -> Self {
        state.leptos_options.clone()
    }
}

#[cfg(feature = "ssr")]
impl axum::extract::FromRef<CombinedState> for std::sync::Arc<jupiter_server::state::AppState> {
    fn from_ref(state: &CombinedState) -> Self {
        state.app_state.clone()
    }
}

#[cfg(feature = "ssr")]
fn shell(options: leptos::prelude::LeptosOptions) -> impl leptos::prelude::IntoView {
    use jupiter_server::app::App;
    use leptos::prelude::*;
    use leptos_meta::*;

    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <link rel="stylesheet" href="/pkg/jupiter.css"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    // Hydration entry point lives in lib.rs
}
