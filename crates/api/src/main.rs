use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bedtime_ai::{LocalAssetWriter, OpenAiClient, PineconeIndex};
use bedtime_db::{PgStoryStore, StoryStore};
use bedtime_pipeline::{Generators, SimilarityService, StoryPipeline};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bedtime_api::background;
use bedtime_api::config::{ProviderConfig, ServerConfig};
use bedtime_api::router::build_app_router;
use bedtime_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bedtime_api=debug,bedtime_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let providers = ProviderConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        app_env = %config.app_env,
        namespace = config.vector_namespace(),
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = bedtime_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    bedtime_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    bedtime_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn StoryStore> = Arc::new(PgStoryStore::new(pool));

    // --- Collaborators ---
    let assets = Arc::new(LocalAssetWriter::new(providers.asset_dir.clone()));
    let openai = Arc::new(
        OpenAiClient::new(providers.openai.clone(), assets).expect("Failed to build OpenAI client"),
    );
    let vectors = Arc::new(
        PineconeIndex::new(providers.pinecone.clone()).expect("Failed to build Pinecone client"),
    );
    tracing::info!(asset_dir = %providers.asset_dir.display(), "Provider clients created");

    // --- Pipeline ---
    let similarity = Arc::new(SimilarityService::new(
        Arc::clone(&store),
        openai.clone(),
        vectors,
        config.vector_namespace(),
    ));
    let generators = Generators {
        text: openai.clone(),
        image: openai.clone(),
        audio: openai,
    };
    let pipeline = Arc::new(
        StoryPipeline::new(Arc::clone(&store), generators).with_similarity(Arc::clone(&similarity)),
    );

    match background::resume::resume_pending(store.as_ref(), &pipeline).await {
        Ok(count) => tracing::info!(count, "Startup resume sweep finished"),
        Err(e) => tracing::error!(error = %e, "Startup resume sweep failed"),
    }

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let daily_handle = config.daily_story_user_email.clone().map(|email| {
        tokio::spawn(background::daily_story::run(
            Arc::clone(&store),
            Arc::clone(&pipeline),
            email,
            cancel.clone(),
        ))
    });
    if daily_handle.is_none() {
        tracing::info!("DAILY_STORY_USER_EMAIL not set, daily story job disabled");
    }

    // --- App state ---
    let state = AppState {
        store,
        pipeline: Arc::clone(&pipeline),
        similarity,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    if let Some(handle) = daily_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Daily story job stopped");
    }

    // In-flight stories not finished here are picked up by the next
    // startup's resume sweep.
    if tokio::time::timeout(Duration::from_secs(30), pipeline.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("Story pipeline did not drain before the shutdown deadline");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to begin graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
