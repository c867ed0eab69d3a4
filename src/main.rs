use blog_api::configuration::get_configuration;
use blog_api::startup::run;
use blog_api::store::Stores;
use blog_api::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    init_telemetry(&configuration.telemetry, configuration.application.environment);
    tracing::info!(
        environment = ?configuration.application.environment,
        "Configuration loaded successfully"
    );

    let stores = if configuration.database.use_memory_store {
        tracing::warn!("Using the in-memory store; data is lost on restart");
        Stores::in_memory()
    } else {
        tracing::info!("Attempting to connect to database");

        let pool = PgPoolOptions::new()
            .max_connections(configuration.database.max_connections)
            .connect(&configuration.database.connection_string())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
            })?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
        })?;

        tracing::info!("Database connection pool created successfully");
        Stores::postgres(pool)
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, stores, configuration)?;
    server.await
}
