// tests/common/mod.rs

use lms_backend::{config::Config, routes, state::AppState, utils::hash::hash_password};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL and a pool for seeding, or `None` when no
/// `DATABASE_URL` is configured (the test is then skipped).
pub async fn spawn_app() -> Option<(String, PgPool)> {
    // Note: For Postgres, you must have a running database.
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        instructor_username: None,
        instructor_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background. ConnectInfo feeds the
    // auth rate limiter's peer-IP key extractor.
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some((address, pool))
}

/// Seeds an instructor account directly and returns (username, password).
/// Registration only ever creates students, so tests insert this row
/// through the pool, the same way the server's startup seeding does.
pub async fn seed_instructor(pool: &PgPool) -> (String, String) {
    let username = format!("inst_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123".to_string();
    let hashed = hash_password(&password).expect("Failed to hash password");

    sqlx::query("INSERT INTO users (username, password, role) VALUES ($1, $2, 'instructor')")
        .bind(&username)
        .bind(&hashed)
        .execute(pool)
        .await
        .expect("Failed to seed instructor");

    (username, password)
}

/// Logs in and returns the bearer token.
pub async fn login(address: &str, username: &str, password: &str) -> String {
    let response: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    response["token"]
        .as_str()
        .expect("Token not found")
        .to_string()
}

/// Registers a student through the API and returns a bearer token.
pub async fn register_student(address: &str) -> String {
    let username = format!("stud_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    login(address, &username, "password123").await
}
