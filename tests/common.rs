#![allow(dead_code)]
use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use users_api::api::{self, MgmtState};
use users_api::config::{
    Config, CorsConfig, DatabaseConfig, HealthConfig, LogFormat, ServerConfig, TelemetryConfig,
};
use users_api::domain::user::{User, UserDocument, UserId};
use users_api::error::{AppError, Result};
use users_api::services::health_service::HealthService;
use users_api::services::user_service::UserService;
use users_api::storage::{self, MongoUserRepository, UserRepository};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("users_api=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// A `UserRepository` backed by a vector, counting batch inserts.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    docs: Mutex<Vec<Document>>,
    insert_many_calls: AtomicUsize,
    offline: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn documents(&self) -> Vec<Document> {
        self.docs.lock().unwrap().clone()
    }

    pub fn insert_many_calls(&self) -> usize {
        self.insert_many_calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) { Err(AppError::Internal) } else { Ok(()) }
    }

    fn store(&self, user: &User) -> Result<ObjectId> {
        let id = ObjectId::new();
        let mut doc = user.to_document()?;
        doc.insert("_id", id);
        self.docs.lock().unwrap().push(doc);
        Ok(id)
    }
}

/// Applies a `$set` entry, following dot-notation into nested documents.
fn set_path(doc: &mut Document, path: &str, value: Bson) {
    let Some((head, rest)) = path.split_once('.') else {
        doc.insert(path, value);
        return;
    };
    if !matches!(doc.get(head), Some(Bson::Document(_))) {
        doc.insert(head, Document::new());
    }
    if let Some(Bson::Document(inner)) = doc.get_mut(head) {
        set_path(inner, rest, value);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_all(&self) -> Result<Vec<UserDocument>> {
        self.check_online()?;
        Ok(self.documents().into_iter().map(UserDocument::from).collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>> {
        self.check_online()?;
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .iter()
            .find(|doc| doc.get_object_id("_id").ok() == Some(id.as_object_id()))
            .cloned()
            .map(UserDocument::from))
    }

    async fn insert(&self, user: &User) -> Result<UserId> {
        self.check_online()?;
        self.store(user).map(UserId::new)
    }

    async fn update_fields(&self, id: UserId, fields: Document) -> Result<Option<UserDocument>> {
        self.check_online()?;
        let mut docs = self.docs.lock().unwrap();
        let Some(doc) = docs.iter_mut().find(|doc| doc.get_object_id("_id").ok() == Some(id.as_object_id())) else {
            return Ok(None);
        };
        for (key, value) in fields {
            set_path(doc, &key, value);
        }
        Ok(Some(UserDocument::from(doc.clone())))
    }

    async fn delete_by_id(&self, id: UserId) -> Result<bool> {
        self.check_online()?;
        let mut docs = self.docs.lock().unwrap();
        let before = docs.len();
        docs.retain(|doc| doc.get_object_id("_id").ok() != Some(id.as_object_id()));
        Ok(docs.len() < before)
    }

    async fn delete_all(&self) -> Result<u64> {
        self.check_online()?;
        let mut docs = self.docs.lock().unwrap();
        let count = docs.len() as u64;
        docs.clear();
        Ok(count)
    }

    async fn insert_many(&self, users: &[User]) -> Result<usize> {
        self.check_online()?;
        self.insert_many_calls.fetch_add(1, Ordering::SeqCst);
        for user in users {
            self.store(user)?;
        }
        Ok(users.len())
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

/// A `MongoUserRepository` on a collection of its own, dropped by [`MongoTestStore::cleanup`].
pub struct MongoTestStore {
    pub repo: MongoUserRepository,
    client: mongodb::Client,
    database: String,
    collection: String,
}

impl MongoTestStore {
    pub async fn cleanup(self) {
        self.client.database(&self.database).collection::<Document>(&self.collection).drop().await.unwrap();
        self.client.shutdown().await;
    }
}

pub async fn get_test_store() -> MongoTestStore {
    setup_tracing();
    let url = std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017/user_db_test".to_string());
    let config = DatabaseConfig { url, name: None, collection: format!("users_{}", ObjectId::new().to_hex()) };

    let client = storage::init_client(&config).await.expect("Failed to build MongoDB client. Is MONGO_URI valid?");
    let database = config.database_name();
    let repo = MongoUserRepository::new(&client, &database, &config.collection);
    repo.ping().await.expect("Failed to reach MongoDB. Is it running?");

    MongoTestStore { repo, client, database, collection: config.collection }
}

pub fn get_test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: "mongodb://localhost:27017/user_db_test".to_string(),
            name: None,
            collection: "users".to_string(),
        },
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 0, mgmt_port: 0, shutdown_timeout_secs: 1 },
        cors: CorsConfig { allowed_origin: axum::http::HeaderValue::from_static("http://localhost:5173") },
        health: HealthConfig { db_timeout_ms: 500 },
        telemetry: TelemetryConfig { log_format: LogFormat::Text, otlp_endpoint: None },
    }
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub repo: Arc<InMemoryUserRepository>,
    pub config: Config,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        setup_tracing();

        let repo = InMemoryUserRepository::new();
        let dyn_repo: Arc<dyn UserRepository> = repo.clone();

        let app_router = api::app_router(&config, UserService::new(Arc::clone(&dyn_repo)));
        let mgmt_app = api::mgmt_router(MgmtState {
            health_service: HealthService::new(dyn_repo, config.health.clone()),
        });

        let api_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", api_listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(api_listener, app_router).await.unwrap();
        });
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_app).await.unwrap();
        });

        Self { server_url, mgmt_url, client: reqwest::Client::new(), repo, config }
    }

    /// Creates a user through the API and returns its identifier.
    pub async fn create_user(&self, username: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/api/users", self.server_url))
            .json(&serde_json::json!({
                "username": username,
                "password": "password12345",
                "roles": ["tester"],
                "preferences": { "timezone": "Europe/Paris" },
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

        let body: serde_json::Value = resp.json().await.unwrap();
        body["_id"].as_str().unwrap().to_string()
    }
}
