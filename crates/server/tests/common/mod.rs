#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::Value;
use tower::ServiceExt;

use engine::{Engine, InvoiceEmail, InvoiceNotifier, NotifyError};
use migration::MigratorTrait;

pub const ACCOUNT: &str = "acme";
pub const OTHER_ACCOUNT: &str = "globex";

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<InvoiceEmail>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl InvoiceNotifier for RecordingNotifier {
    async fn send_invoice_email(&self, email: &InvoiceEmail) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
}

pub async fn test_app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    for (id, name) in [(ACCOUNT, "Acme Studio"), (OTHER_ACCOUNT, "Globex")] {
        exec(
            &db,
            "INSERT INTO accounts (id, name, email) VALUES (?, ?, ?)",
            vec![id.into(), name.into(), format!("billing@{id}.test").into()],
        )
        .await;
    }
    for (id, account_id, name) in [
        ("client-1", ACCOUNT, "Wayne Enterprises"),
        ("client-9", OTHER_ACCOUNT, "Initech"),
    ] {
        exec(
            &db,
            "INSERT INTO clients (id, account_id, name, email) VALUES (?, ?, ?, ?)",
            vec![
                id.into(),
                account_id.into(),
                name.into(),
                format!("{id}@clients.test").into(),
            ],
        )
        .await;
    }

    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let router = server::app(engine, notifier.clone());

    TestApp {
        router,
        db,
        notifier,
    }
}

impl TestApp {
    /// Send a request as `account` (or anonymously) and return status and
    /// JSON body (`Null` when empty or not JSON).
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        account: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(account) = account {
            builder = builder.header("x-account-id", account);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn as_acme(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(method, uri, Some(ACCOUNT), body).await
    }
}
