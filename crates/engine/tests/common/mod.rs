#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, InvoiceEmail, InvoiceNotifier, LineItemInput, NotifyError};
use migration::MigratorTrait;

pub const ACCOUNT: &str = "acme";
pub const CLIENT: &str = "client-1";
pub const BANK: &str = "bank-1";
pub const OTHER_ACCOUNT: &str = "globex";
pub const OTHER_CLIENT: &str = "client-9";

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    seed(&db).await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
}

async fn seed(db: &DatabaseConnection) {
    for (id, name) in [(ACCOUNT, "Acme Studio"), (OTHER_ACCOUNT, "Globex")] {
        exec(
            db,
            "INSERT INTO accounts (id, name, email) VALUES (?, ?, ?)",
            vec![id.into(), name.into(), format!("billing@{id}.test").into()],
        )
        .await;
    }
    for (id, account_id, name) in [
        (CLIENT, ACCOUNT, "Wayne Enterprises"),
        ("client-2", ACCOUNT, "Stark Industries"),
        (OTHER_CLIENT, OTHER_ACCOUNT, "Initech"),
    ] {
        exec(
            db,
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
    exec(
        db,
        "INSERT INTO bank_accounts (id, account_id, name) VALUES (?, ?, ?)",
        vec![BANK.into(), ACCOUNT.into(), "Main account".into()],
    )
    .await;
}

pub fn item(description: &str, quantity: &str, unit_price: &str) -> LineItemInput {
    LineItemInput::new(description, quantity, unit_price)
}

/// Notifier that records every email and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<InvoiceEmail>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<InvoiceEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }
}

#[async_trait]
impl InvoiceNotifier for RecordingNotifier {
    async fn send_invoice_email(&self, email: &InvoiceEmail) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError("smtp relay unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
