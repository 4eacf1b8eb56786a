//! Per-account invoice numbering.
//!
//! The counter lives in `invoice_sequences` and is bumped with a single
//! upsert-and-return statement, so concurrent writers serialize on the row
//! inside the database and never read a stale value.

use sea_orm::{ConnectionTrait, DbBackend, Statement, TransactionTrait};

use crate::{EngineError, ResultEngine};

use super::{Engine, with_tx};

const SQLITE_NEXT_VALUE: &str = "INSERT INTO invoice_sequences (account_id, last_value) \
     VALUES (?, 1) \
     ON CONFLICT (account_id) DO UPDATE SET last_value = invoice_sequences.last_value + 1 \
     RETURNING last_value";

const POSTGRES_NEXT_VALUE: &str = "INSERT INTO invoice_sequences (account_id, last_value) \
     VALUES ($1, 1) \
     ON CONFLICT (account_id) DO UPDATE SET last_value = invoice_sequences.last_value + 1 \
     RETURNING last_value";

impl Engine {
    /// Issue the next invoice number of an account (`INV-000124`).
    ///
    /// Runs in its own transaction. Invoice creation uses the same primitive
    /// inside its own transaction, so a failed create does not burn a number.
    pub async fn next_invoice_number(&self, account_id: &str) -> ResultEngine<String> {
        with_tx!(self, |db_tx| {
            self.next_number_in(&db_tx, account_id).await
        })
    }

    pub(super) async fn next_number_in<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
    ) -> ResultEngine<String> {
        let backend = db.get_database_backend();
        let sql = match backend {
            DbBackend::Sqlite => SQLITE_NEXT_VALUE,
            DbBackend::Postgres => POSTGRES_NEXT_VALUE,
            _ => {
                return Err(EngineError::SequenceUnavailable(format!(
                    "{backend:?} has no atomic upsert-and-return"
                )));
            }
        };

        let row = db
            .query_one(Statement::from_sql_and_values(
                backend,
                sql,
                [account_id.into()],
            ))
            .await
            .map_err(|err| EngineError::SequenceUnavailable(err.to_string()))?
            .ok_or_else(|| {
                EngineError::SequenceUnavailable("sequence returned no value".to_string())
            })?;
        let value: i64 = row
            .try_get("", "last_value")
            .map_err(|err| EngineError::SequenceUnavailable(err.to_string()))?;

        tracing::debug!(account_id, value, "issued invoice sequence value");
        Ok(self.policy.format_number(value))
    }
}
