use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Account, EngineError, Invoice, RecurringTemplate, ResultEngine, accounts, bank_accounts,
    clients, invoices, line_items, recurring, recurring_items,
};

use super::Engine;

/// Generates a `require_*` method that loads a row only if it belongs to the
/// given account.
macro_rules! impl_owned_lookup {
    ($require_fn:ident, $entity:ident, $err_msg:literal) => {
        pub(super) async fn $require_fn<C: ConnectionTrait>(
            &self,
            db: &C,
            account_id: &str,
            target_id: &str,
        ) -> ResultEngine<$entity::Model> {
            $entity::Entity::find_by_id(target_id.to_string())
                .filter($entity::Column::AccountId.eq(account_id.to_string()))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_owned_lookup!(require_client, clients, "client not exists");
    impl_owned_lookup!(require_bank_account, bank_accounts, "bank account not exists");
    impl_owned_lookup!(require_invoice_model, invoices, "invoice not exists");
    impl_owned_lookup!(require_template_model, recurring, "recurring template not exists");

    /// Resolve an account by id.
    ///
    /// Used by the API to turn the caller identity into an account.
    pub async fn account(&self, account_id: &str) -> ResultEngine<Account> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.database)
            .await?
            .map(Account::from)
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    pub(super) async fn require_invoice<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        invoice_id: Uuid,
    ) -> ResultEngine<invoices::Model> {
        self.require_invoice_model(db, account_id, &invoice_id.to_string())
            .await
    }

    pub(super) async fn require_template<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        template_id: Uuid,
    ) -> ResultEngine<recurring::Model> {
        self.require_template_model(db, account_id, &template_id.to_string())
            .await
    }

    /// Verify the optional bank account belongs to the account.
    pub(super) async fn check_bank_account<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        bank_account_id: Option<&str>,
    ) -> ResultEngine<()> {
        if let Some(bank_account_id) = bank_account_id {
            self.require_bank_account(db, account_id, bank_account_id)
                .await?;
        }
        Ok(())
    }

    /// Attach the line items to an invoice row.
    pub(super) async fn load_invoice<C: ConnectionTrait>(
        &self,
        db: &C,
        model: invoices::Model,
    ) -> ResultEngine<Invoice> {
        let lines = line_items::Entity::find()
            .filter(line_items::Column::InvoiceId.eq(model.id.clone()))
            .order_by_asc(line_items::Column::Position)
            .all(db)
            .await?;
        Invoice::try_from((model, lines))
    }

    /// Attach the items to a template row.
    pub(super) async fn load_template<C: ConnectionTrait>(
        &self,
        db: &C,
        model: recurring::Model,
    ) -> ResultEngine<RecurringTemplate> {
        let items = recurring_items::Entity::find()
            .filter(recurring_items::Column::TemplateId.eq(model.id.clone()))
            .order_by_asc(recurring_items::Column::Position)
            .all(db)
            .await?;
        RecurringTemplate::try_from((model, items))
    }
}
