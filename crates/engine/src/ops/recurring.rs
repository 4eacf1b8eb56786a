//! Recurring invoice templates and the generation job.
//!
//! A generation claims the template by moving `next_generation_date`
//! forward with a compare-and-swap on its previous value, in the same
//! transaction that numbers and inserts the invoice. Two workers racing on
//! one template cannot both win the swap, and a failed insert rolls the
//! date back.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    BulkItem, BulkReport, CreateTemplateCmd, EngineError, GenerationReport, Invoice, InvoiceMeta,
    MAX_BULK_ITEMS, RecurringTemplate, ResultEngine, TemplateItem, UpdateTemplateCmd,
    money::{self, LineItemInput, Totals},
    recurring, recurring_items,
    util::{normalize_optional_text, normalize_required_id},
};

use super::{Engine, invoices::NewInvoice, with_tx};

enum GenerationOutcome {
    Generated(Box<Invoice>),
    Skipped,
}

fn template_items(totals: &Totals) -> Vec<TemplateItem> {
    totals
        .lines
        .iter()
        .enumerate()
        .map(|(position, line)| TemplateItem {
            id: Uuid::new_v4(),
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            position: i32::try_from(position).unwrap_or(i32::MAX),
        })
        .collect()
}

fn check_date_range(start_date: NaiveDate, end_date: Option<NaiveDate>) -> ResultEngine<()> {
    if let Some(end_date) = end_date
        && end_date < start_date
    {
        return Err(EngineError::Validation(format!(
            "end date {end_date} is before start date {start_date}"
        )));
    }
    Ok(())
}

/// Items and tax rate of a template must price cleanly on every run.
fn price_template(items: &[LineItemInput], tax_rate: &str) -> ResultEngine<Totals> {
    money::calculate_totals(items, tax_rate)
}

impl Engine {
    /// Create a recurring template. The first invoice is due on `start_date`.
    pub async fn create_template(&self, cmd: CreateTemplateCmd) -> ResultEngine<RecurringTemplate> {
        let now = Utc::now();
        let account_id = normalize_required_id(&cmd.account_id, "account id")?;
        let client_id = normalize_required_id(&cmd.client_id, "client id")?;
        check_date_range(cmd.start_date, cmd.end_date)?;
        let totals = price_template(&cmd.items, &cmd.tax_rate)?;

        let template = RecurringTemplate {
            id: Uuid::new_v4(),
            account_id,
            client_id,
            bank_account_id: normalize_optional_text(cmd.bank_account_id.as_deref()),
            cadence: cmd.cadence,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            next_generation_date: cmd.start_date,
            active: true,
            tax_rate: totals.tax_rate,
            notes: normalize_optional_text(cmd.notes.as_deref()),
            last_generated_at: None,
            created_at: now,
            updated_at: now,
            items: template_items(&totals),
        };

        let template = with_tx!(self, |db_tx| {
            self.require_client(&db_tx, &template.account_id, &template.client_id)
                .await?;
            self.check_bank_account(
                &db_tx,
                &template.account_id,
                template.bank_account_id.as_deref(),
            )
            .await?;
            recurring::ActiveModel::from(&template).insert(&db_tx).await?;
            self.insert_template_items(&db_tx, &template).await?;
            Ok::<_, EngineError>(template)
        })?;

        tracing::info!(
            account_id = %template.account_id,
            template_id = %template.id,
            cadence = template.cadence.as_str(),
            "recurring template created"
        );
        Ok(template)
    }

    /// Create up to [`MAX_BULK_ITEMS`] templates, each in its own transaction.
    pub async fn bulk_create_templates(
        &self,
        cmds: Vec<CreateTemplateCmd>,
    ) -> ResultEngine<BulkReport<RecurringTemplate>> {
        if cmds.is_empty() {
            return Err(EngineError::Validation(
                "at least one recurring template is required".to_string(),
            ));
        }
        if cmds.len() > MAX_BULK_ITEMS {
            return Err(EngineError::Validation(format!(
                "at most {MAX_BULK_ITEMS} recurring templates per batch, got {}",
                cmds.len()
            )));
        }

        let mut results = Vec::with_capacity(cmds.len());
        for (index, cmd) in cmds.into_iter().enumerate() {
            let result = self.create_template(cmd).await;
            if let Err(err) = &result {
                tracing::warn!(index, "bulk template create failed: {err}");
            }
            results.push(BulkItem { index, result });
        }
        Ok(BulkReport { results })
    }

    pub async fn template(
        &self,
        account_id: &str,
        template_id: Uuid,
    ) -> ResultEngine<RecurringTemplate> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_template(&db_tx, account_id, template_id)
                .await?;
            self.load_template(&db_tx, model).await
        })
    }

    /// Templates of an account ordered by next generation date.
    pub async fn list_templates(&self, account_id: &str) -> ResultEngine<Vec<RecurringTemplate>> {
        with_tx!(self, |db_tx| {
            let models = recurring::Entity::find()
                .filter(recurring::Column::AccountId.eq(account_id))
                .order_by_asc(recurring::Column::NextGenerationDate)
                .all(&db_tx)
                .await?;
            let mut templates = Vec::with_capacity(models.len());
            for model in models {
                templates.push(self.load_template(&db_tx, model).await?);
            }
            Ok(templates)
        })
    }

    /// Apply a partial update. New items replace the old ones wholesale and a
    /// new start date resets the next generation date.
    pub async fn update_template(&self, cmd: UpdateTemplateCmd) -> ResultEngine<RecurringTemplate> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self
                .require_template(&db_tx, &cmd.account_id, cmd.template_id)
                .await?;
            let mut template = self.load_template(&db_tx, model).await?;

            if let Some(client_id) = &cmd.client_id {
                let client_id = normalize_required_id(client_id, "client id")?;
                self.require_client(&db_tx, &template.account_id, &client_id)
                    .await?;
                template.client_id = client_id;
            }
            if let Some(bank_account_id) = &cmd.bank_account_id {
                let bank_account_id = normalize_optional_text(bank_account_id.as_deref());
                self.check_bank_account(&db_tx, &template.account_id, bank_account_id.as_deref())
                    .await?;
                template.bank_account_id = bank_account_id;
            }
            if let Some(cadence) = cmd.cadence {
                template.cadence = cadence;
            }
            if let Some(start_date) = cmd.start_date {
                template.start_date = start_date;
                template.next_generation_date = start_date;
            }
            if let Some(end_date) = cmd.end_date {
                template.end_date = end_date;
            }
            check_date_range(template.start_date, template.end_date)?;
            if let Some(notes) = &cmd.notes {
                template.notes = normalize_optional_text(notes.as_deref());
            }

            let replace_items = cmd.items.is_some();
            if replace_items || cmd.tax_rate.is_some() {
                let items = cmd
                    .items
                    .clone()
                    .unwrap_or_else(|| template.item_inputs());
                let tax_rate = cmd
                    .tax_rate
                    .clone()
                    .unwrap_or_else(|| money::format_money(template.tax_rate));
                let totals = price_template(&items, &tax_rate)?;
                template.tax_rate = totals.tax_rate;
                if replace_items {
                    template.items = template_items(&totals);
                }
            }
            template.updated_at = now;

            recurring::ActiveModel::from(&template).update(&db_tx).await?;
            if replace_items {
                recurring_items::Entity::delete_many()
                    .filter(recurring_items::Column::TemplateId.eq(template.id.to_string()))
                    .exec(&db_tx)
                    .await?;
                self.insert_template_items(&db_tx, &template).await?;
            }
            Ok(template)
        })
    }

    /// Delete a template and its items. Invoices generated from it stay.
    pub async fn delete_template(&self, account_id: &str, template_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_template(&db_tx, account_id, template_id)
                .await?;
            recurring_items::Entity::delete_many()
                .filter(recurring_items::Column::TemplateId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            recurring::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Stop generating from a template.
    pub async fn pause_template(
        &self,
        account_id: &str,
        template_id: Uuid,
    ) -> ResultEngine<RecurringTemplate> {
        self.set_template_active(account_id, template_id, false, None)
            .await
    }

    /// Generate from a template again. Fails once its end date has passed.
    pub async fn resume_template(
        &self,
        account_id: &str,
        template_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<RecurringTemplate> {
        self.set_template_active(account_id, template_id, true, Some(today))
            .await
    }

    async fn set_template_active(
        &self,
        account_id: &str,
        template_id: Uuid,
        active: bool,
        today: Option<NaiveDate>,
    ) -> ResultEngine<RecurringTemplate> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self
                .require_template(&db_tx, account_id, template_id)
                .await?;
            let mut template = self.load_template(&db_tx, model).await?;
            if let Some(today) = today
                && template.has_ended(today)
            {
                return Err(EngineError::TemplateEnded(format!(
                    "template {} ended on {}",
                    template.id,
                    template.end_date.unwrap_or(today)
                )));
            }

            template.active = active;
            template.updated_at = now;
            recurring::Entity::update_many()
                .col_expr(recurring::Column::Active, Expr::value(active))
                .col_expr(recurring::Column::UpdatedAt, Expr::value(now))
                .filter(recurring::Column::Id.eq(template.id.to_string()))
                .exec(&db_tx)
                .await?;
            tracing::info!(template_id = %template.id, active, "recurring template toggled");
            Ok(template)
        })
    }

    /// Generate one invoice for every template due on `today`.
    ///
    /// Each template gets at most one invoice per run, dated `today`; a
    /// template that fell behind catches up one cadence unit per run.
    pub async fn generate_due(&self, today: NaiveDate) -> ResultEngine<GenerationReport> {
        let deactivated = self.deactivate_ended(today).await?;
        let due = recurring::Entity::find()
            .filter(recurring::Column::Active.eq(true))
            .filter(recurring::Column::NextGenerationDate.lte(today))
            .filter(
                sea_orm::Condition::any()
                    .add(recurring::Column::EndDate.is_null())
                    .add(recurring::Column::EndDate.gte(today)),
            )
            .order_by_asc(recurring::Column::NextGenerationDate)
            .all(&self.database)
            .await?;

        let mut report = GenerationReport {
            processed: due.len(),
            deactivated,
            ..GenerationReport::default()
        };

        for model in due {
            let template_id = model.id.clone();
            let result = match self.load_template(&self.database, model).await {
                Ok(template) => self.generate(&template, today).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(GenerationOutcome::Generated(invoice)) => {
                    tracing::info!(
                        template_id = %template_id,
                        number = %invoice.number,
                        "recurring invoice generated"
                    );
                    report.generated += 1;
                }
                Ok(GenerationOutcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    tracing::error!(template_id = %template_id, "recurring generation failed: {err}");
                    report.errors += 1;
                    report
                        .error_messages
                        .push(format!("template {template_id}: {err}"));
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            generated = report.generated,
            skipped = report.skipped,
            deactivated = report.deactivated,
            errors = report.errors,
            "recurring generation finished"
        );
        Ok(report)
    }

    /// Generate the next invoice of a template right away.
    pub async fn generate_from_template(
        &self,
        account_id: &str,
        template_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<Invoice> {
        let template = self.template(account_id, template_id).await?;
        if !template.active {
            return Err(EngineError::TemplateInactive(format!(
                "template {} is paused",
                template.id
            )));
        }
        if template.has_ended(today) {
            return Err(EngineError::TemplateEnded(format!(
                "template {} ended on {}",
                template.id,
                template.end_date.unwrap_or(today)
            )));
        }

        match self.generate(&template, today).await? {
            GenerationOutcome::Generated(invoice) => Ok(*invoice),
            GenerationOutcome::Skipped => Err(EngineError::TemplateInactive(format!(
                "template {} changed while generating, retry",
                template.id
            ))),
        }
    }

    async fn generate(
        &self,
        template: &RecurringTemplate,
        today: NaiveDate,
    ) -> ResultEngine<GenerationOutcome> {
        let now = Utc::now();
        let previous = template.next_generation_date;
        let next = template.cadence.advance(previous, template.start_date)?;
        let still_active = template.end_date.is_none_or(|end| next <= end);
        let totals = price_template(&template.item_inputs(), &money::format_money(template.tax_rate))?;

        with_tx!(self, |db_tx| {
            if !self
                .advance_template(&db_tx, template, previous, next, still_active, now)
                .await?
            {
                return Ok(GenerationOutcome::Skipped);
            }

            let new_invoice = NewInvoice {
                account_id: template.account_id.clone(),
                client_id: template.client_id.clone(),
                bank_account_id: template.bank_account_id.clone(),
                recurring_template_id: Some(template.id),
                issue_date: today,
                scheduled_at: None,
                meta: InvoiceMeta {
                    notes: template.notes.clone(),
                    ..InvoiceMeta::default()
                },
                totals,
            };
            let invoice = self.insert_invoice(&db_tx, new_invoice, now).await?;
            if !still_active {
                tracing::info!(template_id = %template.id, "recurring template reached its end date");
            }
            Ok(GenerationOutcome::Generated(Box::new(invoice)))
        })
    }

    /// Turn off active templates whose end date passed before their next
    /// period came due.
    async fn deactivate_ended(&self, today: NaiveDate) -> ResultEngine<usize> {
        let ended = recurring::Entity::update_many()
            .col_expr(recurring::Column::Active, Expr::value(false))
            .col_expr(recurring::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(recurring::Column::Active.eq(true))
            .filter(recurring::Column::EndDate.lt(today))
            .exec(&self.database)
            .await?;
        if ended.rows_affected > 0 {
            tracing::info!(count = ended.rows_affected, "ended recurring templates deactivated");
        }
        Ok(ended.rows_affected as usize)
    }

    /// Compare-and-swap of the next generation date; false if the template
    /// was advanced or paused by someone else.
    async fn advance_template<C: ConnectionTrait>(
        &self,
        db: &C,
        template: &RecurringTemplate,
        previous: NaiveDate,
        next: NaiveDate,
        still_active: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        let advanced = recurring::Entity::update_many()
            .col_expr(recurring::Column::NextGenerationDate, Expr::value(next))
            .col_expr(recurring::Column::Active, Expr::value(still_active))
            .col_expr(recurring::Column::LastGeneratedAt, Expr::value(Some(now)))
            .col_expr(recurring::Column::UpdatedAt, Expr::value(now))
            .filter(recurring::Column::Id.eq(template.id.to_string()))
            .filter(recurring::Column::NextGenerationDate.eq(previous))
            .filter(recurring::Column::Active.eq(true))
            .exec(db)
            .await?;
        Ok(advanced.rows_affected == 1)
    }

    async fn insert_template_items<C: ConnectionTrait>(
        &self,
        db: &C,
        template: &RecurringTemplate,
    ) -> ResultEngine<()> {
        for item in &template.items {
            item.to_active_model(template.id).insert(db).await?;
        }
        Ok(())
    }
}
