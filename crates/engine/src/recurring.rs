//! Recurring invoice templates.
//!
//! A template describes an invoice to be materialized on every cadence tick,
//! starting at `start_date` and stopping after `end_date`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{
    Cadence, EngineError, ResultEngine,
    money::{LineItemInput, format_money},
    recurring_items,
    util::{parse_uuid, stored_money},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurringTemplate {
    pub id: Uuid,
    pub account_id: String,
    pub client_id: String,
    pub bank_account_id: Option<String>,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Date of the next invoice to generate.
    pub next_generation_date: NaiveDate,
    pub active: bool,
    pub tax_rate: Decimal,
    pub notes: Option<String>,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<TemplateItem>,
}

impl RecurringTemplate {
    /// Whether the end date lies before `today`.
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end < today)
    }

    pub fn item_inputs(&self) -> Vec<LineItemInput> {
        self.items.iter().map(TemplateItem::as_input).collect()
    }
}

/// One line of a template, in display order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateItem {
    pub id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub position: i32,
}

impl TemplateItem {
    pub fn as_input(&self) -> LineItemInput {
        LineItemInput::new(
            self.description.clone(),
            format_money(self.quantity),
            format_money(self.unit_price),
        )
    }

    pub(crate) fn to_active_model(&self, template_id: Uuid) -> recurring_items::ActiveModel {
        recurring_items::ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            template_id: ActiveValue::Set(template_id.to_string()),
            description: ActiveValue::Set(self.description.clone()),
            quantity: ActiveValue::Set(format_money(self.quantity)),
            unit_price: ActiveValue::Set(format_money(self.unit_price)),
            position: ActiveValue::Set(self.position),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub client_id: String,
    pub bank_account_id: Option<String>,
    pub cadence: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub next_generation_date: Date,
    pub active: bool,
    pub tax_rate: String,
    pub notes: Option<String>,
    pub last_generated_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recurring_items::Entity")]
    Items,
}

impl Related<super::recurring_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringTemplate> for ActiveModel {
    fn from(template: &RecurringTemplate) -> Self {
        Self {
            id: ActiveValue::Set(template.id.to_string()),
            account_id: ActiveValue::Set(template.account_id.clone()),
            client_id: ActiveValue::Set(template.client_id.clone()),
            bank_account_id: ActiveValue::Set(template.bank_account_id.clone()),
            cadence: ActiveValue::Set(template.cadence.as_str().to_string()),
            start_date: ActiveValue::Set(template.start_date),
            end_date: ActiveValue::Set(template.end_date),
            next_generation_date: ActiveValue::Set(template.next_generation_date),
            active: ActiveValue::Set(template.active),
            tax_rate: ActiveValue::Set(format_money(template.tax_rate)),
            notes: ActiveValue::Set(template.notes.clone()),
            last_generated_at: ActiveValue::Set(template.last_generated_at),
            created_at: ActiveValue::Set(template.created_at),
            updated_at: ActiveValue::Set(template.updated_at),
        }
    }
}

impl TryFrom<(Model, Vec<recurring_items::Model>)> for RecurringTemplate {
    type Error = EngineError;

    fn try_from((model, rows): (Model, Vec<recurring_items::Model>)) -> ResultEngine<Self> {
        let mut items = rows
            .into_iter()
            .map(TemplateItem::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        items.sort_by_key(|item| item.position);

        Ok(Self {
            id: parse_uuid(&model.id, "recurring template")?,
            cadence: Cadence::try_from(model.cadence.as_str())?,
            tax_rate: stored_money(&model.tax_rate, "tax rate")?,
            account_id: model.account_id,
            client_id: model.client_id,
            bank_account_id: model.bank_account_id,
            start_date: model.start_date,
            end_date: model.end_date,
            next_generation_date: model.next_generation_date,
            active: model.active,
            notes: model.notes,
            last_generated_at: model.last_generated_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            items,
        })
    }
}

impl TryFrom<recurring_items::Model> for TemplateItem {
    type Error = EngineError;

    fn try_from(model: recurring_items::Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "recurring item")?,
            quantity: stored_money(&model.quantity, "quantity")?,
            unit_price: stored_money(&model.unit_price, "unit price")?,
            description: model.description,
            position: model.position,
        })
    }
}
