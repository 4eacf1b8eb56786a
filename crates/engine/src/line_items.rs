//! Invoice line items.

use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    money::{LineItemInput, PricedLine, format_money},
    util::{parse_uuid, stored_money},
};

/// A priced line of an invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub position: i32,
}

impl LineItem {
    pub(crate) fn from_priced(line: &PricedLine, position: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            amount: line.amount,
            position: i32::try_from(position).unwrap_or(i32::MAX),
        }
    }

    /// The line as calculator input, used when only the tax rate changes.
    pub fn as_input(&self) -> LineItemInput {
        LineItemInput::new(
            self.description.clone(),
            format_money(self.quantity),
            format_money(self.unit_price),
        )
    }

    pub(crate) fn to_active_model(&self, invoice_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            invoice_id: ActiveValue::Set(invoice_id.to_string()),
            description: ActiveValue::Set(self.description.clone()),
            quantity: ActiveValue::Set(format_money(self.quantity)),
            unit_price: ActiveValue::Set(format_money(self.unit_price)),
            amount: ActiveValue::Set(format_money(self.amount)),
            position: ActiveValue::Set(self.position),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Invoices,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LineItem {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "line item")?,
            description: model.description,
            quantity: stored_money(&model.quantity, "quantity")?,
            unit_price: stored_money(&model.unit_price, "unit price")?,
            amount: stored_money(&model.amount, "amount")?,
            position: model.position,
        })
    }
}
