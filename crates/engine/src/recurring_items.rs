//! Line items of a recurring template (storage only).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_invoice_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub template_id: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recurring::Entity",
        from = "Column::TemplateId",
        to = "super::recurring::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Templates,
}

impl Related<super::recurring::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Templates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
