//! Order database entity for SeaORM.
//!
//! Line items are not stored; they only travel with the create payload.

use sea_orm::entity::prelude::*;

use crate::domain::Order;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity (without line items)
impl From<Model> for Order {
    fn from(model: Model) -> Self {
        Order {
            id: model.id,
            account_id: model.account_id,
            amount: model.amount,
            status: model.status.parse().unwrap_or_default(),
            created_at: model.created_at,
            items: Vec::new(),
        }
    }
}
