//! One ballot: a user's choice of a single option in a poll.
//!
//! A user votes at most once per poll. The unique index on
//! (poll_id, user_id) is created in `crate::db::create_schema`, and the
//! voting engine checks that `option_id` belongs to `poll_id` before insert.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "poll_votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub poll_id: i32,
    /// The chosen option.
    pub option_id: i32,
    pub user_id: i32,
    /// When the ballot was cast, UTC.
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::polls::Entity",
        from = "Column::PollId",
        to = "super::polls::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Poll,
    #[sea_orm(
        belongs_to = "super::poll_options::Entity",
        from = "Column::OptionId",
        to = "super::poll_options::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ChosenOption,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Voter,
}

impl Related<super::polls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
