//! SeaORM Entity for members table

use sea_orm::entity::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Role a user holds within a single club.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(15))")]
#[derive(Default)]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "PRESIDENT")]
    President,
    #[sea_orm(string_value = "VICE_PRESIDENT")]
    VicePresident,
    #[sea_orm(string_value = "SECRETARY")]
    Secretary,
    #[sea_orm(string_value = "MEMBER")]
    #[default]
    Member,
}

impl Role {
    /// Every role, in the order they are offered in the role editor.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::President,
        Role::VicePresident,
        Role::Secretary,
        Role::Member,
    ];

    /// Stored and submitted form of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::President => "PRESIDENT",
            Role::VicePresident => "VICE_PRESIDENT",
            Role::Secretary => "SECRETARY",
            Role::Member => "MEMBER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::President => "President",
            Role::VicePresident => "Vice President",
            Role::Secretary => "Secretary",
            Role::Member => "Member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = crate::club::ClubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|role| role.as_str() == s)
            .copied()
            .ok_or_else(|| crate::club::ClubError::InvalidRole(s.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub club_id: i32,
    pub role: Role,
    pub joined_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::clubs::Entity",
        from = "Column::ClubId",
        to = "super::clubs::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Club,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::clubs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
