//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::User;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password_hash: String,
    /// Object-store key of the profile image
    pub profile_path: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            username: model.username,
            password_hash: model.password_hash,
            profile_path: model.profile_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Every column set, for inserts and full-record updates
impl From<User> for ActiveModel {
    fn from(user: User) -> Self {
        ActiveModel {
            username: Set(user.username),
            password_hash: Set(user.password_hash),
            profile_path: Set(user.profile_path),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
    }
}
