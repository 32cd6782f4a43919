use crate::db::is_unique_violation;
use crate::orm::users;
use crate::session::get_argon2;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ActiveValue::Set, ConnectionTrait, DbErr};

/// The signed-in user as seen by pages.
#[derive(Clone, Debug)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<users::Model> for Profile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

impl Profile {
    /// Returns a user profile by id.
    pub async fn get_by_id<C>(db: &C, id: i32) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(users::Entity::find_by_id(id).one(db).await?.map(Profile::from))
    }
}

#[derive(Debug)]
pub enum RegisterResult {
    Created(Profile),
    NameTaken,
}

/// Creates an account with an Argon2 hash of `password`.
pub async fn register<C>(db: &C, name: &str, password: &str) -> Result<RegisterResult, DbErr>
where
    C: ConnectionTrait,
{
    let taken = users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Ok(RegisterResult::NameTaken);
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = get_argon2()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?
        .to_string();

    let inserted = users::ActiveModel {
        name: Set(name.to_owned()),
        password: Set(hash),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(user) => {
            log::info!("Registered user {} ({})", user.id, user.name);
            Ok(RegisterResult::Created(user.into()))
        }
        Err(e) if is_unique_violation(&e) => Ok(RegisterResult::NameTaken),
        Err(e) => Err(e),
    }
}

/// Returns the user when `name` exists and `password` matches.
pub async fn verify_credentials<C>(
    db: &C,
    name: &str,
    password: &str,
) -> Result<Option<Profile>, DbErr>
where
    C: ConnectionTrait,
{
    let user = match users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .one(db)
        .await?
    {
        Some(user) => user,
        None => return Ok(None),
    };

    let parsed_hash = match PasswordHash::new(&user.password) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("Stored password hash for user {} is unreadable: {}", user.id, e);
            return Ok(None);
        }
    };

    if get_argon2()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(None);
    }

    Ok(Some(user.into()))
}
