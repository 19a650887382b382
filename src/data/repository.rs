use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::{Sqlite, Transaction};

use super::model::{LegalQuery, LegalQueryChanges, Profile, ProfileFields, User, UserChanges};
use crate::ai::advisor::Category;
use crate::error::{AppError, AppResult};

/// Maps a unique-constraint failure on `users` to the matching duplicate error.
fn user_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if db_err.message().contains("users.email") {
                return AppError::DuplicateEmail;
            }
            return AppError::DuplicateUsername;
        }
    }
    AppError::Database(err)
}

#[derive(Clone)]
pub struct UserRepository {
    pub pool: Arc<SqlitePool>,
}

impl UserRepository {
    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
    }

    pub async fn list(&self, skip: u32, limit: u32) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(skip as i64)
            .fetch_all(&*self.pool)
            .await
    }

    /// Inserts a new active user, rejecting a taken username before a taken email.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> AppResult<User> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        if taken(&mut tx, "username", username, None).await? {
            return Err(AppError::DuplicateUsername);
        }
        if taken(&mut tx, "email", email, None).await? {
            return Err(AppError::DuplicateEmail);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, hashed_password, is_active, created_at)
            VALUES (?, ?, ?, 1, ?) RETURNING *;
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(user_conflict)?;

        tx.commit().await?;

        Ok(user)
    }

    /// Applies `changes` to user `id`, re-checking uniqueness of a new
    /// username or email against every other user.
    pub async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        let Some(mut user) = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(username) = &changes.username {
            if taken(&mut tx, "username", username, Some(id)).await? {
                return Err(AppError::Validation("Username already in use".to_string()));
            }
        }
        if let Some(email) = &changes.email {
            if taken(&mut tx, "email", email, Some(id)).await? {
                return Err(AppError::Validation("Email already in use".to_string()));
            }
        }

        user.apply(changes);
        user.updated_at = Some(Utc::now());

        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, hashed_password = ?, updated_at = ?
            WHERE id = ?;
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(user_conflict)?;

        tx.commit().await?;

        Ok(Some(user))
    }

    /// Deletes user `id`; profile and legal queries go with it.
    pub async fn delete(&self, id: i64) -> sqlx::Result<Option<User>> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if user.is_some() {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(user)
    }
}

async fn taken(
    conn: &mut SqliteConnection,
    column: &str,
    value: &str,
    except_id: Option<i64>,
) -> sqlx::Result<bool> {
    // `column` is always one of our own literals
    let sql = format!("SELECT COUNT(*) FROM users WHERE {column} = ? AND id != ?");
    let count = sqlx::query_scalar::<_, i64>(&sql)
        .bind(value)
        .bind(except_id.unwrap_or(-1))
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

#[derive(Clone)]
pub struct ProfileRepository {
    pub pool: Arc<SqlitePool>,
}

impl ProfileRepository {
    pub async fn find_by_user(&self, user_id: i64) -> sqlx::Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await
    }

    /// Creates the profile for `user_id`, or returns `None` if one already exists.
    pub async fn create(&self, user_id: i64, fields: ProfileFields) -> sqlx::Result<Option<Profile>> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let profile = insert_profile(&mut tx, user_id, fields).await?;
        tx.commit().await?;

        Ok(Some(profile))
    }

    /// Patches the existing profile or creates one from the supplied fields.
    pub async fn upsert(&self, user_id: i64, fields: ProfileFields) -> sqlx::Result<Profile> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let profile = match existing {
            Some(mut profile) => {
                profile.apply(fields);
                profile.updated_at = Some(Utc::now());
                sqlx::query(
                    r#"
                    UPDATE profiles
                    SET full_name = ?, bio = ?, avatar = ?, phone = ?, address = ?,
                        city = ?, state = ?, country = ?, postal_code = ?, updated_at = ?
                    WHERE id = ?;
                    "#,
                )
                .bind(&profile.full_name)
                .bind(&profile.bio)
                .bind(&profile.avatar)
                .bind(&profile.phone)
                .bind(&profile.address)
                .bind(&profile.city)
                .bind(&profile.state)
                .bind(&profile.country)
                .bind(&profile.postal_code)
                .bind(profile.updated_at)
                .bind(profile.id)
                .execute(&mut *tx)
                .await?;
                profile
            }
            None => insert_profile(&mut tx, user_id, fields).await?,
        };

        tx.commit().await?;

        Ok(profile)
    }
}

async fn insert_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
    fields: ProfileFields,
) -> sqlx::Result<Profile> {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles
            (user_id, full_name, bio, avatar, phone, address, city, state, country, postal_code, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(fields.full_name.flatten())
    .bind(fields.bio.flatten())
    .bind(fields.avatar.flatten())
    .bind(fields.phone.flatten())
    .bind(fields.address.flatten())
    .bind(fields.city.flatten())
    .bind(fields.state.flatten())
    .bind(fields.country.flatten())
    .bind(fields.postal_code.flatten())
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

#[derive(Clone)]
pub struct LegalQueryRepository {
    pub pool: Arc<SqlitePool>,
}

impl LegalQueryRepository {
    pub async fn create(
        &self,
        user_id: i64,
        query: &str,
        response: &str,
        category: Category,
    ) -> sqlx::Result<LegalQuery> {
        sqlx::query_as::<_, LegalQuery>(
            r#"
            INSERT INTO legal_queries (user_id, query, response, category, is_saved, created_at)
            VALUES (?, ?, ?, ?, 0, ?) RETURNING *;
            "#,
        )
        .bind(user_id)
        .bind(query)
        .bind(response)
        .bind(category)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
    }

    /// Newest first. With `saved_only`, only pinned records are returned.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        saved_only: bool,
        skip: u32,
        limit: u32,
    ) -> sqlx::Result<Vec<LegalQuery>> {
        sqlx::query_as::<_, LegalQuery>(
            r#"
            SELECT * FROM legal_queries
            WHERE user_id = ? AND (? = 0 OR is_saved = 1)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?;
            "#,
        )
        .bind(user_id)
        .bind(saved_only)
        .bind(limit as i64)
        .bind(skip as i64)
        .fetch_all(&*self.pool)
        .await
    }

    pub async fn find_owned(&self, id: i64, user_id: i64) -> sqlx::Result<Option<LegalQuery>> {
        sqlx::query_as::<_, LegalQuery>("SELECT * FROM legal_queries WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await
    }

    /// Loads the caller's record, lets `plan` compute the changes and writes
    /// them back, all in one transaction. `None` if the record is absent or
    /// owned by someone else.
    pub async fn update_owned<F, E>(
        &self,
        id: i64,
        user_id: i64,
        plan: F,
    ) -> Result<Option<LegalQuery>, E>
    where
        F: FnOnce(&LegalQuery) -> Result<LegalQueryChanges, E>,
        E: From<sqlx::Error>,
    {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        let Some(mut record) = sqlx::query_as::<_, LegalQuery>(
            "SELECT * FROM legal_queries WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let changes = plan(&record)?;
        record.apply(changes);
        record.updated_at = Some(Utc::now());

        sqlx::query(
            r#"
            UPDATE legal_queries
            SET query = ?, response = ?, category = ?, is_saved = ?, updated_at = ?
            WHERE id = ?;
            "#,
        )
        .bind(&record.query)
        .bind(&record.response)
        .bind(record.category)
        .bind(record.is_saved)
        .bind(record.updated_at)
        .bind(record.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(record))
    }

    /// Removes the caller's record and returns its last state.
    pub async fn delete_owned(&self, id: i64, user_id: i64) -> sqlx::Result<Option<LegalQuery>> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;

        let record = sqlx::query_as::<_, LegalQuery>(
            "SELECT * FROM legal_queries WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if record.is_some() {
            sqlx::query("DELETE FROM legal_queries WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(record)
    }
}
