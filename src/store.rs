use chrono::Utc;
use sqlx::SqlitePool;

use crate::entities::{Favorite, NewUser, User};

/// Durable `(user, pokemon)` favorite links.
#[derive(Debug, Clone)]
pub struct FavoriteStore {
    pool: SqlitePool,
}

impl FavoriteStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Favorited pokemon ids of `user_id`, oldest first.
    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT pokemon_id FROM favorites WHERE user_id = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn create(&self, user_id: i64, pokemon_id: i64) -> Result<Favorite, sqlx::Error> {
        let id = sqlx::query(
            "INSERT INTO favorites (user_id, pokemon_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(pokemon_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        sqlx::query_as::<_, Favorite>("SELECT * FROM favorites WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    /// Inserts every id in one transaction; pairs that already exist are skipped.
    /// Returns the number of rows written.
    pub async fn bulk_create(&self, user_id: i64, pokemon_ids: &[i64]) -> Result<u64, sqlx::Error> {
        let created_at = Utc::now();
        let mut trans = self.pool.begin().await?;
        let mut rows_affected = 0;

        for &pokemon_id in pokemon_ids {
            rows_affected += sqlx::query(
                "INSERT INTO favorites (user_id, pokemon_id, created_at) VALUES (?, ?, ?)
                ON CONFLICT (user_id, pokemon_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(pokemon_id)
            .bind(created_at)
            .execute(&mut trans)
            .await?
            .rows_affected();
        }

        trans.commit().await?;
        Ok(rows_affected)
    }

    pub async fn destroy(&self, user_id: i64, pokemon_id: i64) -> Result<u64, sqlx::Error> {
        Ok(
            sqlx::query("DELETE FROM favorites WHERE user_id = ? AND pokemon_id = ?")
                .bind(user_id)
                .bind(pokemon_id)
                .execute(&self.pool)
                .await?
                .rows_affected(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (name, email, password, mobile, created_at, last_updated)
            VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.mobile)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// True when another account already uses `email` or, if given, `mobile`.
    pub async fn exists(&self, email: &str, mobile: Option<&str>) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE email = ? OR (? IS NOT NULL AND mobile = ?)",
        )
        .bind(email)
        .bind(mobile)
        .bind(mobile)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}
