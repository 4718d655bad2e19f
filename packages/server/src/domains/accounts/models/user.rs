//! User model - credit balance and verified-site set.
//!
//! The credit balance is the only field mutated by concurrent requests
//! from the same user, so every debit and credit goes through a single
//! atomic conditional UPDATE. A separate read-then-write pair would let
//! two concurrent submissions both pass the balance check before either
//! writes back.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Outcome of an atomic conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The debit succeeded; `remaining` is the balance after the decrement.
    Charged { remaining: i64 },
    /// The balance was below the requested amount; nothing was charged.
    Insufficient { available: i64 },
}

/// User - credit and authorization subject.
///
/// Created at first login by the auth collaborator; this core only reads
/// the row and mutates `credits` and `verified_sites`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub credits: i64,
    pub verified_sites: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Find user by ID (optional).
    pub async fn find_by_id_optional(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Current credit balance.
    pub async fn balance(id: Uuid, pool: &PgPool) -> Result<i64> {
        let credits = sqlx::query_scalar::<_, i64>("SELECT credits FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", id))?;
        Ok(credits)
    }

    /// Atomically debit `amount` credits if the balance covers it.
    ///
    /// The conditional UPDATE serializes concurrent debits at the storage
    /// layer; the balance can never go below zero.
    pub async fn try_debit(id: Uuid, amount: i64, pool: &PgPool) -> Result<DebitOutcome> {
        let remaining = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET credits = credits - $2, updated_at = NOW()
            WHERE id = $1 AND credits >= $2
            RETURNING credits
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(pool)
        .await?;

        match remaining {
            Some(remaining) => Ok(DebitOutcome::Charged { remaining }),
            None => {
                let available = Self::balance(id, pool).await?;
                Ok(DebitOutcome::Insufficient { available })
            }
        }
    }

    /// Credit `amount` unless the balance is already at or above `ceiling`.
    ///
    /// Returns the new balance, or `None` when the ceiling refused the
    /// credit. The guard lives in the same UPDATE as the increment.
    pub async fn credit(id: Uuid, amount: i64, ceiling: i64, pool: &PgPool) -> Result<Option<i64>> {
        let credits = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET credits = credits + $2, updated_at = NOW()
            WHERE id = $1 AND credits < $3
            RETURNING credits
            "#,
        )
        .bind(id)
        .bind(amount)
        .bind(ceiling)
        .fetch_optional(pool)
        .await?;
        Ok(credits)
    }

    /// Set-union new verified-site tokens into the stored set.
    pub async fn add_verified_sites(id: Uuid, sites: &[String], pool: &PgPool) -> Result<Self> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            UPDATE users
            SET verified_sites = ARRAY(
                    SELECT DISTINCT site
                    FROM unnest(verified_sites || $2::text[]) AS site
                    ORDER BY site
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(sites)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }
}
