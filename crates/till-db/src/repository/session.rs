//! # Cash Session Repository
//!
//! Rows for drawer sessions and their manual cash movements.
//!
//! The expected amount is only ever changed by a delta:
//! `expected_amount_cents = expected_amount_cents + ?`. Two sales committing
//! against the same drawer therefore both land, whatever order they run in.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashMovement, CashSession};

const SESSION_COLUMNS: &str = "id, terminal_id, user_id, status, opening_amount_cents, \
     expected_amount_cents, closing_amount_cents, difference_cents, opening_notes, \
     closing_notes, opened_at, closed_at, closed_by";

const MOVEMENT_COLUMNS: &str = "id, session_id, kind, amount_cents, reason, created_by, created_at";

/// Read access to cash sessions.
#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    pool: SqlitePool,
}

impl CashSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashSessionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        fetch_session(&self.pool, id).await
    }

    /// The OPEN session on a terminal, if any.
    pub async fn open_for_terminal(&self, terminal_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE terminal_id = ?1 AND status = 'OPEN'"
        );
        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(terminal_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// The OPEN session of an operator, on whatever terminal.
    pub async fn open_for_user(&self, user_id: &str) -> DbResult<Option<CashSession>> {
        fetch_open_for_user(&self.pool, user_id).await
    }

    /// Movements of a session, newest first.
    pub async fn movements(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        debug!(session_id = %session_id, "Listing cash movements");

        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements WHERE session_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        );
        let movements = sqlx::query_as::<_, CashMovement>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

pub(crate) async fn fetch_session<'e, E>(executor: E, id: &str) -> DbResult<Option<CashSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE id = ?1");
    let session = sqlx::query_as::<_, CashSession>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(session)
}

pub(crate) async fn fetch_open_for_user<'e, E>(
    executor: E,
    user_id: &str,
) -> DbResult<Option<CashSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE user_id = ?1 AND status = 'OPEN'"
    );
    let session = sqlx::query_as::<_, CashSession>(&sql)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(session)
}

/// Open session on a terminal, or an open session of the user, whichever
/// exists. Used by the open-session precheck.
pub(crate) async fn fetch_open_conflict<'e, E>(
    executor: E,
    terminal_id: &str,
    user_id: &str,
) -> DbResult<Option<CashSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM cash_sessions \
         WHERE status = 'OPEN' AND (terminal_id = ?1 OR user_id = ?2) \
         ORDER BY CASE WHEN terminal_id = ?1 THEN 0 ELSE 1 END \
         LIMIT 1"
    );
    let session = sqlx::query_as::<_, CashSession>(&sql)
        .bind(terminal_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(session)
}

pub(crate) async fn insert_session<'e, E>(executor: E, session: &CashSession) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO cash_sessions (
            id, terminal_id, user_id, status, opening_amount_cents,
            expected_amount_cents, closing_amount_cents, difference_cents,
            opening_notes, closing_notes, opened_at, closed_at, closed_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&session.id)
    .bind(&session.terminal_id)
    .bind(&session.user_id)
    .bind(session.status)
    .bind(session.opening_amount_cents)
    .bind(session.expected_amount_cents)
    .bind(session.closing_amount_cents)
    .bind(session.difference_cents)
    .bind(&session.opening_notes)
    .bind(&session.closing_notes)
    .bind(session.opened_at)
    .bind(session.closed_at)
    .bind(&session.closed_by)
    .execute(executor)
    .await?;

    Ok(())
}

/// Shifts the expected amount by `delta_cents`.
///
/// On a CLOSED session the difference is recomputed against the new
/// expected amount, so `difference = closing - expected` keeps holding.
pub(crate) async fn apply_expected_delta<'e, E>(
    executor: E,
    id: &str,
    delta_cents: i64,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE cash_sessions
        SET expected_amount_cents = expected_amount_cents + ?2,
            difference_cents = CASE
                WHEN closing_amount_cents IS NULL THEN NULL
                ELSE closing_amount_cents - (expected_amount_cents + ?2)
            END
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta_cents)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Closes an OPEN session. Returns `false` if it was not OPEN.
pub(crate) async fn close_session<'e, E>(
    executor: E,
    id: &str,
    closing_amount_cents: i64,
    notes: Option<&str>,
    closed_by: &str,
    closed_at: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE cash_sessions
        SET status = 'CLOSED',
            closing_amount_cents = ?2,
            difference_cents = ?2 - expected_amount_cents,
            closing_notes = ?3,
            closed_by = ?4,
            closed_at = ?5
        WHERE id = ?1 AND status = 'OPEN'
        "#,
    )
    .bind(id)
    .bind(closing_amount_cents)
    .bind(notes)
    .bind(closed_by)
    .bind(closed_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn insert_movement<'e, E>(executor: E, movement: &CashMovement) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO cash_movements (id, session_id, kind, amount_cents, reason, created_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.session_id)
    .bind(movement.kind)
    .bind(movement.amount_cents)
    .bind(&movement.reason)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn delete_movements<'e, E>(executor: E, session_id: &str) -> DbResult<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM cash_movements WHERE session_id = ?1")
        .bind(session_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn delete_session<'e, E>(executor: E, id: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM cash_sessions WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}
