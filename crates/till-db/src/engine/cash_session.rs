//! # Cash Session Manager
//!
//! Opening and closing drawers, manual cash movements, and the
//! administrative delete that unwinds a whole session.
//!
//! ```text
//! open ──► OPEN ──┬── add_movement (DEPOSIT +, WITHDRAWAL −, ADJUSTMENT 0)
//!                 ├── sales (+ cash − change)
//!                 ▼
//!              close ──► CLOSED (difference = closing − expected)
//!                           │
//!                           ▼
//!                     delete (ADMIN): every sale compensated, rows removed
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::compensation;
use crate::engine::error::{EngineError, EngineResult};
use crate::error::{DbError, DbResult};
use crate::repository::session::{self, CashSessionRepository};
use till_core::lifecycle::{
    authorize_session_access, ensure_session_closed, ensure_session_open, require_admin,
};
use till_core::{
    AddMovementRequest, CashMovement, CashSession, CloseSessionRequest, CoreError, Money,
    OpenSessionRequest, Principal, SessionStatus,
};

/// Drawer session operations. Obtained from [`crate::Database::cash_sessions`].
#[derive(Debug, Clone)]
pub struct CashSessionService {
    pool: SqlitePool,
}

impl CashSessionService {
    pub fn new(pool: SqlitePool) -> Self {
        CashSessionService { pool }
    }

    fn repo(&self) -> CashSessionRepository {
        CashSessionRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Opens a drawer on a terminal for the calling operator.
    ///
    /// ## Errors
    /// - `TerminalSessionOpen` if the terminal already has an OPEN session
    /// - `OperatorSessionOpen` if the operator has one on any terminal
    ///
    /// A concurrent opener that slips past the precheck hits the partial
    /// unique index instead and gets the same error.
    pub async fn open(
        &self,
        principal: &Principal,
        request: &OpenSessionRequest,
    ) -> EngineResult<CashSession> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        if let Some(existing) =
            session::fetch_open_conflict(&mut *tx, &request.terminal_id, &principal.user_id).await?
        {
            warn!(
                terminal_id = %request.terminal_id,
                user_id = %principal.user_id,
                existing = %existing.id,
                "Open session rejected"
            );
            return Err(open_conflict(&existing, &request.terminal_id).into());
        }

        let opening = Money::from_cents(request.opening_amount_cents);
        let new_session = CashSession {
            id: Uuid::new_v4().to_string(),
            terminal_id: request.terminal_id.clone(),
            user_id: principal.user_id.clone(),
            status: SessionStatus::Open,
            opening_amount_cents: opening.cents(),
            expected_amount_cents: opening.cents(),
            closing_amount_cents: None,
            difference_cents: None,
            opening_notes: request.notes.clone(),
            closing_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
            closed_by: None,
        };

        if let Err(err) = session::insert_session(&mut *tx, &new_session).await {
            return Err(self.map_open_race(err, principal, request));
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = %new_session.id,
            terminal_id = %new_session.terminal_id,
            user_id = %new_session.user_id,
            opening = %opening,
            "Cash session opened"
        );
        Ok(new_session)
    }

    fn map_open_race(
        &self,
        err: DbError,
        principal: &Principal,
        request: &OpenSessionRequest,
    ) -> EngineError {
        if err.is_unique_violation_on("cash_sessions.terminal_id") {
            return CoreError::TerminalSessionOpen {
                terminal_id: request.terminal_id.clone(),
            }
            .into();
        }
        if err.is_unique_violation_on("cash_sessions.user_id") {
            return CoreError::OperatorSessionOpen {
                user_id: principal.user_id.clone(),
                terminal_id: "unknown".to_string(),
            }
            .into();
        }
        err.into()
    }

    /// Closes a drawer and records the counted cash.
    ///
    /// `difference = closing - expected` is computed in the same statement
    /// that flips the status, against the committed expected amount.
    pub async fn close(
        &self,
        session_id: &str,
        principal: &Principal,
        request: &CloseSessionRequest,
    ) -> EngineResult<CashSession> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let current = load_session(&mut *tx, session_id).await?;
        ensure_session_open(&current)?;
        authorize_session_access(&current, principal, "close this session")?;

        let closed = session::close_session(
            &mut *tx,
            session_id,
            request.closing_amount_cents,
            request.notes.as_deref(),
            &principal.user_id,
            Utc::now(),
        )
        .await?;
        if !closed {
            return Err(CoreError::SessionNotOpen {
                session_id: session_id.to_string(),
            }
            .into());
        }

        let updated = load_session(&mut *tx, session_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = %updated.id,
            expected = %updated.expected_amount(),
            difference = ?updated.difference_cents,
            closed_by = %principal.user_id,
            "Cash session closed"
        );
        Ok(updated)
    }

    /// Records a manual deposit, withdrawal or adjustment.
    pub async fn add_movement(
        &self,
        session_id: &str,
        principal: &Principal,
        request: &AddMovementRequest,
    ) -> EngineResult<CashMovement> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let current = load_session(&mut *tx, session_id).await?;
        ensure_session_open(&current)?;
        authorize_session_access(&current, principal, "add cash movements to this session")?;

        let amount = Money::from_cents(request.amount_cents);
        let delta = request.kind.balance_delta(amount);
        if !delta.is_zero() {
            session::apply_expected_delta(&mut *tx, session_id, delta.cents()).await?;
        }

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            kind: request.kind,
            amount_cents: amount.cents(),
            reason: request.reason.clone(),
            created_by: principal.user_id.clone(),
            created_at: Utc::now(),
        };
        session::insert_movement(&mut *tx, &movement).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = %session_id,
            kind = ?movement.kind,
            amount = %amount,
            delta = %delta,
            "Cash movement recorded"
        );
        Ok(movement)
    }

    /// Deletes a CLOSED session, compensating every sale it holds.
    ///
    /// ## Errors
    /// - `Forbidden` unless the caller is ADMIN
    /// - `NotFound`
    /// - `SessionInUse` for the caller's own open session
    /// - `SessionNotClosed` for any other open session
    pub async fn delete(&self, session_id: &str, principal: &Principal) -> EngineResult<()> {
        require_admin(principal, "delete cash sessions")?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let target = load_session(&mut *tx, session_id).await?;
        if target.is_open() && target.user_id == principal.user_id {
            return Err(CoreError::SessionInUse {
                session_id: session_id.to_string(),
            }
            .into());
        }
        ensure_session_closed(&target)?;

        compensation::remove_session(&mut *tx, &target, Utc::now()).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(session_id = %session_id, deleted_by = %principal.user_id, "Cash session deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get(&self, session_id: &str) -> DbResult<Option<CashSession>> {
        self.repo().get_by_id(session_id).await
    }

    pub async fn open_for_terminal(&self, terminal_id: &str) -> DbResult<Option<CashSession>> {
        self.repo().open_for_terminal(terminal_id).await
    }

    pub async fn open_for_user(&self, user_id: &str) -> DbResult<Option<CashSession>> {
        self.repo().open_for_user(user_id).await
    }

    /// Movements of a session, newest first.
    pub async fn movements(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        self.repo().movements(session_id).await
    }
}

fn open_conflict(existing: &CashSession, terminal_id: &str) -> CoreError {
    if existing.terminal_id == terminal_id {
        CoreError::TerminalSessionOpen {
            terminal_id: terminal_id.to_string(),
        }
    } else {
        CoreError::OperatorSessionOpen {
            user_id: existing.user_id.clone(),
            terminal_id: existing.terminal_id.clone(),
        }
    }
}

pub(crate) async fn load_session(
    conn: &mut sqlx::SqliteConnection,
    session_id: &str,
) -> EngineResult<CashSession> {
    session::fetch_session(conn, session_id)
        .await?
        .ok_or_else(|| CoreError::not_found("CashSession", session_id).into())
}

// =============================================================================
// Unit Tests
// =============================================================================
