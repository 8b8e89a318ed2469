//! PostgreSQL storage backend.
//!
//! Each record is stored as a JSONB document alongside the columns the portal
//! filters on (`current_step`, `recipient_role`, `is_read`, ...). Conditional
//! step writes are single `UPDATE ... WHERE current_step = $expected`
//! statements, so the guard and the write land atomically and a raced call is
//! visible as zero affected rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::{
    AccountStorage, ActivityStorage, ApplicationStorage, ConsultationStorage, ContactStorage,
    DocumentStorage, NotificationStorage, PaymentStorage, PortalStorage, StepAdvance,
};
use crate::error::{PortalError, PortalResult};
use crate::types::{
    Account, ActivityRecord, ActorRole, ConsultationRequest, ContactMessage, DocumentRequest,
    DocumentRequestStatus, InvestmentApplication, Notification, PaymentRecord,
};
use crate::workflow::WorkflowStep;

pub struct PostgresStorage {
    pool: PgPool,
}

fn to_json<T: serde::Serialize>(value: &T) -> PortalResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| PortalError::Storage(format!("json serialize failed: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> PortalResult<T> {
    serde_json::from_value(value).map_err(|e| PortalError::Storage(format!("json decode failed: {e}")))
}

fn decode_data<T: serde::de::DeserializeOwned>(row: &PgRow) -> PortalResult<T> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?;
    from_json(data)
}

impl PostgresStorage {
    pub async fn connect(database_url: &str, max_connections: u32) -> PortalResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres connect failed: {e}")))?;
        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> PortalResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id UUID PRIMARY KEY,
                investor_id UUID NOT NULL,
                current_step TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_applications_investor ON applications(investor_id)",
            "CREATE INDEX IF NOT EXISTS idx_applications_step ON applications(current_step)",
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id UUID PRIMARY KEY,
                application_id UUID,
                recipient_role TEXT NOT NULL,
                recipient_account UUID,
                is_read BOOLEAN NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_role, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_application ON notifications(application_id)",
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                sequence BIGSERIAL PRIMARY KEY,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                detail TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS consultations (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS document_requests (
                id UUID PRIMARY KEY,
                account_id UUID NOT NULL,
                status TEXT NOT NULL,
                requested_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_document_requests_account ON document_requests(account_id)",
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id UUID PRIMARY KEY,
                application_id UUID NOT NULL,
                paid_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_payments_application ON payments(application_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PortalError::Storage(format!("postgres schema setup failed: {e}")))?;
        }
        info!("postgres schema ready");
        Ok(())
    }
}

#[async_trait]
impl AccountStorage for PostgresStorage {
    async fn insert_account(&self, account: &Account) -> PortalResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, role, created_at, data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                data = EXCLUDED.data
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(account.role.name())
        .bind(account.created_at)
        .bind(to_json(account)?)
        .execute(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres account insert failed: {e}")))?;
        Ok(())
    }

    async fn fetch_account(&self, id: Uuid) -> PortalResult<Option<Account>> {
        let row = sqlx::query("SELECT data FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres account fetch failed: {e}")))?;
        row.map(|row| decode_data(&row)).transpose()
    }

    async fn fetch_account_by_email(&self, email: &str) -> PortalResult<Option<Account>> {
        let row = sqlx::query("SELECT data FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres account fetch failed: {e}")))?;
        row.map(|row| decode_data(&row)).transpose()
    }

    async fn list_accounts(&self) -> PortalResult<Vec<Account>> {
        let rows = sqlx::query("SELECT data FROM accounts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres account list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn delete_account(&self, id: Uuid) -> PortalResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres account delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ApplicationStorage for PostgresStorage {
    async fn insert_application(&self, application: &InvestmentApplication) -> PortalResult<()> {
        sqlx::query(
            r#"
            INSERT INTO applications (id, investor_id, current_step, created_at, updated_at, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                current_step = EXCLUDED.current_step,
                updated_at = EXCLUDED.updated_at,
                data = EXCLUDED.data
            "#,
        )
        .bind(application.id)
        .bind(application.investor_id)
        .bind(application.current_step.name())
        .bind(application.created_at)
        .bind(application.updated_at)
        .bind(to_json(application)?)
        .execute(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres application insert failed: {e}")))?;
        Ok(())
    }

    async fn fetch_application(&self, id: Uuid) -> PortalResult<Option<InvestmentApplication>> {
        let row = sqlx::query("SELECT data FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres application fetch failed: {e}")))?;
        row.map(|row| decode_data(&row)).transpose()
    }

    async fn list_applications(&self) -> PortalResult<Vec<InvestmentApplication>> {
        let rows = sqlx::query("SELECT data FROM applications ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres application list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn list_applications_for(
        &self,
        investor_id: Uuid,
    ) -> PortalResult<Vec<InvestmentApplication>> {
        let rows = sqlx::query(
            "SELECT data FROM applications WHERE investor_id = $1 ORDER BY updated_at DESC",
        )
        .bind(investor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres application list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn advance_step(
        &self,
        id: Uuid,
        expected: WorkflowStep,
        next: WorkflowStep,
    ) -> PortalResult<StepAdvance> {
        // Guard and write in one statement; the JSONB document is patched in
        // place so concurrent note issuance is never clobbered.
        let row = sqlx::query(
            r#"
            UPDATE applications
            SET current_step = $3,
                updated_at = $4,
                data = data || jsonb_build_object('current_step', $3::text, 'updated_at', $4::timestamptz)
            WHERE id = $1 AND current_step = $2
            RETURNING data
            "#,
        )
        .bind(id)
        .bind(expected.name())
        .bind(next.name())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres step advance failed: {e}")))?;

        match row {
            Some(row) => Ok(StepAdvance::Applied(decode_data(&row)?)),
            None => match self.fetch_application(id).await? {
                Some(application) => Ok(StepAdvance::Conflict(application.current_step)),
                None => Ok(StepAdvance::Missing),
            },
        }
    }

    async fn issue_note(&self, id: Uuid, issued_at: DateTime<Utc>) -> PortalResult<StepAdvance> {
        let row = sqlx::query(
            r#"
            UPDATE applications
            SET updated_at = $2,
                data = data || jsonb_build_object('note_issued_at', $2::timestamptz, 'updated_at', $2::timestamptz)
            WHERE id = $1 AND current_step = $3 AND (data->>'note_issued_at') IS NULL
            RETURNING data
            "#,
        )
        .bind(id)
        .bind(issued_at)
        .bind(WorkflowStep::PromissoryNotePending.name())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres note issue failed: {e}")))?;

        match row {
            Some(row) => Ok(StepAdvance::Applied(decode_data(&row)?)),
            None => match self.fetch_application(id).await? {
                Some(application) => Ok(StepAdvance::Conflict(application.current_step)),
                None => Ok(StepAdvance::Missing),
            },
        }
    }

    async fn delete_application(&self, id: Uuid) -> PortalResult<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres application delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationStorage for PostgresStorage {
    async fn insert_notification(&self, notification: &Notification) -> PortalResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, application_id, recipient_role, recipient_account, is_read, created_at, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(notification.application_id)
        .bind(notification.recipient_role.name())
        .bind(notification.recipient_account)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .bind(to_json(notification)?)
        .execute(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres notification insert failed: {e}")))?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        role: ActorRole,
        account: Option<Uuid>,
        limit: usize,
    ) -> PortalResult<Vec<Notification>> {
        let rows = if let Some(account_id) = account {
            sqlx::query(
                r#"
                SELECT data FROM notifications
                WHERE recipient_role = $1 AND recipient_account = $2
                ORDER BY created_at DESC
                LIMIT $3
                "#,
            )
            .bind(role.name())
            .bind(account_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT data FROM notifications
                WHERE recipient_role = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(role.name())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| PortalError::Storage(format!("postgres notification list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn mark_read(&self, id: Uuid) -> PortalResult<Option<Notification>> {
        let row = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE,
                data = data || '{"is_read": true}'::jsonb
            WHERE id = $1
            RETURNING data
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres notification update failed: {e}")))?;
        row.map(|row| decode_data(&row)).transpose()
    }

    async fn mark_all_read(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64> {
        let result = if let Some(account_id) = account {
            sqlx::query(
                r#"
                UPDATE notifications
                SET is_read = TRUE,
                    data = data || '{"is_read": true}'::jsonb
                WHERE recipient_role = $1 AND recipient_account = $2 AND is_read = FALSE
                "#,
            )
            .bind(role.name())
            .bind(account_id)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE notifications
                SET is_read = TRUE,
                    data = data || '{"is_read": true}'::jsonb
                WHERE recipient_role = $1 AND is_read = FALSE
                "#,
            )
            .bind(role.name())
            .execute(&self.pool)
            .await
        }
        .map_err(|e| PortalError::Storage(format!("postgres notification update failed: {e}")))?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64> {
        let row = if let Some(account_id) = account {
            sqlx::query(
                r#"
                SELECT COUNT(*) AS count FROM notifications
                WHERE recipient_role = $1 AND recipient_account = $2 AND is_read = FALSE
                "#,
            )
            .bind(role.name())
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT COUNT(*) AS count FROM notifications
                WHERE recipient_role = $1 AND is_read = FALSE
                "#,
            )
            .bind(role.name())
            .fetch_one(&self.pool)
            .await
        }
        .map_err(|e| PortalError::Storage(format!("postgres notification count failed: {e}")))?;
        let count: i64 = row
            .try_get("count")
            .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?;
        Ok(count as u64)
    }

    async fn delete_notifications_for(&self, application_id: Uuid) -> PortalResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE application_id = $1")
            .bind(application_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres notification delete failed: {e}")))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ActivityStorage for PostgresStorage {
    async fn record_activity(&self, entry: &ActivityRecord) -> PortalResult<u64> {
        let row = sqlx::query(
            r#"
            INSERT INTO activities (actor, action, detail, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING sequence
            "#,
        )
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.detail)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres activity insert failed: {e}")))?;
        let sequence: i64 = row
            .try_get("sequence")
            .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?;
        Ok(sequence as u64)
    }

    async fn list_activity(
        &self,
        after_sequence: Option<u64>,
        limit: usize,
    ) -> PortalResult<Vec<ActivityRecord>> {
        let rows = if let Some(after) = after_sequence {
            sqlx::query(
                r#"
                SELECT sequence, actor, action, detail, created_at
                FROM activities
                WHERE sequence > $1
                ORDER BY sequence ASC
                LIMIT $2
                "#,
            )
            .bind(after as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT sequence, actor, action, detail, created_at
                FROM activities
                ORDER BY sequence DESC
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| PortalError::Storage(format!("postgres activity list failed: {e}")))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let sequence: i64 = row
                .try_get("sequence")
                .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?;
            entries.push(ActivityRecord {
                sequence: sequence as u64,
                actor: row
                    .try_get("actor")
                    .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?,
                action: row
                    .try_get("action")
                    .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?,
                detail: row
                    .try_get("detail")
                    .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?,
                created_at: row
                    .try_get("created_at")
                    .map_err(|e| PortalError::Storage(format!("postgres row decode failed: {e}")))?,
            });
        }
        entries.sort_by_key(|entry| entry.sequence);
        Ok(entries)
    }
}

#[async_trait]
impl ConsultationStorage for PostgresStorage {
    async fn insert_consultation(&self, request: &ConsultationRequest) -> PortalResult<()> {
        sqlx::query("INSERT INTO consultations (id, created_at, data) VALUES ($1, $2, $3)")
            .bind(request.id)
            .bind(request.created_at)
            .bind(to_json(request)?)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres consultation insert failed: {e}")))?;
        Ok(())
    }

    async fn list_consultations(&self) -> PortalResult<Vec<ConsultationRequest>> {
        let rows = sqlx::query("SELECT data FROM consultations ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres consultation list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn delete_consultation(&self, id: Uuid) -> PortalResult<bool> {
        let result = sqlx::query("DELETE FROM consultations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres consultation delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContactStorage for PostgresStorage {
    async fn insert_contact_message(&self, message: &ContactMessage) -> PortalResult<()> {
        sqlx::query("INSERT INTO contact_messages (id, created_at, data) VALUES ($1, $2, $3)")
            .bind(message.id)
            .bind(message.created_at)
            .bind(to_json(message)?)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres contact insert failed: {e}")))?;
        Ok(())
    }

    async fn list_contact_messages(&self) -> PortalResult<Vec<ContactMessage>> {
        let rows = sqlx::query("SELECT data FROM contact_messages ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres contact list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }
}

#[async_trait]
impl DocumentStorage for PostgresStorage {
    async fn insert_document_request(&self, request: &DocumentRequest) -> PortalResult<()> {
        sqlx::query(
            r#"
            INSERT INTO document_requests (id, account_id, status, requested_at, data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(request.id)
        .bind(request.account_id)
        .bind(request.status.name())
        .bind(request.requested_at)
        .bind(to_json(request)?)
        .execute(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres document insert failed: {e}")))?;
        Ok(())
    }

    async fn fetch_document_request(&self, id: Uuid) -> PortalResult<Option<DocumentRequest>> {
        let row = sqlx::query("SELECT data FROM document_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres document fetch failed: {e}")))?;
        row.map(|row| decode_data(&row)).transpose()
    }

    async fn list_document_requests(
        &self,
        account: Option<Uuid>,
    ) -> PortalResult<Vec<DocumentRequest>> {
        let rows = if let Some(account_id) = account {
            sqlx::query(
                r#"
                SELECT data FROM document_requests
                WHERE account_id = $1
                ORDER BY requested_at DESC
                "#,
            )
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query("SELECT data FROM document_requests ORDER BY requested_at DESC")
                .fetch_all(&self.pool)
                .await
        }
        .map_err(|e| PortalError::Storage(format!("postgres document list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn resolve_document_request(
        &self,
        id: Uuid,
        status: DocumentRequestStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> PortalResult<Option<DocumentRequest>> {
        let row = sqlx::query(
            r#"
            UPDATE document_requests
            SET status = $2,
                data = data || jsonb_build_object(
                    'status', $2::text,
                    'resolved_at', $3::timestamptz,
                    'resolved_by', $4::uuid
                )
            WHERE id = $1 AND status = 'pending'
            RETURNING data
            "#,
        )
        .bind(id)
        .bind(status.name())
        .bind(resolved_at)
        .bind(resolved_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres document update failed: {e}")))?;
        row.map(|row| decode_data(&row)).transpose()
    }

    async fn delete_document_requests_for(&self, account_id: Uuid) -> PortalResult<u64> {
        let result = sqlx::query("DELETE FROM document_requests WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres document delete failed: {e}")))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PaymentStorage for PostgresStorage {
    async fn insert_payment(&self, payment: &PaymentRecord) -> PortalResult<()> {
        sqlx::query(
            "INSERT INTO payments (id, application_id, paid_at, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(payment.id)
        .bind(payment.application_id)
        .bind(payment.paid_at)
        .bind(to_json(payment)?)
        .execute(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres payment insert failed: {e}")))?;
        Ok(())
    }

    async fn list_payments_for(&self, application_id: Uuid) -> PortalResult<Vec<PaymentRecord>> {
        let rows = sqlx::query(
            "SELECT data FROM payments WHERE application_id = $1 ORDER BY paid_at DESC",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(format!("postgres payment list failed: {e}")))?;
        rows.iter().map(decode_data).collect()
    }

    async fn delete_payments_for(&self, application_id: Uuid) -> PortalResult<u64> {
        let result = sqlx::query("DELETE FROM payments WHERE application_id = $1")
            .bind(application_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(format!("postgres payment delete failed: {e}")))?;
        Ok(result.rows_affected())
    }
}

impl PortalStorage for PostgresStorage {
    fn backend_label(&self) -> &'static str {
        "postgres"
    }
}
