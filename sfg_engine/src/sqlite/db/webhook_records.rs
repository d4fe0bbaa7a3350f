use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{WebhookRecord, WebhookRecordStatus};

/// Ledger entries for a payment id, oldest first.
pub async fn fetch_records(
    payment_id: &str,
    status: Option<WebhookRecordStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<WebhookRecord>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM webhook_records WHERE payment_id = ");
    builder.push_bind(payment_id);
    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY id ASC");
    builder.build_query_as::<WebhookRecord>().fetch_all(conn).await
}

pub async fn insert_processing_record(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<WebhookRecord, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"
        INSERT INTO webhook_records (payment_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $3)
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(WebhookRecordStatus::Processing)
    .bind(now)
    .fetch_one(conn)
    .await
}

/// Returns the number of records changed (0 or 1).
pub async fn update_record_status(
    id: i64,
    status: WebhookRecordStatus,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE webhook_records SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_record(id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM webhook_records WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected())
}
