use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel as AuditActive, error::AppResult};

pub async fn log_audit<C>(
    conn: &C,
    actor: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    AuditActive {
        id: Set(Uuid::new_v4()),
        actor: Set(actor.map(str::to_owned)),
        action: Set(action.to_owned()),
        resource: Set(resource.map(str::to_owned)),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Records an audit entry, logging instead of failing when the write does
/// not go through.
pub async fn record<C>(
    conn: &C,
    actor: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Value,
) where
    C: ConnectionTrait,
{
    if let Err(err) = log_audit(conn, actor, action, resource, Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
