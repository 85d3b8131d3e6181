//! Fire-and-forget audit trail.
//!
//! Every mutating navigation operation appends one row describing the action,
//! the actor and the target. Audit writes never fail the primary operation:
//! errors are logged and swallowed.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use tracing::warn;

use crate::database::entities::audit_logs;

/// Identity of whoever triggered a mutating request, taken from the
/// `x-user-id` / `x-user-name` headers.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            name: "anonymous".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AuditService {
    db: DatabaseConnection,
}

impl AuditService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        details: Option<serde_json::Value>,
        ip: Option<&str>,
    ) {
        if let Err(err) = self.insert_entry(actor, action, details, ip).await {
            warn!("audit log write failed for action '{}': {}", action, err);
        }
    }

    async fn insert_entry(
        &self,
        actor: &Actor,
        action: &str,
        details: Option<serde_json::Value>,
        ip: Option<&str>,
    ) -> Result<(), DbErr> {
        let entry = audit_logs::ActiveModel {
            actor_id: Set(actor.id.clone()),
            actor_name: Set(actor.name.clone()),
            action: Set(action.to_string()),
            module: Set("navigation".to_string()),
            details: Set(details.map(|d| d.to_string())),
            status: Set("success".to_string()),
            ip: Set(ip.map(str::to_string)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        entry.insert(&self.db).await?;
        Ok(())
    }
}
