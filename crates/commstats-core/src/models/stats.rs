//! Dashboard statistics shapes consumed by the frontend.

use super::query::Row;
use crate::config::Collections;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cross-collection dashboard numbers.
///
/// Recomputed wholesale on cache miss; `Default` is the all-zero block shown
/// when nothing could be computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub companies: u64,
    pub employees: u64,
    pub folders: u64,
    pub documents: u64,
    pub communications: u64,
    pub tokens_used: u64,
    pub storage_used_bytes: u64,
    pub monthly_growth_pct: u64,
    pub success_rate_pct: u64,
    pub active_users: u64,
}

/// Message and engagement metrics for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    pub employee_count: u64,
    pub sent_messages: u64,
    pub read_messages: u64,
    pub scheduled_messages: u64,
    pub draft_messages: u64,
    pub next_scheduled_date: Option<DateTime<Utc>>,
    /// In `[-1, 1]`; 0 means no signal.
    pub sentiment_score: f64,
    /// In `[0, 100]`.
    pub engagement_rate_pct: u64,
}

/// A base entity row annotated with its stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWithStats {
    #[serde(flatten)]
    pub entity: Row,
    #[serde(flatten)]
    pub stats: EntityStats,
}

impl EntityWithStats {
    pub fn new(entity: Row, stats: EntityStats) -> Self {
        Self { entity, stats }
    }

    /// Primary key of the base entity.
    pub fn id(&self) -> Option<&Value> {
        self.entity.get("id")
    }
}

/// Delivery status of a communication log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Draft,
    Scheduled,
    Sent,
    Delivered,
    Read,
    Failed,
    Other,
}

impl MessageStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "draft" => MessageStatus::Draft,
            "scheduled" => MessageStatus::Scheduled,
            "sent" => MessageStatus::Sent,
            "delivered" => MessageStatus::Delivered,
            "read" => MessageStatus::Read,
            "failed" => MessageStatus::Failed,
            _ => MessageStatus::Other,
        }
    }

    /// Status of a log row; rows without a status column are `Other`.
    pub fn of_row(row: &Row) -> Self {
        row.get("status")
            .and_then(|v| v.as_str())
            .map(Self::parse)
            .unwrap_or(MessageStatus::Other)
    }

    /// Left the provider successfully.
    pub fn is_sent(&self) -> bool {
        matches!(
            self,
            MessageStatus::Sent | MessageStatus::Delivered | MessageStatus::Read
        )
    }
}

/// Collections that can be listed with per-entity stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Companies,
    Employees,
}

impl EntityKind {
    pub fn from_collection(collection: &str) -> Option<Self> {
        match collection.trim().to_lowercase().as_str() {
            "companies" => Some(EntityKind::Companies),
            "employees" => Some(EntityKind::Employees),
            _ => None,
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Companies => Collections::COMPANIES,
            EntityKind::Employees => Collections::EMPLOYEES,
        }
    }

    /// Column in related collections that references this entity.
    pub fn foreign_key(&self) -> &'static str {
        match self {
            EntityKind::Companies => "company_id",
            EntityKind::Employees => "employee_id",
        }
    }

    /// Whether `employee_count` is meaningful for this kind.
    pub fn counts_employees(&self) -> bool {
        matches!(self, EntityKind::Companies)
    }

    /// Whether a listing of this kind is computed from `collection`.
    pub fn reads(&self, collection: &str) -> bool {
        let collection = collection.trim().to_lowercase();
        collection == self.collection()
            || collection == Collections::COMMUNICATION_LOGS
            || (self.counts_employees() && collection == Collections::EMPLOYEES)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection())
    }
}
