//! Derived dashboard metrics.
//!
//! Pure and total: every function takes already-fetched counts or rows and
//! returns a definite number.

use crate::dedupe::value_key;
use crate::models::{EntityStats, MessageStatus, Row};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;

/// Engagement at or above which sentiment is positive.
const POSITIVE_ENGAGEMENT: f64 = 0.8;
/// Engagement at or above which sentiment is neutral-ish.
const NEUTRAL_ENGAGEMENT: f64 = 0.5;

/// `round(100 * part / whole)`, or 0 for an empty whole.
fn rounded_pct(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u64
}

pub fn growth_pct(new_count: u64, total_count: u64) -> u64 {
    rounded_pct(new_count, total_count)
}

pub fn success_rate_pct(success_count: u64, total_count: u64) -> u64 {
    rounded_pct(success_count, total_count)
}

pub fn engagement_rate_pct(sent: u64, read: u64) -> u64 {
    rounded_pct(read, sent)
}

/// Coarse storage estimate, not a measurement.
pub fn estimated_storage_bytes(document_count: u64, avg_document_size_bytes: u64) -> u64 {
    document_count.saturating_mul(avg_document_size_bytes)
}

/// Map read/sent engagement onto `[-1, 1]`.
///
/// Piecewise: `[0.8, 1.0] -> [0.1, 1.0]`, `[0.5, 0.8) -> [-0.1, 0.1)`,
/// `[0, 0.5) -> [-1.0, -0.2)`. Nothing sent is the explicit "no signal" 0.
/// The result is not clamped.
pub fn sentiment_score(sent: u64, read: u64) -> f64 {
    if sent == 0 {
        return 0.0;
    }

    let engagement = read as f64 / sent as f64;
    if engagement >= POSITIVE_ENGAGEMENT {
        0.1 + (engagement - POSITIVE_ENGAGEMENT) * 4.5
    } else if engagement >= NEUTRAL_ENGAGEMENT {
        (engagement - NEUTRAL_ENGAGEMENT) * 0.6667 - 0.1
    } else {
        (engagement / NEUTRAL_ENGAGEMENT) * 0.4 - 1.0
    }
}

/// Message counts for one entity's communication logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageBreakdown {
    pub sent: u64,
    pub read: u64,
    pub scheduled: u64,
    pub draft: u64,
    pub next_scheduled: Option<DateTime<Utc>>,
}

impl MessageBreakdown {
    /// Tally logs; `next_scheduled` is the earliest scheduled send not before `now`.
    pub fn from_logs(logs: &[Row], now: DateTime<Utc>) -> Self {
        let mut breakdown = Self::default();

        for log in logs {
            let status = MessageStatus::of_row(log);
            if status.is_sent() {
                breakdown.sent += 1;
            }
            match status {
                MessageStatus::Read => breakdown.read += 1,
                MessageStatus::Draft => breakdown.draft += 1,
                MessageStatus::Scheduled => {
                    breakdown.scheduled += 1;
                    if let Some(at) = parse_timestamp(log.get("scheduled_at")) {
                        if at >= now && breakdown.next_scheduled.map_or(true, |next| at < next) {
                            breakdown.next_scheduled = Some(at);
                        }
                    }
                }
                _ => {}
            }
        }

        breakdown
    }

    /// Assemble the stats block for an entity.
    pub fn into_entity_stats(self, employee_count: u64) -> EntityStats {
        EntityStats {
            employee_count,
            sent_messages: self.sent,
            read_messages: self.read,
            scheduled_messages: self.scheduled,
            draft_messages: self.draft,
            next_scheduled_date: self.next_scheduled,
            sentiment_score: sentiment_score(self.sent, self.read),
            engagement_rate_pct: engagement_rate_pct(self.sent, self.read),
        }
    }
}

/// Logs that left the provider successfully.
pub fn successful_count(logs: &[Row]) -> u64 {
    logs.iter()
        .filter(|log| MessageStatus::of_row(log).is_sent())
        .count() as u64
}

/// Sum of the numeric `tokens_used` column; missing or malformed values count 0.
pub fn sum_tokens(logs: &[Row]) -> u64 {
    logs.iter()
        .filter_map(|log| match log.get("tokens_used") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
        .fold(0u64, |acc, n| acc.saturating_add(n))
}

/// Number of distinct non-null values of a column.
pub fn distinct_count(rows: &[Row], column: &str) -> u64 {
    rows.iter()
        .filter_map(|row| row.get(column).and_then(value_key))
        .collect::<HashSet<_>>()
        .len() as u64
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EPSILON: f64 = 1e-9;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_zero_division_safety() {
        for x in [0, 1, 50, u64::MAX] {
            assert_eq!(growth_pct(x, 0), 0);
            assert_eq!(success_rate_pct(x, 0), 0);
            assert_eq!(engagement_rate_pct(0, x), 0);
        }
    }

    #[test]
    fn test_percentages_round() {
        assert_eq!(growth_pct(1, 3), 33);
        assert_eq!(growth_pct(2, 3), 67);
        assert_eq!(success_rate_pct(1, 8), 13); // 12.5 rounds away from zero
        assert_eq!(engagement_rate_pct(200, 150), 75);
    }

    #[test]
    fn test_storage_estimate() {
        assert_eq!(estimated_storage_bytes(3, 1_048_576), 3_145_728);
        assert_eq!(estimated_storage_bytes(0, 1_048_576), 0);
        assert_eq!(estimated_storage_bytes(u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn test_sentiment_boundaries() {
        assert!((sentiment_score(100, 80) - 0.1).abs() < EPSILON);
        assert!((sentiment_score(100, 50) - (-0.1)).abs() < EPSILON);
        assert_eq!(sentiment_score(0, 0), 0.0);
    }

    #[test]
    fn test_sentiment_ranges() {
        assert!((sentiment_score(10, 10) - 1.0).abs() < EPSILON);
        assert!((sentiment_score(10, 0) - (-1.0)).abs() < EPSILON);
        assert!((sentiment_score(4, 1) - (-0.8)).abs() < EPSILON);

        let mid = sentiment_score(100, 65);
        assert!(mid > -0.1 && mid < 0.1);
    }

    #[test]
    fn test_sentiment_no_signal_ignores_reads() {
        assert_eq!(sentiment_score(0, 12), 0.0);
    }

    #[test]
    fn test_message_breakdown() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let logs = rows(json!([
            {"id": 1, "status": "sent"},
            {"id": 2, "status": "delivered"},
            {"id": 3, "status": "read"},
            {"id": 4, "status": "read"},
            {"id": 5, "status": "draft"},
            {"id": 6, "status": "failed"},
            {"id": 7, "status": "scheduled", "scheduled_at": "2024-06-03T09:00:00Z"},
            {"id": 8, "status": "scheduled", "scheduled_at": "2024-06-02T09:00:00Z"},
            {"id": 9, "status": "scheduled", "scheduled_at": "2024-05-30T09:00:00Z"},
        ]));

        let breakdown = MessageBreakdown::from_logs(&logs, now);
        assert_eq!(breakdown.sent, 4);
        assert_eq!(breakdown.read, 2);
        assert_eq!(breakdown.draft, 1);
        assert_eq!(breakdown.scheduled, 3);
        assert_eq!(
            breakdown.next_scheduled.unwrap().to_rfc3339(),
            "2024-06-02T09:00:00+00:00"
        );

        let stats = breakdown.into_entity_stats(12);
        assert_eq!(stats.employee_count, 12);
        assert_eq!(stats.engagement_rate_pct, 50);
        assert!((stats.sentiment_score - (-0.1)).abs() < EPSILON);
    }

    #[test]
    fn test_sample_helpers() {
        let logs = rows(json!([
            {"status": "sent", "tokens_used": 120, "employee_id": 1},
            {"status": "failed", "tokens_used": "30", "employee_id": 2},
            {"status": "read", "employee_id": 1},
            {"status": "draft", "tokens_used": null, "employee_id": null},
            {"status": "sent", "employee_id": 2.0},
        ]));

        assert_eq!(successful_count(&logs), 3);
        assert_eq!(sum_tokens(&logs), 150);
        assert_eq!(distinct_count(&logs, "employee_id"), 2);
        assert_eq!(distinct_count(&[], "employee_id"), 0);
    }
}
