use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::Blob;
use std::collections::BTreeSet;

/// Stored model for users; the id is the key in the document's user map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, alias = "lavki")]
    pub balance: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default = "Utc::now", alias = "registrationDate")]
    pub registered_at: DateTime<Utc>,
    #[serde(default = "Utc::now", alias = "lastActivity")]
    pub last_active_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_task_ids: BTreeSet<i64>,
    #[serde(default, alias = "completedTasks")]
    pub completed_count: i64,
    #[serde(default)]
    pub settings: Blob,
    #[serde(default)]
    pub game_state: Blob,
}

impl UserRecord {
    pub fn new(display_name: Option<String>, contact: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            balance: 0,
            display_name,
            contact,
            registered_at: now,
            last_active_at: now,
            completed_task_ids: BTreeSet::new(),
            completed_count: 0,
            settings: Blob::new(),
            game_state: Blob::new(),
        }
    }

    pub fn has_completed(&self, task_id: i64) -> bool {
        self.completed_task_ids.contains(&task_id)
    }

    pub fn to_shared(&self, id: &str) -> shared::User {
        shared::User {
            id: id.to_string(),
            balance: self.balance,
            display_name: self.display_name.clone(),
            contact: self.contact.clone(),
            registered_at: self.registered_at,
            last_active_at: self.last_active_at,
            completed_task_ids: self.completed_task_ids.iter().copied().collect(),
            completed_count: self.completed_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_to_shared() {
        let now = Utc::now();
        let mut record = UserRecord::new(Some("Masha".to_string()), Some("@masha".to_string()), now);
        record.balance = 25;
        record.completed_task_ids.insert(3);
        record.completed_task_ids.insert(1);
        record.completed_count = 2;

        let shared = record.to_shared("u1");

        assert_eq!(shared.id, "u1");
        assert_eq!(shared.balance, 25);
        assert_eq!(shared.display_name, Some("Masha".to_string()));
        assert_eq!(shared.completed_task_ids, vec![1, 3]);
        assert_eq!(shared.registered_at, now);
    }

    #[test]
    fn test_user_record_reads_legacy_keys() {
        let json = r#"{
            "lavki": 40,
            "registrationDate": "2024-03-01T10:00:00Z",
            "completedTasks": 4,
            "lastActivity": "2024-03-02T10:00:00Z"
        }"#;

        let record: UserRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.balance, 40);
        assert_eq!(record.completed_count, 4);
        assert!(record.completed_task_ids.is_empty());
        assert_eq!(record.registered_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }
}
