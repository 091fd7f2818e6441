use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{Purchase, PurchaseRequest, ShopItem, Task};
use std::collections::BTreeMap;

use super::{SubmissionRecord, UserRecord};

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredential {
    /// argon2 PHC string; older files stored a bcrypt hash under `password`
    #[serde(alias = "password")]
    pub password_hash: String,
}

/// The whole application state; persisted as one JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub admin: AdminCredential,
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub shop: Vec<ShopItem>,
    #[serde(default)]
    pub submissions: Vec<SubmissionRecord>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub purchase_requests: Vec<PurchaseRequest>,
}

impl Document {
    /// First-run content: three starter tasks and two shop items.
    pub fn seed(admin: AdminCredential) -> Self {
        let task = |id, name: &str, reward| Task {
            id,
            name: name.to_string(),
            reward,
            active: true,
        };
        let item = |id, name: &str, price| ShopItem {
            id,
            name: name.to_string(),
            price,
            active: true,
        };

        Self {
            admin,
            users: BTreeMap::new(),
            tasks: vec![
                task(1, "Покормить персонажа", 5),
                task(2, "Поиграть с персонажем", 10),
                task(3, "Дать персонажу поспать", 8),
            ],
            shop: vec![item(1, "👕 Футболка", 10), item(2, "🎁 Кружка", 50)],
            submissions: Vec::new(),
            purchases: Vec::new(),
            purchase_requests: Vec::new(),
        }
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn shop_item(&self, id: i64) -> Option<&ShopItem> {
        self.shop.iter().find(|i| i.id == id)
    }

    pub fn balance_of(&self, user_id: &str) -> i64 {
        self.users.get(user_id).map(|u| u.balance).unwrap_or(0)
    }
}

/// Time-based id that is still unique when two records land in the same
/// millisecond.
pub fn next_id<I>(existing: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let now = Utc::now().timestamp_millis();
    let max = existing.into_iter().max().unwrap_or(0);
    now.max(max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminCredential {
        AdminCredential {
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn test_seed_contents() {
        let doc = Document::seed(admin());

        assert_eq!(doc.tasks.len(), 3);
        assert_eq!(doc.task(2).map(|t| t.reward), Some(10));
        assert_eq!(doc.shop.len(), 2);
        assert_eq!(doc.shop_item(2).map(|i| i.price), Some(50));
        assert!(doc.users.is_empty());
        assert!(doc.submissions.is_empty());
        assert!(doc.purchase_requests.is_empty());
    }

    #[test]
    fn test_document_top_level_keys() {
        let value = serde_json::to_value(Document::seed(admin())).unwrap();
        let object = value.as_object().unwrap();

        for key in ["admin", "users", "tasks", "shop", "submissions", "purchases", "purchaseRequests"] {
            assert!(object.contains_key(key), "missing key {}", key);
        }
    }

    #[test]
    fn test_next_id_is_unique_and_time_based() {
        let now = Utc::now().timestamp_millis();

        let id = next_id(vec![1, 2, 3]);
        assert!(id >= now);

        let far_future = now + 1_000_000;
        assert_eq!(next_id(vec![far_future]), far_future + 1);
        assert!(next_id(Vec::new()) >= now);
    }

    #[test]
    fn test_balance_of_unknown_user_is_zero() {
        let doc = Document::seed(admin());
        assert_eq!(doc.balance_of("nobody"), 0);
    }
}
