//! Shop purchase requests.
//!
//! A buy click creates a pending request; nothing is reserved. The admin
//! decision settles it once. Approval re-checks the balance: when it still
//! covers the price the user is debited and a ledger entry is appended, when
//! it does not the request is still marked approved but nothing is debited.

use chrono::Utc;
use thiserror::Error;

use crate::models::next_id;
use crate::services::users::{self, UserError};
use crate::store::{Store, StoreError};
use shared::{BuyItemRequest, ProcessPurchaseResponse, Purchase, PurchaseRequest, ReviewStatus};

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Shop item not found")]
    ItemNotFound,
    #[error("Purchase request not found")]
    NotFound,
    #[error("Not enough lavki: balance {balance}, price {price}")]
    InsufficientBalance { balance: i64, price: i64 },
    #[error("Purchase request is already {}", .0.as_str())]
    InvalidTransition(ReviewStatus),
    #[error("{0}")]
    Validation(String),
    #[error("User error: {0}")]
    UserError(#[from] UserError),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

pub fn request(store: &Store, request: &BuyItemRequest) -> Result<PurchaseRequest, PurchaseError> {
    let purchase_request = store.write(|doc| {
        let now = Utc::now();
        let item = doc
            .shop_item(request.item_id)
            .filter(|i| i.active)
            .cloned()
            .ok_or(PurchaseError::ItemNotFound)?;

        if let Some(client_price) = request.price.filter(|p| *p != item.price) {
            log::warn!(
                "Client sent price {} for item {}, catalog price is {}",
                client_price,
                item.id,
                item.price
            );
        }

        let balance = doc.balance_of(&request.user_id);
        if balance < item.price {
            return Err(PurchaseError::InsufficientBalance {
                balance,
                price: item.price,
            });
        }

        let user = users::upsert_user(
            doc,
            &request.user_id,
            request.user_name.as_deref(),
            request.user_contact.as_deref(),
            now,
        )?;
        let user_name = user.display_name.clone();

        let purchase_request = PurchaseRequest {
            id: next_id(doc.purchase_requests.iter().map(|r| r.id)),
            item_id: item.id,
            item_name: item.name,
            user_id: request.user_id.clone(),
            user_name,
            price: item.price,
            status: ReviewStatus::Pending,
            requested_at: now,
            processed_at: None,
            admin_notes: None,
        };
        doc.purchase_requests.push(purchase_request.clone());

        Ok::<_, PurchaseError>(purchase_request)
    })?;

    log::info!(
        "User {} requested item {} for {}",
        purchase_request.user_id,
        purchase_request.item_id,
        purchase_request.price
    );
    Ok(purchase_request)
}

pub fn process(
    store: &Store,
    request_id: i64,
    decision: ReviewStatus,
    admin_notes: Option<&str>,
) -> Result<ProcessPurchaseResponse, PurchaseError> {
    if decision.is_pending() {
        return Err(PurchaseError::Validation(
            "Status must be approved or rejected".to_string(),
        ));
    }
    let admin_notes = admin_notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    store.write(|doc| {
        let now = Utc::now();
        let index = doc
            .purchase_requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or(PurchaseError::NotFound)?;

        let current = doc.purchase_requests[index].status;
        if !current.can_transition_to(decision) {
            return Err(PurchaseError::InvalidTransition(current));
        }

        let request = &mut doc.purchase_requests[index];
        request.status = decision;
        request.processed_at = Some(now);
        request.admin_notes = admin_notes;
        let request = request.clone();

        if decision == ReviewStatus::Rejected {
            log::info!("Rejected purchase request {}", request.id);
            return Ok(ProcessPurchaseResponse {
                request,
                purchase: None,
            });
        }

        let user = doc.users.get_mut(&request.user_id);
        let balance = user.as_ref().map(|u| u.balance).unwrap_or(0);
        let user = match user {
            Some(user) if balance >= request.price => user,
            _ => {
                log::warn!(
                    "Purchase request {} approved without debit: balance {} is below price {}",
                    request.id,
                    balance,
                    request.price
                );
                return Ok(ProcessPurchaseResponse {
                    request,
                    purchase: None,
                });
            }
        };

        user.balance = user
            .balance
            .checked_sub(request.price)
            .ok_or_else(|| PurchaseError::Validation("Balance overflow".to_string()))?;
        user.last_active_at = now;

        let purchase = Purchase {
            id: next_id(doc.purchases.iter().map(|p| p.id)),
            item_id: request.item_id,
            item_name: request.item_name.clone(),
            price: request.price,
            user_id: request.user_id.clone(),
            purchased_at: now,
            request_id: Some(request.id),
        };
        doc.purchases.push(purchase.clone());

        log::info!(
            "Approved purchase request {}: user {} paid {}",
            request.id,
            request.user_id,
            request.price
        );
        Ok::<_, PurchaseError>(ProcessPurchaseResponse {
            request,
            purchase: Some(purchase),
        })
    })
}

fn newest_requests_first(requests: &mut [PurchaseRequest]) {
    requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(b.id.cmp(&a.id)));
}

fn newest_purchases_first(purchases: &mut [Purchase]) {
    purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at).then(b.id.cmp(&a.id)));
}

pub fn list_requests(
    store: &Store,
    status: Option<ReviewStatus>,
) -> Result<Vec<PurchaseRequest>, PurchaseError> {
    let mut requests: Vec<_> = store.read(|doc| {
        doc.purchase_requests
            .iter()
            .filter(|r| status.map_or(true, |status| r.status == status))
            .cloned()
            .collect()
    })?;
    newest_requests_first(&mut requests);
    Ok(requests)
}

pub fn list_user_requests(store: &Store, user_id: &str) -> Result<Vec<PurchaseRequest>, PurchaseError> {
    let mut requests: Vec<_> = store.read(|doc| {
        doc.purchase_requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    })?;
    newest_requests_first(&mut requests);
    Ok(requests)
}

pub fn list_user_purchases(store: &Store, user_id: &str) -> Result<Vec<Purchase>, PurchaseError> {
    let mut purchases: Vec<_> = store.read(|doc| {
        doc.purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    })?;
    newest_purchases_first(&mut purchases);
    Ok(purchases)
}

pub fn list_purchases(store: &Store) -> Result<Vec<Purchase>, PurchaseError> {
    let mut purchases = store.read(|doc| doc.purchases.clone())?;
    newest_purchases_first(&mut purchases);
    Ok(purchases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(user_id: &str, item_id: i64) -> BuyItemRequest {
        BuyItemRequest {
            item_id,
            item_name: None,
            price: None,
            user_id: user_id.to_string(),
            user_name: Some("Masha".to_string()),
            user_contact: None,
        }
    }

    fn user_with_balance(store: &Store, user_id: &str, balance: i64) {
        users::ensure_user(store, user_id, None, None).unwrap();
        users::set_balance(store, user_id, balance).unwrap();
    }

    #[test]
    fn test_request_approve_scenario() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 10);

        let pending = request(&store, &buy("u1", 1)).unwrap();
        assert_eq!(pending.status, ReviewStatus::Pending);
        assert_eq!(pending.price, 10);
        assert_eq!(users::get_balance(&store, "u1").unwrap(), 10);

        let outcome = process(&store, pending.id, ReviewStatus::Approved, Some("enjoy")).unwrap();
        assert_eq!(outcome.request.status, ReviewStatus::Approved);
        assert_eq!(outcome.request.admin_notes.as_deref(), Some("enjoy"));
        let purchase = outcome.purchase.unwrap();
        assert_eq!(purchase.request_id, Some(pending.id));
        assert_eq!(users::get_balance(&store, "u1").unwrap(), 0);
        assert_eq!(list_user_purchases(&store, "u1").unwrap(), vec![purchase]);

        assert!(matches!(
            process(&store, pending.id, ReviewStatus::Approved, None),
            Err(PurchaseError::InvalidTransition(ReviewStatus::Approved))
        ));
        assert_eq!(users::get_balance(&store, "u1").unwrap(), 0);
        assert_eq!(list_purchases(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_request_requires_balance() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 9);

        assert!(matches!(
            request(&store, &buy("u1", 1)),
            Err(PurchaseError::InsufficientBalance { balance: 9, price: 10 })
        ));
        assert!(matches!(
            request(&store, &buy("stranger", 1)),
            Err(PurchaseError::InsufficientBalance { balance: 0, .. })
        ));
        assert!(list_requests(&store, None).unwrap().is_empty());
    }

    #[test]
    fn test_catalog_price_wins() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 100);

        let mut cheap = buy("u1", 2);
        cheap.price = Some(1);
        let pending = request(&store, &cheap).unwrap();
        assert_eq!(pending.price, 50);
        assert_eq!(pending.item_name, "🎁 Кружка");
    }

    #[test]
    fn test_approval_with_short_balance_marks_approved_without_debit() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 10);
        let pending = request(&store, &buy("u1", 1)).unwrap();
        users::set_balance(&store, "u1", 5).unwrap();

        let outcome = process(&store, pending.id, ReviewStatus::Approved, None).unwrap();
        assert_eq!(outcome.request.status, ReviewStatus::Approved);
        assert!(outcome.purchase.is_none());
        assert_eq!(users::get_balance(&store, "u1").unwrap(), 5);
        assert!(list_purchases(&store).unwrap().is_empty());
    }

    #[test]
    fn test_two_requests_cannot_overdraw() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 10);
        let first = request(&store, &buy("u1", 1)).unwrap();
        let second = request(&store, &buy("u1", 1)).unwrap();

        assert!(process(&store, first.id, ReviewStatus::Approved, None)
            .unwrap()
            .purchase
            .is_some());
        assert!(process(&store, second.id, ReviewStatus::Approved, None)
            .unwrap()
            .purchase
            .is_none());
        assert_eq!(users::get_balance(&store, "u1").unwrap(), 0);
    }

    #[test]
    fn test_reject_has_no_balance_effect() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 10);
        let pending = request(&store, &buy("u1", 1)).unwrap();

        let outcome = process(&store, pending.id, ReviewStatus::Rejected, Some("  ")).unwrap();
        assert_eq!(outcome.request.status, ReviewStatus::Rejected);
        assert!(outcome.request.processed_at.is_some());
        assert!(outcome.request.admin_notes.is_none());
        assert!(outcome.purchase.is_none());
        assert_eq!(users::get_balance(&store, "u1").unwrap(), 10);

        assert!(matches!(
            process(&store, pending.id, ReviewStatus::Approved, None),
            Err(PurchaseError::InvalidTransition(ReviewStatus::Rejected))
        ));
    }

    #[test]
    fn test_process_validation() {
        let store = Store::in_memory().unwrap();

        assert!(matches!(
            process(&store, 1, ReviewStatus::Pending, None),
            Err(PurchaseError::Validation(_))
        ));
        assert!(matches!(
            process(&store, 1, ReviewStatus::Approved, None),
            Err(PurchaseError::NotFound)
        ));
    }

    #[test]
    fn test_unknown_or_inactive_item() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 100);

        assert!(matches!(
            request(&store, &buy("u1", 404)),
            Err(PurchaseError::ItemNotFound)
        ));

        store
            .write(|doc| {
                doc.shop.iter_mut().for_each(|i| i.active = false);
                Ok::<_, PurchaseError>(())
            })
            .unwrap();
        assert!(matches!(
            request(&store, &buy("u1", 1)),
            Err(PurchaseError::ItemNotFound)
        ));
    }

    #[test]
    fn test_listings_are_scoped_and_filtered() {
        let store = Store::in_memory().unwrap();
        user_with_balance(&store, "u1", 100);
        user_with_balance(&store, "u2", 100);

        let first = request(&store, &buy("u1", 1)).unwrap();
        let second = request(&store, &buy("u1", 2)).unwrap();
        request(&store, &buy("u2", 1)).unwrap();
        process(&store, first.id, ReviewStatus::Approved, None).unwrap();

        let mine = list_user_requests(&store, "u1").unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);

        let pending = list_requests(&store, Some(ReviewStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|r| r.status == ReviewStatus::Pending));

        assert_eq!(list_user_purchases(&store, "u1").unwrap().len(), 1);
        assert!(list_user_purchases(&store, "u2").unwrap().is_empty());
    }
}
