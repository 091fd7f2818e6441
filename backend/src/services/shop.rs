use thiserror::Error;

use crate::models::next_id;
use crate::store::{Store, StoreError};
use shared::{CreateShopItemRequest, ShopItem, UpdateShopItemRequest};

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Shop item not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

fn validate_name(name: &str) -> Result<String, ShopError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShopError::Validation("Item name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_price(price: i64) -> Result<i64, ShopError> {
    if price <= 0 {
        return Err(ShopError::Validation("Price must be a positive number".to_string()));
    }
    Ok(price)
}

pub fn list_items(store: &Store, active_only: bool) -> Result<Vec<ShopItem>, ShopError> {
    Ok(store.read(|doc| {
        doc.shop
            .iter()
            .filter(|i| !active_only || i.active)
            .cloned()
            .collect()
    })?)
}

pub fn create_item(store: &Store, request: &CreateShopItemRequest) -> Result<ShopItem, ShopError> {
    let name = validate_name(&request.name)?;
    let price = validate_price(request.price)?;

    let item = store.write(|doc| {
        let item = ShopItem {
            id: next_id(doc.shop.iter().map(|i| i.id)),
            name,
            price,
            active: true,
        };
        doc.shop.push(item.clone());
        Ok::<_, ShopError>(item)
    })?;

    log::info!("Created shop item {} ({})", item.id, item.name);
    Ok(item)
}

pub fn update_item(
    store: &Store,
    item_id: i64,
    request: &UpdateShopItemRequest,
) -> Result<ShopItem, ShopError> {
    let name = request.name.as_deref().map(validate_name).transpose()?;
    let price = request.price.map(validate_price).transpose()?;

    store.write(|doc| {
        let item = doc
            .shop
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(ShopError::NotFound)?;

        if let Some(name) = name {
            item.name = name;
        }
        if let Some(price) = price {
            item.price = price;
        }
        if let Some(active) = request.active {
            item.active = active;
        }

        Ok::<_, ShopError>(item.clone())
    })
}
