//! Per-user cart and wishlist slots.
//!
//! Both are owned by the session, never synced to a server.  The cart
//! snapshots the unit price at add time; the wishlist is a plain membership
//! set with no ordering guarantee.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::bus::Domain;
use crate::error::MutationError;
use crate::models::CartItem;
use crate::store::{cart_slot, wishlist_slot, Store};

impl Store {
    // ------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------

    /// Add `quantity` of a product to the user's cart.  An existing line for
    /// the same product merges quantities and keeps its original price
    /// snapshot.
    pub fn add_to_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartItem, MutationError> {
        if quantity == 0 {
            return Err(MutationError::Validation(
                "quantity must be positive".into(),
            ));
        }
        let product = self.product_by_id(product_id).ok_or(MutationError::NotFound)?;

        let key = cart_slot(user_id);
        let mut line = None;
        self.mutate_slot(Domain::Cart, &key, |mut items: Vec<CartItem>| {
            match items.iter_mut().find(|i| i.product_id == product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                    line = Some(existing.clone());
                }
                None => {
                    let item = CartItem {
                        product_id,
                        quantity,
                        unit_price: product.price,
                        added_at: Utc::now(),
                    };
                    line = Some(item.clone());
                    items.push(item);
                }
            }
            items
        });
        line.ok_or(MutationError::NotFound)
    }

    /// Set a line's quantity.  Zero removes the line.
    pub fn set_cart_quantity(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: u32,
    ) -> Result<(), MutationError> {
        let key = cart_slot(user_id);
        let mut outcome = Err(MutationError::NotFound);
        self.mutate_slot(Domain::Cart, &key, |mut items: Vec<CartItem>| {
            match items.iter().position(|i| i.product_id == product_id) {
                None => outcome = Err(MutationError::NotFound),
                Some(pos) if quantity == 0 => {
                    items.remove(pos);
                    outcome = Ok(());
                }
                Some(pos) => {
                    items[pos].quantity = quantity;
                    outcome = Ok(());
                }
            }
            items
        });
        outcome
    }

    /// Remove a line outright.  Returns `false` when it was not there.
    pub fn remove_from_cart(&self, user_id: &str, product_id: i64) -> bool {
        let key = cart_slot(user_id);
        let mut removed = false;
        self.mutate_slot(Domain::Cart, &key, |mut items: Vec<CartItem>| {
            let before = items.len();
            items.retain(|i| i.product_id != product_id);
            removed = items.len() < before;
            items
        });
        removed
    }

    pub fn clear_cart(&self, user_id: &str) {
        let key = cart_slot(user_id);
        self.mutate_slot::<CartItem, _>(Domain::Cart, &key, |_| Vec::new());
    }

    pub fn cart_items(&self, user_id: &str) -> Vec<CartItem> {
        self.load_slot(&cart_slot(user_id))
    }

    /// Sum of `unit_price * quantity` over the cart.
    pub fn cart_total(&self, user_id: &str) -> f64 {
        self.cart_items(user_id)
            .iter()
            .map(|i| i.unit_price * f64::from(i.quantity))
            .sum()
    }

    // ------------------------------------------------------------------
    // Wishlist
    // ------------------------------------------------------------------

    /// Toggle a product's wishlist membership.  Returns whether the product
    /// is a member afterwards.
    pub fn toggle_wishlist(&self, user_id: &str, product_id: i64) -> bool {
        let key = wishlist_slot(user_id);
        let mut member = false;
        self.mutate_slot(Domain::Wishlist, &key, |ids: Vec<i64>| {
            let mut set: BTreeSet<i64> = ids.into_iter().collect();
            if !set.remove(&product_id) {
                set.insert(product_id);
                member = true;
            } else {
                member = false;
            }
            set.into_iter().collect()
        });
        member
    }

    pub fn wishlist(&self, user_id: &str) -> BTreeSet<i64> {
        self.load_slot::<i64>(&wishlist_slot(user_id))
            .into_iter()
            .collect()
    }
}
