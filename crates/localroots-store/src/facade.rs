//! Async read façade.
//!
//! UI code calls these as if a server were on the other end; today they wrap
//! the synchronous local reads and resolve immediately, and a network-backed
//! implementation could replace them without touching call sites.  None of
//! them can fail: the soft-fail policy of the mutation gateway means the
//! worst case is an empty collection.

use std::collections::BTreeSet;

use localroots_shared::types::{Community, Role};

use crate::models::{CartItem, ChatMessage, ChatThread, Order, Product, WalletTransaction};
use crate::store::Store;

impl Store {
    pub async fn fetch_all_products(&self) -> Vec<Product> {
        self.all_products()
    }

    pub async fn fetch_product(&self, id: i64) -> Option<Product> {
        self.product_by_id(id)
    }

    pub async fn fetch_products_by_community(&self, community: Community) -> Vec<Product> {
        self.products_by_community(community)
    }

    pub async fn fetch_orders_for_buyer(&self, buyer_id: &str) -> Vec<Order> {
        self.orders_for_buyer(buyer_id)
    }

    pub async fn fetch_orders_for_seller(&self, seller_id: &str) -> Vec<Order> {
        self.orders_for_seller(seller_id)
    }

    pub async fn fetch_threads_for_user(
        &self,
        user_id: &str,
        role: Option<Role>,
    ) -> Vec<ChatThread> {
        self.threads_for_user(user_id, role)
    }

    pub async fn fetch_messages_for_thread(&self, thread_id: i64) -> Vec<ChatMessage> {
        self.messages_for_thread(thread_id)
    }

    pub async fn fetch_cart(&self, user_id: &str) -> Vec<CartItem> {
        self.cart_items(user_id)
    }

    pub async fn fetch_wishlist(&self, user_id: &str) -> BTreeSet<i64> {
        self.wishlist(user_id)
    }

    pub async fn fetch_wallet_transactions(&self, user_id: &str) -> Vec<WalletTransaction> {
        self.wallet_transactions(user_id)
    }

    pub async fn fetch_wallet_balance(&self, user_id: &str) -> f64 {
        self.wallet_balance(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localroots_shared::constants::SLOT_PRODUCTS;

    use crate::backing::{KvBacking, MemoryBacking};
    use crate::models::NewProduct;
    use crate::store::StoreConfig;

    #[tokio::test]
    async fn fetch_mirrors_the_synchronous_reads() {
        let store = Store::open_in_memory().unwrap();
        store
            .add_product(NewProduct {
                name: "Palm Oil".to_string(),
                description: String::new(),
                price: 5_000.0,
                category: "Food".to_string(),
                community: Community::Kendem,
                seller_id: "seller-1".to_string(),
                stock: None,
                images: vec![],
            })
            .unwrap();

        let fetched = store.fetch_all_products().await;
        assert_eq!(fetched, store.all_products());
        assert_eq!(store.fetch_product(1).await.unwrap().name, "Palm Oil");
        assert!(store.fetch_product(99).await.is_none());
    }

    #[tokio::test]
    async fn fetch_never_fails_even_on_corrupt_state() {
        let backing = MemoryBacking::new();
        backing.set(SLOT_PRODUCTS, "][").unwrap();
        let store = Store::new(Box::new(backing), StoreConfig::default()).unwrap();

        assert!(store.fetch_all_products().await.is_empty());
        assert!(store.fetch_wallet_transactions("user-1").await.is_empty());
        assert_eq!(store.fetch_wallet_balance("user-1").await, 0.0);
    }
}
