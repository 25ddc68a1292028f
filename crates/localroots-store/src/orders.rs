//! Order placement and fulfilment status.
//!
//! Order lines are snapshots: name, price, and seller are copied from the
//! catalogue at placement so later listing edits (or deletion) never rewrite
//! history.  Status is a flat enum; any status may be set to any other.

use chrono::Utc;

use localroots_shared::constants::SLOT_ORDERS;

use crate::bus::Domain;
use crate::error::MutationError;
use crate::models::{Order, OrderLine, OrderStatus};
use crate::store::{next_id, Store};

impl Store {
    /// Place an order with explicit lines.
    pub fn place_order(
        &self,
        buyer_id: &str,
        buyer_name: &str,
        lines: Vec<OrderLine>,
    ) -> Result<Order, MutationError> {
        if lines.is_empty() {
            return Err(MutationError::Validation("order has no items".into()));
        }
        for line in &lines {
            if line.quantity == 0 {
                return Err(MutationError::Validation(
                    "line quantity must be positive".into(),
                ));
            }
            if !line.price.is_finite() || line.price < 0.0 {
                return Err(MutationError::Validation(
                    "line price must be a non-negative number".into(),
                ));
            }
        }

        let total: f64 = lines
            .iter()
            .map(|l| l.price * f64::from(l.quantity))
            .sum();

        let mut created = None;
        self.mutate_slot(Domain::Orders, SLOT_ORDERS, |mut orders: Vec<Order>| {
            let order = Order {
                id: next_id(orders.iter().map(|o| o.id)),
                buyer_id: buyer_id.to_string(),
                buyer_name: buyer_name.to_string(),
                items: lines.clone(),
                total,
                status: OrderStatus::Pending,
                created_at: Utc::now(),
            };
            created = Some(order.clone());
            orders.push(order);
            orders
        });
        created.ok_or(MutationError::NotFound)
    }

    /// Turn the user's cart into an order, then clear the cart.
    ///
    /// Cart lines whose product has since been deleted are dropped with a
    /// warning; an order needs at least one resolvable line.
    pub fn checkout(&self, user_id: &str, buyer_name: &str) -> Result<Order, MutationError> {
        let cart = self.cart_items(user_id);
        if cart.is_empty() {
            return Err(MutationError::Validation("cart is empty".into()));
        }

        let mut lines = Vec::new();
        for item in &cart {
            match self.product_by_id(item.product_id) {
                Some(product) => lines.push(OrderLine {
                    product_id: product.id,
                    name: product.name,
                    price: item.unit_price,
                    quantity: item.quantity,
                    seller_id: product.seller_id,
                }),
                None => tracing::warn!(
                    product_id = item.product_id,
                    "cart line references a deleted product; dropping it"
                ),
            }
        }
        if lines.is_empty() {
            return Err(MutationError::Validation(
                "no cart line references an existing product".into(),
            ));
        }

        let order = self.place_order(user_id, buyer_name, lines)?;
        self.clear_cart(user_id);
        Ok(order)
    }

    /// Move an order to `status`.  No transition graph is enforced.
    pub fn set_order_status(
        &self,
        id: i64,
        status: OrderStatus,
    ) -> Result<Order, MutationError> {
        let mut outcome = Err(MutationError::NotFound);
        self.mutate_slot(Domain::Orders, SLOT_ORDERS, |mut orders: Vec<Order>| {
            if let Some(order) = orders.iter_mut().find(|o| o.id == id) {
                order.status = status;
                outcome = Ok(order.clone());
            } else {
                outcome = Err(MutationError::NotFound);
            }
            orders
        });
        outcome
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.load_slot(SLOT_ORDERS)
    }

    pub fn order_by_id(&self, id: i64) -> Option<Order> {
        self.all_orders().into_iter().find(|o| o.id == id)
    }

    pub fn orders_for_buyer(&self, buyer_id: &str) -> Vec<Order> {
        self.all_orders()
            .into_iter()
            .filter(|o| o.buyer_id == buyer_id)
            .collect()
    }

    /// Orders containing at least one line sold by `seller_id`.
    pub fn orders_for_seller(&self, seller_id: &str) -> Vec<Order> {
        self.all_orders()
            .into_iter()
            .filter(|o| o.items.iter().any(|l| l.seller_id == seller_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localroots_shared::types::Community;

    use crate::models::NewProduct;

    fn seed(store: &Store, name: &str, price: f64, seller: &str) -> i64 {
        store
            .add_product(NewProduct {
                name: name.to_string(),
                description: String::new(),
                price,
                category: "Food".to_string(),
                community: Community::Kendem,
                seller_id: seller.to_string(),
                stock: None,
                images: vec![],
            })
            .unwrap()
            .id
    }

    #[test]
    fn checkout_snapshots_lines_and_clears_the_cart() {
        let store = Store::open_in_memory().unwrap();
        let oil = seed(&store, "Palm Oil", 5_000.0, "seller-1");
        let honey = seed(&store, "Honey", 3_000.0, "seller-2");

        store.add_to_cart("buyer-1", oil, 2).unwrap();
        store.add_to_cart("buyer-1", honey, 1).unwrap();

        let order = store.checkout("buyer-1", "Ayuk").unwrap();
        assert_eq!(order.id, 1);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total, 13_000.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(store.cart_items("buyer-1").is_empty());

        // Later catalogue edits do not touch the order.
        store.delete_product(oil, "seller-1").unwrap();
        let stored = store.order_by_id(order.id).unwrap();
        assert_eq!(stored.items[0].name, "Palm Oil");
        assert_eq!(stored.total, 13_000.0);
    }

    #[test]
    fn checkout_drops_dangling_cart_lines() {
        let store = Store::open_in_memory().unwrap();
        let oil = seed(&store, "Palm Oil", 5_000.0, "seller-1");
        let honey = seed(&store, "Honey", 3_000.0, "seller-1");

        store.add_to_cart("buyer-1", oil, 1).unwrap();
        store.add_to_cart("buyer-1", honey, 1).unwrap();
        store.delete_product(honey, "seller-1").unwrap();

        let order = store.checkout("buyer-1", "Ayuk").unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, oil);
    }

    #[test]
    fn empty_cart_cannot_check_out() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.checkout("buyer-1", "Ayuk"),
            Err(MutationError::Validation(_))
        ));
    }

    #[test]
    fn status_moves_freely_between_all_states() {
        let store = Store::open_in_memory().unwrap();
        let oil = seed(&store, "Palm Oil", 5_000.0, "seller-1");
        store.add_to_cart("buyer-1", oil, 1).unwrap();
        let order = store.checkout("buyer-1", "Ayuk").unwrap();

        let delivered = store
            .set_order_status(order.id, OrderStatus::Delivered)
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        // Even backwards: there is no transition graph.
        let pending = store
            .set_order_status(order.id, OrderStatus::Pending)
            .unwrap();
        assert_eq!(pending.status, OrderStatus::Pending);

        assert_eq!(
            store.set_order_status(999, OrderStatus::Shipped),
            Err(MutationError::NotFound)
        );
    }

    #[test]
    fn seller_filter_matches_any_line() {
        let store = Store::open_in_memory().unwrap();
        let oil = seed(&store, "Palm Oil", 5_000.0, "seller-1");
        let honey = seed(&store, "Honey", 3_000.0, "seller-2");

        store.add_to_cart("buyer-1", oil, 1).unwrap();
        store.add_to_cart("buyer-1", honey, 1).unwrap();
        store.checkout("buyer-1", "Ayuk").unwrap();

        assert_eq!(store.orders_for_seller("seller-1").len(), 1);
        assert_eq!(store.orders_for_seller("seller-2").len(), 1);
        assert!(store.orders_for_seller("seller-3").is_empty());
        assert_eq!(store.orders_for_buyer("buyer-1").len(), 1);
        assert!(store.orders_for_buyer("buyer-2").is_empty());
    }
}
