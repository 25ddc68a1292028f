//! End-to-end walkthrough of a marketplace session: seed a catalogue,
//! subscribe to changes, shop, check out, pay from the wallet, and chat with
//! the seller.
//!
//! Run with: `cargo run --example marketplace`

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use localroots_shared::types::{Community, Role};
use localroots_store::{Domain, NewProduct, NewThread, Store, WithdrawMethod};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("localroots_store=debug,info"));
    fmt().with_env_filter(filter).with_target(true).init();

    let store = Arc::new(Store::open_in_memory()?);

    let catalogue = store.clone();
    let _products_sub = store.subscribe(Domain::Products, move || {
        tracing::info!(count = catalogue.all_products().len(), "catalogue changed");
    });

    // A seller lists two products.
    let oil = store.add_product(NewProduct {
        name: "Palm Oil".to_string(),
        description: "Fresh red palm oil, 1L bottle".to_string(),
        price: 5_000.0,
        category: "Food".to_string(),
        community: Community::Kendem,
        seller_id: "seller-mbe".to_string(),
        stock: Some(20),
        images: vec![],
    })?;
    let honey = store.add_product(NewProduct {
        name: "Wild Honey".to_string(),
        description: "Harvested in the Fontem hills".to_string(),
        price: 3_000.0,
        category: "Food".to_string(),
        community: Community::Fontem,
        seller_id: "seller-mbe".to_string(),
        stock: Some(8),
        images: vec![],
    })?;

    // A buyer tops up, shops, and checks out.
    store.deposit("buyer-ayuk", 20_000.0, "Mobile money top-up")?;
    store.add_to_cart("buyer-ayuk", oil.id, 2)?;
    store.add_to_cart("buyer-ayuk", honey.id, 1)?;

    let order = store.checkout("buyer-ayuk", "Ayuk")?;
    let payment = store.pay_for_order("buyer-ayuk", &order)?;
    tracing::info!(
        order = order.id,
        total = order.total,
        reference = %payment.reference,
        balance = store.wallet_balance("buyer-ayuk"),
        "order placed and paid"
    );

    // Unavailable payout methods are a permanent notice, not an error loop.
    if let Err(notice) = store.withdraw("buyer-ayuk", 1_000.0, WithdrawMethod::BankTransfer) {
        tracing::warn!(%notice, "withdrawal refused");
    }

    // The buyer asks about the order.
    let thread = store.open_thread(NewThread {
        buyer_id: "buyer-ayuk".to_string(),
        buyer_name: "Ayuk".to_string(),
        seller_id: "seller-mbe".to_string(),
        seller_name: "Mbe".to_string(),
        product_id: Some(oil.id),
        product_name: Some(oil.name.clone()),
    })?;
    store.send_message(thread.id, Role::Buyer, "Ayuk", "When can you ship order #1?")?;
    tracing::info!(
        unread = store.unread_count(thread.id, Role::Seller),
        "seller has unread messages"
    );
    store.mark_messages_read(thread.id, Role::Seller);

    Ok(())
}
