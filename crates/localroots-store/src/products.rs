//! Catalogue operations for [`Product`] listings.
//!
//! Ownership is enforced here, client-side: only the listing seller may edit
//! or delete it.  Deletion is hard; records elsewhere that reference the
//! product by id are allowed to dangle.

use chrono::Utc;

use localroots_shared::constants::{MAX_PRODUCT_IMAGES, SLOT_PRODUCTS};
use localroots_shared::types::Community;

use crate::bus::Domain;
use crate::error::MutationError;
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::store::{next_id, Store};

impl Store {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Add a listing.  The id is assigned as `max(existing ids) + 1`.
    pub fn add_product(&self, new: NewProduct) -> Result<Product, MutationError> {
        validate_new(&new)?;

        let mut created = None;
        self.mutate_slot(Domain::Products, SLOT_PRODUCTS, |mut products: Vec<Product>| {
            let product = Product {
                id: next_id(products.iter().map(|p| p.id)),
                name: new.name.trim().to_string(),
                description: new.description.clone(),
                price: new.price,
                category: new.category.trim().to_string(),
                community: new.community,
                seller_id: new.seller_id.clone(),
                stock: new.stock,
                rating: None,
                images: new.images.clone(),
                created_at: Utc::now(),
            };
            created = Some(product.clone());
            products.push(product);
            products
        });

        // The closure always pushes, so `created` is always set.
        created.ok_or(MutationError::NotFound)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// The whole catalogue, in insertion order.
    pub fn all_products(&self) -> Vec<Product> {
        self.load_slot(SLOT_PRODUCTS)
    }

    pub fn product_by_id(&self, id: i64) -> Option<Product> {
        self.all_products().into_iter().find(|p| p.id == id)
    }

    /// Listings for one community.  A pure filter: the same stored state
    /// always yields the same result.
    pub fn products_by_community(&self, community: Community) -> Vec<Product> {
        self.all_products()
            .into_iter()
            .filter(|p| p.community == community)
            .collect()
    }

    pub fn products_by_seller(&self, seller_id: &str) -> Vec<Product> {
        self.all_products()
            .into_iter()
            .filter(|p| p.seller_id == seller_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Update / delete
    // ------------------------------------------------------------------

    /// Apply a partial update to a listing the caller owns.
    pub fn update_product(
        &self,
        id: i64,
        seller_id: &str,
        update: ProductUpdate,
    ) -> Result<Product, MutationError> {
        validate_update(&update)?;

        let mut outcome = Err(MutationError::NotFound);
        self.mutate_slot(Domain::Products, SLOT_PRODUCTS, |mut products: Vec<Product>| {
            let Some(product) = products.iter_mut().find(|p| p.id == id) else {
                outcome = Err(MutationError::NotFound);
                return products;
            };
            if product.seller_id != seller_id {
                outcome = Err(MutationError::NotOwner);
                return products;
            }

            if let Some(name) = &update.name {
                product.name = name.trim().to_string();
            }
            if let Some(description) = &update.description {
                product.description = description.clone();
            }
            if let Some(price) = update.price {
                product.price = price;
            }
            if let Some(category) = &update.category {
                product.category = category.trim().to_string();
            }
            if let Some(stock) = update.stock {
                product.stock = Some(stock);
            }
            if let Some(rating) = update.rating {
                product.rating = Some(rating);
            }
            if let Some(images) = &update.images {
                product.images = images.clone();
            }

            outcome = Ok(product.clone());
            products
        });
        outcome
    }

    /// Remove a listing the caller owns.
    pub fn delete_product(&self, id: i64, seller_id: &str) -> Result<(), MutationError> {
        let mut outcome = Err(MutationError::NotFound);
        self.mutate_slot(Domain::Products, SLOT_PRODUCTS, |mut products: Vec<Product>| {
            match products.iter().position(|p| p.id == id) {
                None => outcome = Err(MutationError::NotFound),
                Some(pos) if products[pos].seller_id != seller_id => {
                    outcome = Err(MutationError::NotOwner);
                }
                Some(pos) => {
                    products.remove(pos);
                    outcome = Ok(());
                }
            }
            products
        });
        outcome
    }
}

fn validate_new(new: &NewProduct) -> Result<(), MutationError> {
    if new.name.trim().is_empty() {
        return Err(MutationError::Validation("product name is required".into()));
    }
    if new.category.trim().is_empty() {
        return Err(MutationError::Validation("category is required".into()));
    }
    if new.seller_id.trim().is_empty() {
        return Err(MutationError::Validation("seller id is required".into()));
    }
    validate_price(new.price)?;
    if new.images.len() > MAX_PRODUCT_IMAGES {
        return Err(MutationError::Validation(format!(
            "at most {MAX_PRODUCT_IMAGES} images per listing"
        )));
    }
    Ok(())
}

fn validate_update(update: &ProductUpdate) -> Result<(), MutationError> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(MutationError::Validation("product name is required".into()));
        }
    }
    if let Some(price) = update.price {
        validate_price(price)?;
    }
    if let Some(rating) = update.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(MutationError::Validation("rating must be 0-5".into()));
        }
    }
    if let Some(images) = &update.images {
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(MutationError::Validation(format!(
                "at most {MAX_PRODUCT_IMAGES} images per listing"
            )));
        }
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), MutationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(MutationError::Validation(
            "price must be a non-negative number".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn palm_oil() -> NewProduct {
        NewProduct {
            name: "Palm Oil".to_string(),
            description: "Fresh red palm oil, 1L bottle".to_string(),
            price: 5_000.0,
            category: "Food".to_string(),
            community: Community::Kendem,
            seller_id: "seller-1".to_string(),
            stock: Some(20),
            images: vec![],
        }
    }

    #[test]
    fn add_assigns_successor_of_max_id() {
        let store = store();

        let first = store.add_product(palm_oil()).unwrap();
        assert_eq!(first.id, 1);

        let mut second = palm_oil();
        second.name = "Eru Bundle".to_string();
        let second = store.add_product(second).unwrap();
        assert_eq!(second.id, first.id + 1);

        let products = store.all_products();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Palm Oil");
        assert_eq!(products[0].price, 5_000.0);
        assert_eq!(products[0].community, Community::Kendem);
    }

    #[test]
    fn sequential_adds_produce_distinct_ids() {
        let store = store();
        for _ in 0..5 {
            store.add_product(palm_oil()).unwrap();
        }

        let mut ids: Vec<_> = store.all_products().iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn reads_are_idempotent() {
        let store = store();
        store.add_product(palm_oil()).unwrap();
        assert_eq!(store.all_products(), store.all_products());
    }

    #[test]
    fn validation_rejects_bad_listings() {
        let store = store();

        let mut nameless = palm_oil();
        nameless.name = "   ".to_string();
        assert!(matches!(
            store.add_product(nameless),
            Err(MutationError::Validation(_))
        ));

        let mut negative = palm_oil();
        negative.price = -1.0;
        assert!(matches!(
            store.add_product(negative),
            Err(MutationError::Validation(_))
        ));

        assert!(store.all_products().is_empty());
    }

    #[test]
    fn only_the_owner_may_edit_or_delete() {
        let store = store();
        let product = store.add_product(palm_oil()).unwrap();

        let update = ProductUpdate {
            price: Some(5_500.0),
            ..Default::default()
        };
        assert_eq!(
            store.update_product(product.id, "seller-2", update.clone()),
            Err(MutationError::NotOwner)
        );
        assert_eq!(
            store.delete_product(product.id, "seller-2"),
            Err(MutationError::NotOwner)
        );

        let updated = store.update_product(product.id, "seller-1", update).unwrap();
        assert_eq!(updated.price, 5_500.0);

        store.delete_product(product.id, "seller-1").unwrap();
        assert!(store.all_products().is_empty());
        assert_eq!(
            store.delete_product(product.id, "seller-1"),
            Err(MutationError::NotFound)
        );
    }

    #[test]
    fn community_filter_is_pure() {
        let store = store();
        store.add_product(palm_oil()).unwrap();

        let mut menji = palm_oil();
        menji.community = Community::Menji;
        store.add_product(menji).unwrap();

        let kendem = store.products_by_community(Community::Kendem);
        assert_eq!(kendem.len(), 1);
        assert_eq!(kendem, store.products_by_community(Community::Kendem));
        assert!(store.products_by_community(Community::Wabane).is_empty());
    }
}
