/// Application name
pub const APP_NAME: &str = "Local Roots";

/// Default auth token lifetime in seconds (24 hours)
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// Maximum number of images attached to a product listing
pub const MAX_PRODUCT_IMAGES: usize = 6;

/// Slot key holding the product catalogue
pub const SLOT_PRODUCTS: &str = "products";

/// Slot key holding all orders
pub const SLOT_ORDERS: &str = "orders";

/// Slot key holding chat threads
pub const SLOT_CHAT_THREADS: &str = "chat:threads";

/// Slot key holding chat messages (all threads)
pub const SLOT_CHAT_MESSAGES: &str = "chat:messages";

/// Per-user slot key prefixes.  The full key is `<prefix><user id>`.
pub const CART_SLOT_PREFIX: &str = "cart:";
pub const WISHLIST_SLOT_PREFIX: &str = "wishlist:";
pub const WALLET_SLOT_PREFIX: &str = "wallet:";
