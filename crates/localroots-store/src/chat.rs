//! Buyer/seller messaging.
//!
//! Threads and messages live in two slots that share the `Chat` notification
//! domain.  Messages are append-only; the only field that ever changes is
//! the `read` flag, and only from unread to read.  Clearing a thread or a
//! whole history is terminal, with no undo.

use chrono::Utc;

use localroots_shared::constants::{MAX_MESSAGE_LEN, SLOT_CHAT_MESSAGES, SLOT_CHAT_THREADS};
use localroots_shared::types::Role;

use crate::bus::Domain;
use crate::error::MutationError;
use crate::models::{ChatMessage, ChatThread, NewThread};
use crate::store::{next_id, Store};

impl Store {
    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// Open a conversation.
    ///
    /// With `enforce_unique_threads` (the default) an existing thread for
    /// the same (buyer, seller, product) triple is returned instead of
    /// creating a duplicate; with the flag off every call creates a fresh
    /// thread.
    pub fn open_thread(&self, new: NewThread) -> Result<ChatThread, MutationError> {
        if new.buyer_id.trim().is_empty() || new.seller_id.trim().is_empty() {
            return Err(MutationError::Validation(
                "buyer and seller ids are required".into(),
            ));
        }

        let dedup = self.config().enforce_unique_threads;
        let mut thread = None;
        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_THREADS,
            |mut threads: Vec<ChatThread>| {
                if dedup {
                    if let Some(existing) = threads.iter().find(|t| {
                        t.buyer_id == new.buyer_id
                            && t.seller_id == new.seller_id
                            && t.product_id == new.product_id
                    }) {
                        thread = Some(existing.clone());
                        return threads;
                    }
                }

                let created = ChatThread {
                    id: next_id(threads.iter().map(|t| t.id)),
                    buyer_id: new.buyer_id.clone(),
                    buyer_name: new.buyer_name.clone(),
                    seller_id: new.seller_id.clone(),
                    seller_name: new.seller_name.clone(),
                    product_id: new.product_id,
                    product_name: new.product_name.clone(),
                    created_at: Utc::now(),
                };
                thread = Some(created.clone());
                threads.push(created);
                threads
            },
        );
        thread.ok_or(MutationError::NotFound)
    }

    /// Threads where `user_id` participates as `role`; `None` matches either
    /// side.
    pub fn threads_for_user(&self, user_id: &str, role: Option<Role>) -> Vec<ChatThread> {
        self.load_slot::<ChatThread>(SLOT_CHAT_THREADS)
            .into_iter()
            .filter(|t| match role {
                Some(Role::Buyer) => t.buyer_id == user_id,
                Some(Role::Seller) => t.seller_id == user_id,
                None => t.buyer_id == user_id || t.seller_id == user_id,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append a message to a thread.  Thread existence is deliberately not
    /// checked; the thread id is an unenforced reference.
    pub fn send_message(
        &self,
        thread_id: i64,
        sender: Role,
        sender_name: &str,
        body: &str,
    ) -> Result<ChatMessage, MutationError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(MutationError::Validation("message body is empty".into()));
        }
        if body.chars().count() > MAX_MESSAGE_LEN {
            return Err(MutationError::Validation(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let mut sent = None;
        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_MESSAGES,
            |mut messages: Vec<ChatMessage>| {
                let message = ChatMessage {
                    id: next_id(messages.iter().map(|m| m.id)),
                    thread_id,
                    sender,
                    sender_name: sender_name.to_string(),
                    body: body.to_string(),
                    created_at: Utc::now(),
                    read: false,
                };
                sent = Some(message.clone());
                messages.push(message);
                messages
            },
        );
        sent.ok_or(MutationError::NotFound)
    }

    /// A thread's messages in send order.
    pub fn messages_for_thread(&self, thread_id: i64) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = self
            .load_slot::<ChatMessage>(SLOT_CHAT_MESSAGES)
            .into_iter()
            .filter(|m| m.thread_id == thread_id)
            .collect();
        messages.sort_by_key(|m| m.id);
        messages
    }

    /// Mark every message in the thread that was sent *to* `reader` as read.
    /// Messages the reader authored are untouched.  Returns how many flags
    /// flipped.
    pub fn mark_messages_read(&self, thread_id: i64, reader: Role) -> usize {
        let mut flipped = 0;
        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_MESSAGES,
            |mut messages: Vec<ChatMessage>| {
                flipped = 0;
                for message in messages
                    .iter_mut()
                    .filter(|m| m.thread_id == thread_id && m.sender != reader && !m.read)
                {
                    message.read = true;
                    flipped += 1;
                }
                messages
            },
        );
        flipped
    }

    /// Unread messages waiting for `reader` in one thread.
    pub fn unread_count(&self, thread_id: i64, reader: Role) -> usize {
        self.load_slot::<ChatMessage>(SLOT_CHAT_MESSAGES)
            .iter()
            .filter(|m| m.thread_id == thread_id && m.sender != reader && !m.read)
            .count()
    }

    // ------------------------------------------------------------------
    // Destructive transitions
    // ------------------------------------------------------------------

    /// Delete one thread and all its messages.  Returns `false` when the
    /// thread does not exist; a repeat call is a no-op.
    pub fn clear_thread(&self, thread_id: i64) -> bool {
        let mut existed = false;
        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_THREADS,
            |mut threads: Vec<ChatThread>| {
                let before = threads.len();
                threads.retain(|t| t.id != thread_id);
                existed = threads.len() < before;
                threads
            },
        );
        if !existed {
            return false;
        }

        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_MESSAGES,
            |mut messages: Vec<ChatMessage>| {
                messages.retain(|m| m.thread_id != thread_id);
                messages
            },
        );
        true
    }

    /// Delete every thread where `user_id` participates as `role`, plus all
    /// their messages.  Returns the number of threads removed; a repeat call
    /// removes nothing.
    pub fn clear_all_chats(&self, user_id: &str, role: Role) -> usize {
        let mut removed_ids = Vec::new();
        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_THREADS,
            |mut threads: Vec<ChatThread>| {
                removed_ids.clear();
                threads.retain(|t| {
                    let mine = match role {
                        Role::Buyer => t.buyer_id == user_id,
                        Role::Seller => t.seller_id == user_id,
                    };
                    if mine {
                        removed_ids.push(t.id);
                    }
                    !mine
                });
                threads
            },
        );
        if removed_ids.is_empty() {
            return 0;
        }

        let ids = removed_ids.clone();
        self.mutate_slot(
            Domain::Chat,
            SLOT_CHAT_MESSAGES,
            |mut messages: Vec<ChatMessage>| {
                messages.retain(|m| !ids.contains(&m.thread_id));
                messages
            },
        );
        removed_ids.len()
    }
}
