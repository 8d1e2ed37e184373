//! The desk: the four collections and the only sanctioned way to mutate them.
//!
//! A [`Desk`] owns its [`BlobStore`]. Opening it loads every collection,
//! seeding (and immediately saving) any collection whose blob is absent.
//! Each mutation is staged on a copy of the owning collection and kept only
//! once the whole collection has been saved. A mutation that returns an error
//! leaves both the store and the in-memory state as they were.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::clock::{Clock, IdSource, SystemClock};
use crate::error::{DeskError, EntityKind};
use crate::model::{
    Category, CategoryPatch, Comment, NewCategory, NewComment, NewTicket, NewUser, Record, Ticket,
    TicketPatch, User, UserPatch, VoteKind,
};
use crate::seed;
use crate::store::{BlobStore, load_records, save_records};

/// Ordered records of one type, addressable by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    #[must_use]
    pub const fn from_vec(records: Vec<T>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    fn prepend(&mut self, record: T) {
        self.records.insert(0, record);
    }

    fn append(&mut self, record: T) {
        self.records.push(record);
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(index))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(Record::id)
    }
}

/// Store-backed helpdesk state.
pub struct Desk<S> {
    store: S,
    clock: Box<dyn Clock>,
    ids: IdSource,
    users: Collection<User>,
    categories: Collection<Category>,
    tickets: Collection<Ticket>,
    comments: Collection<Comment>,
}

impl<S> std::fmt::Debug for Desk<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desk")
            .field("users", &self.users.len())
            .field("categories", &self.categories.len())
            .field("tickets", &self.tickets.len())
            .field("comments", &self.comments.len())
            .finish_non_exhaustive()
    }
}

fn load_or_seed<S, T>(store: &mut S, seed: fn() -> Vec<T>) -> Result<Collection<T>, DeskError>
where
    S: BlobStore,
    T: Record + Serialize + DeserializeOwned,
{
    if let Some(records) = load_records::<T>(store, T::COLLECTION)? {
        debug!(key = T::COLLECTION, records = records.len(), "loaded collection");
        return Ok(Collection::from_vec(records));
    }

    let records = seed();
    info!(key = T::COLLECTION, records = records.len(), "seeding collection with defaults");
    save_records(store, T::COLLECTION, &records)?;
    Ok(Collection::from_vec(records))
}

/// Apply `edit` to a copy of `live` and save the copy. `live` only changes
/// once the save has succeeded.
fn stage<S, T, R>(
    store: &mut S,
    live: &mut Collection<T>,
    edit: impl FnOnce(&mut Collection<T>) -> Result<R, DeskError>,
) -> Result<R, DeskError>
where
    S: BlobStore,
    T: Record + Clone + Serialize,
{
    let mut staged = live.clone();
    let out = edit(&mut staged)?;
    save_records(store, T::COLLECTION, staged.as_slice())?;
    *live = staged;
    Ok(out)
}

/// `now`, unless the clock went backwards past `previous`.
fn bump(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now < previous {
        warn!(%previous, %now, "clock regressed; keeping previous updatedAt");
        previous
    } else {
        now
    }
}

impl<S: BlobStore> Desk<S> {
    /// Load every collection from `store`, seeding the absent ones.
    pub fn open(store: S) -> Result<Self, DeskError> {
        Self::open_with_clock(store, SystemClock)
    }

    pub fn open_with_clock(mut store: S, clock: impl Clock + 'static) -> Result<Self, DeskError> {
        let users = load_or_seed(&mut store, seed::users)?;
        let categories = load_or_seed(&mut store, seed::categories)?;
        let tickets = load_or_seed(&mut store, seed::tickets)?;
        let comments = load_or_seed(&mut store, seed::comments)?;

        let mut ids = IdSource::default();
        ids.prime(users.ids());
        ids.prime(categories.ids());
        ids.prime(tickets.ids());
        ids.prime(comments.ids());

        Ok(Self {
            store,
            clock: Box::new(clock),
            ids,
            users,
            categories,
            tickets,
            comments,
        })
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give the store back, dropping the in-memory state.
    pub fn into_store(self) -> S {
        self.store
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Tickets, most recently created first.
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        self.tickets.as_slice()
    }

    /// Comments in insertion order.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        self.comments.as_slice()
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        self.categories.as_slice()
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        self.users.as_slice()
    }

    #[must_use]
    pub fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    #[must_use]
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    #[must_use]
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Case-insensitive email lookup; the first match wins.
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users
            .as_slice()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    // ------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------

    /// Add a ticket at the front of the collection.
    pub fn create_ticket(&mut self, data: NewTicket) -> Result<Ticket, DeskError> {
        let now = self.clock.now();
        let mut ids = self.ids;
        let ticket = Ticket {
            id: ids.next_id(now),
            subject: data.subject,
            description: data.description,
            category: data.category,
            status: data.status,
            priority: data.priority,
            created_by: data.created_by,
            assigned_to: data.assigned_to,
            created_at: now,
            updated_at: now,
            upvotes: Vec::new(),
            downvotes: Vec::new(),
            attachments: data.attachments,
        };

        stage(&mut self.store, &mut self.tickets, |tickets| {
            tickets.prepend(ticket.clone());
            Ok(())
        })?;
        self.ids = ids;
        info!(ticket = %ticket.id, priority = %ticket.priority, "ticket created");
        Ok(ticket)
    }

    /// Merge `patch` into ticket `id` and refresh `updatedAt`.
    pub fn update_ticket(&mut self, id: &str, patch: TicketPatch) -> Result<Ticket, DeskError> {
        let now = self.clock.now();
        let updated = stage(&mut self.store, &mut self.tickets, |tickets| {
            let ticket = tickets
                .get_mut(id)
                .ok_or_else(|| DeskError::not_found(EntityKind::Ticket, id))?;
            ticket.apply(patch);
            ticket.updated_at = bump(ticket.updated_at, now);
            Ok(ticket.clone())
        })?;

        debug!(ticket = %id, status = %updated.status, "ticket updated");
        Ok(updated)
    }

    /// Record `user_id`'s vote on `ticket_id`. See [`Ticket::cast_vote`].
    pub fn vote_ticket(
        &mut self,
        ticket_id: &str,
        user_id: &str,
        kind: VoteKind,
    ) -> Result<Ticket, DeskError> {
        let now = self.clock.now();
        let updated = stage(&mut self.store, &mut self.tickets, |tickets| {
            let ticket = tickets
                .get_mut(ticket_id)
                .ok_or_else(|| DeskError::not_found(EntityKind::Ticket, ticket_id))?;
            ticket.cast_vote(user_id, kind);
            ticket.updated_at = bump(ticket.updated_at, now);
            Ok(ticket.clone())
        })?;

        debug!(ticket = %ticket_id, user = %user_id, vote = %kind, "vote recorded");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Append a comment. The ticket reference is not checked.
    pub fn add_comment(&mut self, data: NewComment) -> Result<Comment, DeskError> {
        let now = self.clock.now();
        let mut ids = self.ids;
        let comment = Comment {
            id: ids.next_id(now),
            ticket_id: data.ticket_id,
            user_id: data.user_id,
            user_name: data.user_name,
            user_role: data.user_role,
            content: data.content,
            created_at: now,
            is_internal: data.is_internal,
        };

        stage(&mut self.store, &mut self.comments, |comments| {
            comments.append(comment.clone());
            Ok(())
        })?;
        self.ids = ids;
        debug!(comment = %comment.id, ticket = %comment.ticket_id, "comment added");
        Ok(comment)
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub fn create_category(&mut self, data: NewCategory) -> Result<Category, DeskError> {
        let now = self.clock.now();
        let mut ids = self.ids;
        let category = Category {
            id: ids.next_id(now),
            name: data.name,
            description: data.description,
            color: data.color,
            created_at: now,
        };

        stage(&mut self.store, &mut self.categories, |categories| {
            categories.append(category.clone());
            Ok(())
        })?;
        self.ids = ids;
        info!(category = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn update_category(
        &mut self,
        id: &str,
        patch: CategoryPatch,
    ) -> Result<Category, DeskError> {
        stage(&mut self.store, &mut self.categories, |categories| {
            let category = categories
                .get_mut(id)
                .ok_or_else(|| DeskError::not_found(EntityKind::Category, id))?;
            category.apply(patch);
            Ok(category.clone())
        })
    }

    /// Remove a category. Tickets that reference it keep the dangling id.
    pub fn delete_category(&mut self, id: &str) -> Result<Category, DeskError> {
        let removed = stage(&mut self.store, &mut self.categories, |categories| {
            categories
                .remove(id)
                .ok_or_else(|| DeskError::not_found(EntityKind::Category, id))
        })?;

        info!(category = %id, "category deleted");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Add a user to the collection. Emails must be unique (ignoring case).
    pub fn register_user(&mut self, data: NewUser) -> Result<User, DeskError> {
        let email = data.email.trim().to_string();
        if self.user_by_email(&email).is_some() {
            return Err(DeskError::DuplicateEmail { email });
        }

        let now = self.clock.now();
        let mut ids = self.ids;
        let user = User {
            id: ids.next_id(now),
            email,
            name: data.name,
            role: data.role,
            avatar: None,
            created_at: now,
        };

        stage(&mut self.store, &mut self.users, |users| {
            users.append(user.clone());
            Ok(())
        })?;
        self.ids = ids;
        info!(user = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Merge `patch` into user `id`. A new email is trimmed and must stay unique.
    pub fn update_user(&mut self, id: &str, mut patch: UserPatch) -> Result<User, DeskError> {
        if let Some(email) = patch.email.as_mut() {
            *email = email.trim().to_string();
            if self.user_by_email(email).is_some_and(|u| u.id != id) {
                return Err(DeskError::DuplicateEmail {
                    email: email.clone(),
                });
            }
        }

        stage(&mut self.store, &mut self.users, |users| {
            let user = users
                .get_mut(id)
                .ok_or_else(|| DeskError::not_found(EntityKind::User, id))?;
            user.apply(patch);
            Ok(user.clone())
        })
    }

    /// Remove a user. Tickets, votes and comments keep the dangling id.
    pub fn delete_user(&mut self, id: &str) -> Result<User, DeskError> {
        let removed = stage(&mut self.store, &mut self.users, |users| {
            users
                .remove(id)
                .ok_or_else(|| DeskError::not_found(EntityKind::User, id))
        })?;

        info!(user = %id, "user deleted");
        Ok(removed)
    }
}
