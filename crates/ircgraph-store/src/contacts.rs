//! In-memory contact graph.
//!
//! The registry enforces the invariants that span more than one contact:
//! identity digests are unique graph-wide, and parent links form a forest
//! (no contact is its own parent, no cycles). Attribute edits that only touch
//! a single contact go through [`ContactRegistry::contact_mut`].

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tracing::debug;

use ircgraph_shared::Digest;

use crate::error::{Result, StoreError};
use crate::models::{Contact, ContactEvent, ContactId};

#[derive(Debug, Default)]
pub struct ContactRegistry {
    contacts: BTreeMap<ContactId, Contact>,
    by_digest: HashMap<Digest, ContactId>,
    next_id: u64,
    subscribers: Vec<mpsc::UnboundedSender<ContactEvent>>,
}

impl ContactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Create / read
    // ------------------------------------------------------------------

    /// Create a bare contact with no attributes.
    pub fn create(&mut self) -> ContactId {
        let id = ContactId(self.next_id);
        self.next_id += 1;
        self.contacts.insert(id, Contact::new(id));
        id
    }

    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.get(&id)
    }

    pub fn contact_mut(&mut self, id: ContactId) -> Option<&mut Contact> {
        self.contacts.get_mut(&id)
    }

    pub fn contains(&self, id: ContactId) -> bool {
        self.contacts.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// All contacts in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn find_by_digest(&self, digest: &Digest) -> Option<ContactId> {
        self.by_digest.get(digest).copied()
    }

    /// Resolve a digest, but only if the contact is `root` or lives below it.
    pub fn find_by_digest_in(&self, digest: &Digest, root: ContactId) -> Option<ContactId> {
        let id = self.find_by_digest(digest)?;
        if id == root || self.is_descendant_of(id, root) {
            Some(id)
        } else {
            None
        }
    }

    /// Return the contact carrying `digest`, creating and stamping a bare one
    /// if none exists. The flag is `true` when the contact was just created.
    pub fn get_or_create_by_digest(&mut self, digest: Digest) -> (ContactId, bool) {
        if let Some(id) = self.find_by_digest(&digest) {
            return (id, false);
        }

        let id = self.create();
        if let Some(contact) = self.contacts.get_mut(&id) {
            contact.digest = Some(digest);
        }
        self.by_digest.insert(digest, id);
        debug!(contact = %id, digest = %digest.short(), "Created contact for digest");
        (id, true)
    }

    // ------------------------------------------------------------------
    // Parent / child
    // ------------------------------------------------------------------

    /// Link `child` under `parent`. Rejects self-parenting and cycles.
    pub fn set_parent(&mut self, child: ContactId, parent: ContactId) -> Result<bool> {
        if !self.contains(parent) {
            return Err(StoreError::UnknownContact(parent));
        }
        if child == parent {
            return Err(StoreError::SelfParent(child));
        }
        if self.is_descendant_of(parent, child) {
            return Err(StoreError::ParentCycle { child, parent });
        }

        let contact = self
            .contacts
            .get_mut(&child)
            .ok_or(StoreError::UnknownContact(child))?;
        if contact.parent == Some(parent) {
            return Ok(false);
        }
        contact.parent = Some(parent);
        Ok(true)
    }

    /// `true` if `ancestor` appears somewhere in the parent chain of `id`.
    pub fn is_descendant_of(&self, id: ContactId, ancestor: ContactId) -> bool {
        let mut current = self.get(id).and_then(Contact::parent);
        // The parent graph is acyclic, the bound only guards against corruption.
        for _ in 0..=self.contacts.len() {
            match current {
                Some(p) if p == ancestor => return true,
                Some(p) => current = self.get(p).and_then(Contact::parent),
                None => return false,
            }
        }
        false
    }

    pub fn children_of(&self, parent: ContactId) -> Vec<ContactId> {
        self.contacts
            .values()
            .filter(|c| c.parent == Some(parent))
            .map(Contact::id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Attribute queries
    // ------------------------------------------------------------------

    pub fn find_channel(&self, server_name: &str, channel_name: &str) -> Option<ContactId> {
        self.find(|c| {
            c.server_name() == Some(server_name) && c.channel_name() == Some(channel_name)
        })
    }

    pub fn find_user(&self, server_name: &str, nick: &str) -> Option<ContactId> {
        self.find(|c| c.server_name() == Some(server_name) && c.user_name() == Some(nick))
    }

    /// Channel contacts known for a server, in creation order.
    pub fn channels_of(&self, server_name: &str) -> Vec<ContactId> {
        self.contacts
            .values()
            .filter(|c| c.server_name() == Some(server_name) && c.channel_name().is_some())
            .map(Contact::id)
            .collect()
    }

    pub fn find(&self, predicate: impl Fn(&Contact) -> bool) -> Option<ContactId> {
        self.contacts
            .values()
            .find(|c| predicate(c))
            .map(Contact::id)
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add `member` to `group`'s member list. Idempotent.
    pub fn add_member(&mut self, group: ContactId, member: ContactId) -> Result<bool> {
        if !self.contains(member) {
            return Err(StoreError::UnknownContact(member));
        }
        let contact = self
            .contacts
            .get_mut(&group)
            .ok_or(StoreError::UnknownContact(group))?;
        Ok(contact.add_member(member))
    }

    /// Remove `member` from `group`'s member list. Absence is a no-op.
    pub fn remove_member(&mut self, group: ContactId, member: ContactId) -> Result<bool> {
        let contact = self
            .contacts
            .get_mut(&group)
            .ok_or(StoreError::UnknownContact(group))?;
        Ok(contact.remove_member(member))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Register an observer for construct / update notifications.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ContactEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn notify_constructed(&mut self, id: ContactId) {
        self.notify(ContactEvent::Constructed(id));
    }

    pub fn notify_updated(&mut self, id: ContactId) {
        self.notify(ContactEvent::Updated(id));
    }

    fn notify(&mut self, event: ContactEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use ircgraph_shared::identity::hash_name;

    use super::*;

    fn digest(name: &str) -> Digest {
        hash_name(name).unwrap()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut reg = ContactRegistry::new();
        let (first, created) = reg.get_or_create_by_digest(digest("a"));
        assert!(created);

        let (second, created) = reg.get_or_create_by_digest(digest("a"));
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(first).unwrap().digest(), Some(digest("a")));
    }

    #[test]
    fn test_parent_links_stay_acyclic() {
        let mut reg = ContactRegistry::new();
        let root = reg.create();
        let channel = reg.create();
        let user = reg.create();

        assert_eq!(reg.set_parent(root, root), Err(StoreError::SelfParent(root)));
        assert_eq!(reg.set_parent(channel, root), Ok(true));
        assert_eq!(reg.set_parent(channel, root), Ok(false));
        assert_eq!(reg.set_parent(user, channel), Ok(true));
        assert_eq!(
            reg.set_parent(root, user),
            Err(StoreError::ParentCycle {
                child: root,
                parent: user
            })
        );

        assert!(reg.is_descendant_of(user, root));
        assert_eq!(reg.children_of(root), vec![channel]);
    }

    #[test]
    fn test_find_by_digest_in_scope() {
        let mut reg = ContactRegistry::new();
        let (root_a, _) = reg.get_or_create_by_digest(digest("a"));
        let (root_b, _) = reg.get_or_create_by_digest(digest("b"));
        let (child, _) = reg.get_or_create_by_digest(digest("child"));
        reg.set_parent(child, root_a).unwrap();

        assert_eq!(reg.find_by_digest_in(&digest("child"), root_a), Some(child));
        assert_eq!(reg.find_by_digest_in(&digest("child"), root_b), None);
        assert_eq!(reg.find_by_digest_in(&digest("a"), root_a), Some(root_a));
    }

    #[test]
    fn test_attribute_queries() {
        let mut reg = ContactRegistry::new();
        let channel = reg.create();
        let user = reg.create();
        {
            let c = reg.contact_mut(channel).unwrap();
            c.set_server_name("net");
            c.set_channel_name("#rust");
        }
        {
            let u = reg.contact_mut(user).unwrap();
            u.set_server_name("net");
            u.set_user_name("bob");
        }

        assert_eq!(reg.find_channel("net", "#rust"), Some(channel));
        assert_eq!(reg.find_channel("other", "#rust"), None);
        assert_eq!(reg.find_user("net", "bob"), Some(user));
        assert_eq!(reg.find_user("net", "#rust"), None);
        assert_eq!(reg.channels_of("net"), vec![channel]);
    }

    #[test]
    fn test_membership_is_idempotent() {
        let mut reg = ContactRegistry::new();
        let channel = reg.create();
        let user = reg.create();

        assert_eq!(reg.add_member(channel, user), Ok(true));
        assert_eq!(reg.add_member(channel, user), Ok(false));
        assert_eq!(reg.get(channel).unwrap().members(), &[user]);

        assert_eq!(reg.remove_member(channel, user), Ok(true));
        assert_eq!(reg.remove_member(channel, user), Ok(false));
        assert!(reg.get(channel).unwrap().members().is_empty());
    }

    #[test]
    fn test_notifications_reach_live_subscribers() {
        let mut reg = ContactRegistry::new();
        let mut rx = reg.subscribe();
        let dropped = reg.subscribe();
        drop(dropped);

        let id = reg.create();
        reg.notify_constructed(id);
        reg.notify_updated(id);

        assert_eq!(rx.try_recv().unwrap(), ContactEvent::Constructed(id));
        assert_eq!(rx.try_recv().unwrap(), ContactEvent::Updated(id));
        assert!(rx.try_recv().is_err());
        assert_eq!(reg.subscribers.len(), 1);
    }
}
