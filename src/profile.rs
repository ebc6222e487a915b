//! Read-only view of the externally owned user/widget model
//!
//! The dashboard object model, its persistence and tag membership live
//! outside this crate. The query engine and the orphan collector only need
//! a narrow read surface, expressed as the [`ProfileView`] trait.
//!
//! Implementors must treat `referenced_pins` as an atomic snapshot of the
//! full widget tree (tiles, templates and tag membership already expanded):
//! the orphan collector deletes everything the snapshot does not reference,
//! so a partial snapshot risks false deletion.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::types::PinAddress;

/// Read-only accessor over users, widget pin references and tag membership
pub trait ProfileView: Send + Sync {
    /// All known user names
    fn users(&self) -> Vec<String>;

    /// Every pin address referenced by any widget of any of the user's
    /// dashboards, with tiles/templates and tags expanded
    fn referenced_pins(&self, user: &str) -> HashSet<PinAddress>;

    /// Ordered member device ids of a tag, empty when the tag is unknown
    fn tag_devices(&self, user: &str, dash_id: u32, tag_id: u32) -> Vec<u32>;
}

#[derive(Default)]
struct UserEntry {
    pins: HashSet<PinAddress>,
    tags: HashMap<(u32, u32), Vec<u32>>,
}

/// In-memory [`ProfileView`] for tests and embedding
#[derive(Default)]
pub struct StaticProfileView {
    users: RwLock<HashMap<String, UserEntry>>,
}

impl StaticProfileView {
    /// Create an empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a widget pin reference for `user`
    pub fn add_reference(&self, user: &str, address: PinAddress) {
        self.users
            .write()
            .entry(user.to_string())
            .or_default()
            .pins
            .insert(address);
    }

    /// Register a user with no references yet
    pub fn add_user(&self, user: &str) {
        self.users.write().entry(user.to_string()).or_default();
    }

    /// Set a tag's member devices for `user`/`dash_id`
    pub fn set_tag(&self, user: &str, dash_id: u32, tag_id: u32, devices: Vec<u32>) {
        self.users
            .write()
            .entry(user.to_string())
            .or_default()
            .tags
            .insert((dash_id, tag_id), devices);
    }
}

impl ProfileView for StaticProfileView {
    fn users(&self) -> Vec<String> {
        self.users.read().keys().cloned().collect()
    }

    fn referenced_pins(&self, user: &str) -> HashSet<PinAddress> {
        self.users
            .read()
            .get(user)
            .map(|entry| entry.pins.clone())
            .unwrap_or_default()
    }

    fn tag_devices(&self, user: &str, dash_id: u32, tag_id: u32) -> Vec<u32> {
        self.users
            .read()
            .get(user)
            .and_then(|entry| entry.tags.get(&(dash_id, tag_id)).cloned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PinType;

    #[test]
    fn test_static_profile_view() {
        let view = StaticProfileView::new();
        view.add_reference("mark", PinAddress::new(0, PinType::Virtual, 88));
        view.set_tag("mark", 1, 100_000, vec![0, 1]);

        assert_eq!(view.users(), vec!["mark".to_string()]);
        assert!(view
            .referenced_pins("mark")
            .contains(&PinAddress::new(0, PinType::Virtual, 88)));
        assert_eq!(view.tag_devices("mark", 1, 100_000), vec![0, 1]);
        assert!(view.tag_devices("mark", 1, 999).is_empty());
        assert!(view.referenced_pins("nobody").is_empty());
    }
}
