// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription advertisement table with liveness-based aging.
//!
//! Tracks, per group, which remote nodes advertised a subscription and via
//! which multi-hop forwarding paths the advertisement arrived. Entries whose
//! liveness evidence (last refresh) has expired are swept out periodically,
//! and a dead relay invalidates every path that routed through it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default staleness threshold: 60 seconds without a refresh
const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_millis(60_000);

/// A remote node's advertised subscription within one group
///
/// Owned by value inside its group entry; all lookups are by key traversal,
/// so no shared pointers are needed.
#[derive(Debug, Clone)]
struct SubscribingNode {
    /// Forwarding paths the advertisement arrived over, most recent first.
    /// A path encodes a relay chain as colon-separated hops ("A:B:C").
    paths: Vec<String>,

    /// Last time an add/refresh touched this node.
    last_refresh: Instant,
}

impl SubscribingNode {
    fn new(now: Instant) -> Self {
        Self {
            paths: Vec::new(),
            last_refresh: now,
        }
    }
}

/// One group's advertisement state: subscribing nodes keyed by node id
#[derive(Debug, Clone, Default)]
struct SubscriptionEntry {
    nodes: HashMap<String, SubscribingNode>,
}

/// Check whether a colon-separated path routes through `node_id`
///
/// Hop-exact: "A:N2:C" references "N2", "A:N22:C" does not. Substring
/// matching would strip unrelated paths whenever one node id prefixes
/// another.
fn path_references(path: &str, node_id: &str) -> bool {
    path.split(':').any(|hop| hop == node_id)
}

/// Subscription advertisement table
///
/// In-memory and volatile: advertisement state is liveness evidence, not
/// durable fact, and is rebuilt from scratch after a restart.
///
/// # State machine (per subscribing node)
///
/// **active** (recently refreshed) -> **stale** (refresh age exceeds the
/// threshold) -> **removed**. The stale -> removed transition happens only
/// during an explicit [`refresh_table`](Self::refresh_table) sweep, never
/// lazily on read.
///
/// # Locking
///
/// All state sits behind one internal mutex, so every method takes `&self`
/// and the table can be shared between the message-arrival path and the
/// periodic sweep without external coordination. Callers that already
/// serialize access pay one uncontended lock.
///
/// # Example
///
/// ```
/// use driftsub::SubscriptionTable;
///
/// let table = SubscriptionTable::new();
/// table.add_subscribing_node_path("chat", "N1", "A:N1");
/// assert!(table.has_subscribing_node("chat", "N1"));
/// assert!(table.has_subscribing_node_path("chat", "N1", "A:N1"));
/// ```
#[derive(Debug)]
pub struct SubscriptionTable {
    groups: Mutex<HashMap<String, SubscriptionEntry>>,
    stale_threshold: Duration,
}

impl SubscriptionTable {
    /// Create a table with the default 60 s staleness threshold
    pub fn new() -> Self {
        Self::with_stale_threshold(DEFAULT_STALE_THRESHOLD)
    }

    /// Create a table with a custom staleness threshold
    ///
    /// A node is swept once `now - last_refresh > threshold`, so a zero
    /// threshold expires everything not refreshed in the same instant.
    pub fn with_stale_threshold(threshold: Duration) -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            stale_threshold: threshold,
        }
    }

    /// Configured staleness threshold
    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }

    /// Ensure an (empty) entry exists for `group`
    ///
    /// No-op when the group is already known.
    pub fn add_subscription(&self, group: &str) {
        let mut groups = self.groups.lock();
        groups.entry(group.to_string()).or_default();
    }

    /// Record `node_id` as a subscriber of `group`
    ///
    /// Creates the group entry if absent. A duplicate add leaves the
    /// existing node untouched -- it is not an implicit refresh; only path
    /// additions refresh the liveness clock.
    pub fn add_subscribing_node(&self, group: &str, node_id: &str) {
        let now = Instant::now();
        let mut groups = self.groups.lock();
        groups
            .entry(group.to_string())
            .or_default()
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| SubscribingNode::new(now));
    }

    /// Record a forwarding path for `node_id`'s subscription to `group`
    ///
    /// Auto-creates group and node entries as needed, prepends `path` to
    /// the node's path list (most recent first) and refreshes the node's
    /// liveness clock.
    pub fn add_subscribing_node_path(&self, group: &str, node_id: &str, path: &str) {
        let now = Instant::now();
        let mut groups = self.groups.lock();
        let node = groups
            .entry(group.to_string())
            .or_default()
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| SubscribingNode::new(now));
        node.paths.insert(0, path.to_string());
        node.last_refresh = now;
    }

    /// Check whether any advertisement state exists for `group`
    pub fn has_subscription(&self, group: &str) -> bool {
        self.groups.lock().contains_key(group)
    }

    /// Check whether `node_id` is a known subscriber of `group`
    pub fn has_subscribing_node(&self, group: &str, node_id: &str) -> bool {
        self.groups
            .lock()
            .get(group)
            .is_some_and(|entry| entry.nodes.contains_key(node_id))
    }

    /// Check whether `node_id` subscribes to any group
    pub fn has_subscribing_node_anywhere(&self, node_id: &str) -> bool {
        self.groups
            .lock()
            .values()
            .any(|entry| entry.nodes.contains_key(node_id))
    }

    /// Check whether the exact `path` string is recorded for the node
    pub fn has_subscribing_node_path(&self, group: &str, node_id: &str, path: &str) -> bool {
        self.groups
            .lock()
            .get(group)
            .and_then(|entry| entry.nodes.get(node_id))
            .is_some_and(|node| node.paths.iter().any(|p| p == path))
    }

    /// Snapshot of the node's recorded paths, most recent first
    ///
    /// Empty when the group or node is unknown.
    pub fn node_paths(&self, group: &str, node_id: &str) -> Vec<String> {
        self.groups
            .lock()
            .get(group)
            .and_then(|entry| entry.nodes.get(node_id))
            .map(|node| node.paths.clone())
            .unwrap_or_default()
    }

    /// Remove `group` and all of its advertisement state
    pub fn remove_subscription(&self, group: &str) {
        self.groups.lock().remove(group);
    }

    /// Remove `node_id` from `group`
    ///
    /// The group entry itself is kept even when it becomes empty; only the
    /// aging sweep drops emptied groups.
    pub fn remove_subscribing_node(&self, group: &str, node_id: &str) {
        if let Some(entry) = self.groups.lock().get_mut(group) {
            entry.nodes.remove(node_id);
        }
    }

    /// Remove one exact path string from the node's path list
    pub fn remove_subscribing_node_path(&self, group: &str, node_id: &str, path: &str) {
        if let Some(entry) = self.groups.lock().get_mut(group) {
            if let Some(node) = entry.nodes.get_mut(node_id) {
                node.paths.retain(|p| p != path);
            }
        }
    }

    /// Age out stale subscribers and invalidate paths through them
    ///
    /// Two phases, matching the anti-entropy sweep of the dissemination
    /// layer:
    ///
    /// 1. Every node whose refresh age exceeds the staleness threshold is
    ///    removed; a group whose node map empties is removed with it.
    /// 2. Every surviving node in every surviving group loses any path that
    ///    routed through one of the just-removed node ids -- a stale relay
    ///    invalidates routes even in groups it never directly subscribed
    ///    to.
    ///
    /// Returns the number of distinct node ids removed; a node aged out of
    /// several groups at once counts once.
    pub fn refresh_table(&self) -> usize {
        let now = Instant::now();
        let mut groups = self.groups.lock();

        // Phase 1: collect and remove stale nodes, then emptied groups.
        let mut removed_ids: Vec<String> = Vec::new();
        for (group, entry) in groups.iter_mut() {
            let stale: Vec<String> = entry
                .nodes
                .iter()
                .filter(|(_, node)| now.duration_since(node.last_refresh) > self.stale_threshold)
                .map(|(id, _)| id.clone())
                .collect();
            for id in stale {
                log::debug!(
                    "SubscriptionTable: aging out node {} from group {}",
                    id,
                    group
                );
                entry.nodes.remove(&id);
                if !removed_ids.contains(&id) {
                    removed_ids.push(id);
                }
            }
        }
        groups.retain(|_, entry| !entry.nodes.is_empty());

        // Phase 2: a removed node may have relayed advertisements for
        // others; strip every path that routed through it.
        if !removed_ids.is_empty() {
            for entry in groups.values_mut() {
                for node in entry.nodes.values_mut() {
                    node.paths
                        .retain(|p| !removed_ids.iter().any(|id| path_references(p, id)));
                }
            }
        }

        removed_ids.len()
    }

    /// Immediate cascade cleanup for a node known to be dead
    ///
    /// Without waiting for the aging sweep: removes `node_id`'s own
    /// subscriptions from every group (dropping groups that empty out) and
    /// strips, from every remaining node's path list in every group, any
    /// path that routed through `node_id` -- whether or not the dead node
    /// ever directly subscribed there.
    pub fn dead_node(&self, node_id: &str) {
        let mut groups = self.groups.lock();

        for entry in groups.values_mut() {
            entry.nodes.remove(node_id);
        }
        groups.retain(|_, entry| !entry.nodes.is_empty());

        for (group, entry) in groups.iter_mut() {
            for (id, node) in entry.nodes.iter_mut() {
                let before = node.paths.len();
                node.paths.retain(|p| !path_references(p, node_id));
                if node.paths.len() != before {
                    log::debug!(
                        "SubscriptionTable: dead node {} invalidated {} path(s) of {} in group {}",
                        node_id,
                        before - node.paths.len(),
                        id,
                        group
                    );
                }
            }
        }
    }

    /// Number of groups with advertisement state
    pub fn group_count(&self) -> usize {
        self.groups.lock().len()
    }

    /// True when no advertisement state is held at all
    pub fn is_empty(&self) -> bool {
        self.groups.lock().is_empty()
    }
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}
