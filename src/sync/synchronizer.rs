use std::collections::HashMap;
use std::mem;

use super::types::{SyncMessage, WhiteboardRecord};

/// Whether the local participant is mid-stroke. Flushes are suppressed while
/// drawing so rapid micro-edits batch into one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
	Idle,
	Drawing,
}

/// The batch of remote changes actually applied by a merge, handed back so
/// the host can mutate the editing surface in one atomic update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteMerge {
	pub upserts: Vec<WhiteboardRecord>,
	pub removed: Vec<String>,
}

impl RemoteMerge {
	pub fn is_empty(&self) -> bool {
		self.upserts.is_empty() && self.removed.is_empty()
	}
}

/// Buffered last-writer-wins synchronizer for one whiteboard session.
///
/// Local edit events accumulate in insertion-ordered buffers; `take_flush`
/// drains them into a single outbound message once interaction is idle.
/// Remote messages merge through content equality, so duplicate or echoed
/// messages are no-ops. No causal ordering is tracked: concurrent edits to
/// the same record converge to whichever flush an observer processes last.
#[derive(Debug)]
pub struct WhiteboardSync {
	session_id: String,
	interaction: Interaction,
	pending: Vec<WhiteboardRecord>,
	removed: Vec<String>,
	store: HashMap<String, WhiteboardRecord>,
}

impl WhiteboardSync {
	pub fn new(session_id: impl Into<String>) -> Self {
		Self {
			session_id: session_id.into(),
			interaction: Interaction::Idle,
			pending: Vec::new(),
			removed: Vec::new(),
			store: HashMap::new(),
		}
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	pub fn interaction(&self) -> Interaction {
		self.interaction
	}

	pub fn pointer_down(&mut self) {
		self.interaction = Interaction::Drawing;
	}

	pub fn pointer_up(&mut self) {
		self.interaction = Interaction::Idle;
	}

	/// Observe a local add/update. A pending removal of the same id is
	/// cancelled; an already-pending upsert is replaced in place.
	pub fn local_upsert(&mut self, record: WhiteboardRecord) {
		self.removed.retain(|id| *id != record.id);
		self.store.insert(record.id.clone(), record.clone());
		match self.pending.iter_mut().find(|r| r.id == record.id) {
			Some(slot) => *slot = record,
			None => self.pending.push(record),
		}
	}

	/// Observe a local removal. A pending upsert of the same id is cancelled.
	pub fn local_remove(&mut self, id: &str) {
		self.store.remove(id);
		self.pending.retain(|r| r.id != id);
		if !self.removed.iter().any(|r| r == id) {
			self.removed.push(id.to_string());
		}
	}

	pub fn has_pending(&self) -> bool {
		!self.pending.is_empty() || !self.removed.is_empty()
	}

	/// Drain the buffers into one outbound message. Returns `None` while
	/// drawing or when nothing is pending. Snapshot and clear happen in one
	/// move, so no local change observed afterwards can be lost.
	pub fn take_flush(&mut self) -> Option<SyncMessage> {
		if self.interaction == Interaction::Drawing || !self.has_pending() {
			return None;
		}
		Some(SyncMessage {
			session_id: self.session_id.clone(),
			records: mem::take(&mut self.pending),
			removed: mem::take(&mut self.removed),
		})
	}

	/// Merge a remote message. A foreign session id means no state change at
	/// all. Otherwise records are upserted only when their content differs
	/// from the local copy and removals apply unconditionally; the applied
	/// batch is returned for a single atomic surface update.
	pub fn apply_remote(&mut self, msg: &SyncMessage) -> Option<RemoteMerge> {
		if msg.session_id != self.session_id {
			log::debug!("ignoring sync message for foreign session {}", msg.session_id);
			return None;
		}
		let mut merge = RemoteMerge::default();
		for record in &msg.records {
			if self.store.get(&record.id) != Some(record) {
				self.store.insert(record.id.clone(), record.clone());
				merge.upserts.push(record.clone());
			}
		}
		for id in &msg.removed {
			self.store.remove(id);
			merge.removed.push(id.clone());
		}
		Some(merge)
	}

	/// Current merged record state, in arbitrary order.
	pub fn records(&self) -> impl Iterator<Item = &WhiteboardRecord> {
		self.store.values()
	}

	pub fn get(&self, id: &str) -> Option<&WhiteboardRecord> {
		self.store.get(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::Map;
	use serde_json::json;

	fn record(id: &str, x: i64) -> WhiteboardRecord {
		let mut body = Map::new();
		body.insert("x".into(), json!(x));
		WhiteboardRecord::new(id, body)
	}

	#[test]
	fn edits_batch_while_drawing_then_flush_once() {
		let mut sync = WhiteboardSync::new("meetings/1");
		sync.pointer_down();
		for i in 0..20 {
			sync.local_upsert(record("stroke-1", i));
		}
		sync.local_upsert(record("stroke-2", 7));
		assert_eq!(sync.take_flush(), None);
		assert_eq!(sync.take_flush(), None);

		sync.pointer_up();
		let msg = sync.take_flush().expect("one flush after pointer up");
		assert_eq!(msg.records.len(), 2);
		assert_eq!(msg.records[0], record("stroke-1", 19));
		assert_eq!(sync.take_flush(), None);
	}

	#[test]
	fn periodic_flush_only_when_idle_and_pending() {
		let mut sync = WhiteboardSync::new("meetings/1");
		assert_eq!(sync.take_flush(), None);
		sync.local_upsert(record("a", 1));
		let msg = sync.take_flush().unwrap();
		assert_eq!(msg.session_id, "meetings/1");
		assert_eq!(msg.records, vec![record("a", 1)]);
		assert!(msg.removed.is_empty());
	}

	#[test]
	fn removal_cancels_pending_upsert_and_vice_versa() {
		let mut sync = WhiteboardSync::new("m");
		sync.local_upsert(record("a", 1));
		sync.local_remove("a");
		let msg = sync.take_flush().unwrap();
		assert!(msg.records.is_empty());
		assert_eq!(msg.removed, vec!["a".to_string()]);

		sync.local_remove("b");
		sync.local_upsert(record("b", 2));
		let msg = sync.take_flush().unwrap();
		assert_eq!(msg.records, vec![record("b", 2)]);
		assert!(msg.removed.is_empty());
	}

	#[test]
	fn remote_merge_is_idempotent() {
		let mut sync = WhiteboardSync::new("m");
		let msg = SyncMessage {
			session_id: "m".into(),
			records: vec![record("a", 1)],
			removed: vec![],
		};
		let first = sync.apply_remote(&msg).unwrap();
		assert_eq!(first.upserts, vec![record("a", 1)]);
		let second = sync.apply_remote(&msg).unwrap();
		assert!(second.upserts.is_empty());
		assert_eq!(sync.get("a"), Some(&record("a", 1)));
	}

	#[test]
	fn foreign_session_messages_change_nothing() {
		let mut sync = WhiteboardSync::new("m");
		sync.local_upsert(record("local", 1));
		let msg = SyncMessage {
			session_id: "other".into(),
			records: vec![record("a", 1)],
			removed: vec!["local".into()],
		};
		assert_eq!(sync.apply_remote(&msg), None);
		assert!(sync.get("a").is_none());
		assert!(sync.get("local").is_some());
	}

	#[test]
	fn remote_removals_apply_unconditionally() {
		let mut sync = WhiteboardSync::new("m");
		sync.apply_remote(&SyncMessage {
			session_id: "m".into(),
			records: vec![record("a", 1)],
			removed: vec![],
		});
		let merge = sync
			.apply_remote(&SyncMessage {
				session_id: "m".into(),
				records: vec![],
				removed: vec!["a".into(), "never-seen".into()],
			})
			.unwrap();
		assert_eq!(merge.removed, vec!["a".to_string(), "never-seen".to_string()]);
		assert!(sync.get("a").is_none());
	}

	#[test]
	fn last_writer_wins_per_record() {
		let mut sync = WhiteboardSync::new("m");
		for x in [1, 5, 3] {
			sync.apply_remote(&SyncMessage {
				session_id: "m".into(),
				records: vec![record("a", x)],
				removed: vec![],
			});
		}
		assert_eq!(sync.get("a"), Some(&record("a", 3)));
	}

	#[test]
	fn remote_merges_do_not_feed_the_outbound_buffer() {
		let mut sync = WhiteboardSync::new("m");
		sync.apply_remote(&SyncMessage {
			session_id: "m".into(),
			records: vec![record("a", 1)],
			removed: vec![],
		});
		assert_eq!(sync.take_flush(), None);
	}
}
