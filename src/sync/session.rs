use log::{debug, warn};

use super::synchronizer::{RemoteMerge, WhiteboardSync};
use super::types::{Envelope, JOIN_SESSION_EVENT, JoinMessage, SyncMessage, WHITEBOARD_SYNC_EVENT, WhiteboardRecord};

/// The broadcast channel seam. The wasm component implements this over a
/// WebSocket; tests use an in-memory stub.
pub trait SyncTransport {
	fn is_open(&self) -> bool;
	/// Fire-and-forget send of one named event. No acknowledgment, no retry.
	fn send(&self, event: &str, payload: &str);
}

/// Drives one session's [`WhiteboardSync`] over a transport: announces the
/// session before any flush, gates flushes on transport openness (an
/// unflushed buffer just stays pending for the next tick), and decodes
/// inbound envelopes.
pub struct SessionSync<T: SyncTransport> {
	sync: WhiteboardSync,
	transport: T,
	announced: bool,
}

impl<T: SyncTransport> SessionSync<T> {
	pub fn new(session_id: impl Into<String>, transport: T) -> Self {
		Self {
			sync: WhiteboardSync::new(session_id),
			transport,
			announced: false,
		}
	}

	/// Announce presence on the session channel. Called when the transport
	/// opens; flushes are held back until this has gone out.
	pub fn announce(&mut self) {
		if self.announced || !self.transport.is_open() {
			return;
		}
		let join = JoinMessage {
			session_id: self.sync.session_id().to_string(),
		};
		self.send_event(JOIN_SESSION_EVENT, &join);
		self.announced = true;
	}

	pub fn local_upsert(&mut self, record: WhiteboardRecord) {
		self.sync.local_upsert(record);
	}

	pub fn local_remove(&mut self, id: &str) {
		self.sync.local_remove(id);
	}

	pub fn pointer_down(&mut self) {
		self.sync.pointer_down();
	}

	/// End of a stroke: back to idle, then an immediate flush attempt.
	pub fn pointer_up(&mut self) {
		self.sync.pointer_up();
		self.flush();
	}

	/// Periodic timer tick; flushes when idle with pending changes.
	pub fn tick(&mut self) {
		self.flush();
	}

	fn flush(&mut self) {
		if !self.announced || !self.transport.is_open() {
			// Buffered edits are retained; the next tick resends current state.
			return;
		}
		if let Some(msg) = self.sync.take_flush() {
			self.send_event(WHITEBOARD_SYNC_EVENT, &msg);
		}
	}

	/// Decode one inbound channel frame and merge it. Unknown events and
	/// foreign sessions produce no state change.
	pub fn handle_message(&mut self, raw: &str) -> Option<RemoteMerge> {
		let envelope: Envelope = match serde_json::from_str(raw) {
			Ok(envelope) => envelope,
			Err(err) => {
				warn!("dropping undecodable sync frame: {err}");
				return None;
			}
		};
		if envelope.event != WHITEBOARD_SYNC_EVENT {
			debug!("ignoring channel event {:?}", envelope.event);
			return None;
		}
		let msg: SyncMessage = match serde_json::from_value(envelope.data) {
			Ok(msg) => msg,
			Err(err) => {
				warn!("dropping malformed sync message: {err}");
				return None;
			}
		};
		self.sync.apply_remote(&msg)
	}

	pub fn sync(&self) -> &WhiteboardSync {
		&self.sync
	}

	fn send_event<M: serde::Serialize>(&self, event: &str, data: &M) {
		match serde_json::to_value(data) {
			Ok(data) => {
				let envelope = Envelope {
					event: event.to_string(),
					data,
				};
				match serde_json::to_string(&envelope) {
					Ok(payload) => self.transport.send(event, &payload),
					Err(err) => warn!("failed to encode {event} frame: {err}"),
				}
			}
			Err(err) => warn!("failed to encode {event} payload: {err}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::{Cell, RefCell};
	use std::rc::Rc;

	use serde_json::{Map, json};

	use super::*;

	#[derive(Clone, Default)]
	struct StubTransport {
		open: Rc<Cell<bool>>,
		sent: Rc<RefCell<Vec<(String, String)>>>,
	}

	impl SyncTransport for StubTransport {
		fn is_open(&self) -> bool {
			self.open.get()
		}

		fn send(&self, event: &str, payload: &str) {
			self.sent.borrow_mut().push((event.to_string(), payload.to_string()));
		}
	}

	fn record(id: &str, x: i64) -> WhiteboardRecord {
		let mut body = Map::new();
		body.insert("x".into(), json!(x));
		WhiteboardRecord::new(id, body)
	}

	fn open_session(id: &str) -> (SessionSync<StubTransport>, StubTransport) {
		let transport = StubTransport::default();
		transport.open.set(true);
		let mut session = SessionSync::new(id, transport.clone());
		session.announce();
		(session, transport)
	}

	#[test]
	fn join_goes_out_before_any_flush() {
		let (mut session, transport) = open_session("meetings/1");
		session.local_upsert(record("a", 1));
		session.tick();
		let sent = transport.sent.borrow();
		assert_eq!(sent[0].0, JOIN_SESSION_EVENT);
		assert_eq!(sent[1].0, WHITEBOARD_SYNC_EVENT);
		let envelope: Envelope = serde_json::from_str(&sent[0].1).unwrap();
		assert_eq!(envelope.data["sessionId"], "meetings/1");
	}

	#[test]
	fn closed_transport_retains_the_buffer() {
		let (mut session, transport) = open_session("m");
		transport.open.set(false);
		session.local_upsert(record("a", 1));
		session.tick();
		assert_eq!(transport.sent.borrow().len(), 1); // join only

		transport.open.set(true);
		session.tick();
		let sent = transport.sent.borrow();
		assert_eq!(sent.len(), 2);
		let envelope: Envelope = serde_json::from_str(&sent[1].1).unwrap();
		let msg: SyncMessage = serde_json::from_value(envelope.data).unwrap();
		assert_eq!(msg.records, vec![record("a", 1)]);
	}

	#[test]
	fn no_flush_before_announce() {
		let transport = StubTransport::default();
		transport.open.set(true);
		let mut session = SessionSync::new("m", transport.clone());
		session.local_upsert(record("a", 1));
		session.tick();
		assert!(transport.sent.borrow().is_empty());
	}

	#[test]
	fn pointer_up_flushes_immediately() {
		let (mut session, transport) = open_session("m");
		session.pointer_down();
		session.local_upsert(record("a", 1));
		session.tick();
		assert_eq!(transport.sent.borrow().len(), 1); // join only, still drawing
		session.pointer_up();
		assert_eq!(transport.sent.borrow().len(), 2);
	}

	#[test]
	fn inbound_round_trip_merges() {
		let (mut session, _transport) = open_session("m");
		let frame = json!({
			"event": WHITEBOARD_SYNC_EVENT,
			"data": {"sessionId": "m", "records": [{"id": "a", "x": 1}], "removed": []}
		});
		let merge = session.handle_message(&frame.to_string()).unwrap();
		assert_eq!(merge.upserts, vec![record("a", 1)]);
		// Echo of the same frame is a no-op.
		let merge = session.handle_message(&frame.to_string()).unwrap();
		assert!(merge.is_empty());
	}

	#[test]
	fn unknown_events_and_garbage_are_dropped() {
		let (mut session, _transport) = open_session("m");
		assert!(session.handle_message("not json").is_none());
		let frame = json!({"event": "chat-message", "data": {"text": "hi"}});
		assert!(session.handle_message(&frame.to_string()).is_none());
		let foreign = json!({
			"event": WHITEBOARD_SYNC_EVENT,
			"data": {"sessionId": "other", "records": [], "removed": ["a"]}
		});
		assert!(session.handle_message(&foreign.to_string()).is_none());
	}
}
