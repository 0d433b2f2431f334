use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Channel event carrying buffered whiteboard diffs.
pub const WHITEBOARD_SYNC_EVENT: &str = "whiteboard-sync";
/// Channel event announcing presence in a session, sent once on mount.
pub const JOIN_SESSION_EVENT: &str = "join-session";

/// One editable whiteboard unit (a shape or stroke). The sync protocol only
/// needs its identity and content equality; everything else stays opaque in
/// the flattened body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhiteboardRecord {
	pub id: String,
	#[serde(flatten)]
	pub body: Map<String, Value>,
}

impl WhiteboardRecord {
	pub fn new(id: impl Into<String>, body: Map<String, Value>) -> Self {
		Self { id: id.into(), body }
	}
}

/// One flush worth of buffered diffs, broadcast to every session participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
	#[serde(rename = "sessionId")]
	pub session_id: String,
	pub records: Vec<WhiteboardRecord>,
	pub removed: Vec<String>,
}

/// Presence announcement for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinMessage {
	#[serde(rename = "sessionId")]
	pub session_id: String,
}

/// Framing for the named-event channel: `{event, data}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
	pub event: String,
	pub data: Value,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn record_round_trips_with_opaque_body() {
		let json = json!({"id": "shape-1", "kind": "rect", "x": 4, "y": 9});
		let record: WhiteboardRecord = serde_json::from_value(json.clone()).unwrap();
		assert_eq!(record.id, "shape-1");
		assert_eq!(serde_json::to_value(&record).unwrap(), json);
	}

	#[test]
	fn sync_message_uses_wire_field_names() {
		let msg = SyncMessage {
			session_id: "meetings/1".into(),
			records: vec![],
			removed: vec!["shape-9".into()],
		};
		let value = serde_json::to_value(&msg).unwrap();
		assert_eq!(value["sessionId"], "meetings/1");
		assert_eq!(value["removed"][0], "shape-9");
	}
}
