use serde::{Deserialize, Serialize};

/// Node categories present in the backend knowledge-graph snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	Meeting,
	Utterance,
	Speaker,
	Keyword,
	Topic,
}

impl NodeKind {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"meeting" => Some(Self::Meeting),
			"utterance" => Some(Self::Utterance),
			"speaker" => Some(Self::Speaker),
			"keyword" => Some(Self::Keyword),
			"topic" => Some(Self::Topic),
			_ => None,
		}
	}
}

/// Edge kind linking a meeting to one of its utterances.
pub const MEETING_TO_UTTERANCE: &str = "meeting_to_utterance";
/// Edge kinds linking a speaker to an utterance (either direction occurs in snapshots).
pub const SPEAKER_TO_UTTERANCE: &str = "speaker_to_utterance";
pub const UTTERANCE_TO_SPEAKER: &str = "utterance_to_speaker";
/// Synthetic kind for the derived meeting→speaker edge.
pub const MEETING_TO_SPEAKER: &str = "meeting_to_speaker_via_utterance";

/// Labels that carry no information and disqualify a node from rendering.
pub const NOISE_LABELS: &[&str] = &["undefined", "[inaudible]"];

/// One node as returned by the backend query endpoint. Fields default so a
/// malformed entry degrades to "skipped by admission" instead of failing the
/// whole snapshot parse.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawNode {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub label: String,
	#[serde(rename = "type", default)]
	pub kind: String,
}

/// One edge as returned by the backend (`from`/`to` on the wire).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawEdge {
	#[serde(rename = "from", default)]
	pub source: String,
	#[serde(rename = "to", default)]
	pub target: String,
	#[serde(rename = "type", default)]
	pub kind: String,
}

/// A full server-provided graph state. Each poll supersedes the previous
/// snapshot wholesale.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSnapshot {
	#[serde(default)]
	pub nodes: Vec<RawNode>,
	#[serde(default)]
	pub edges: Vec<RawEdge>,
}

/// A node that survived preprocessing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderNode {
	pub id: String,
	pub label: String,
	#[serde(rename = "type")]
	pub kind: NodeKind,
	#[serde(rename = "tooltipUtterances")]
	pub tooltip_utterances: Vec<String>,
}

/// A deduplicated edge between two surviving nodes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderEdge {
	pub source: String,
	pub target: String,
	#[serde(rename = "type")]
	pub kind: String,
}

/// The pruned, rewired graph handed to the layout component.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderGraph {
	pub nodes: Vec<RenderNode>,
	pub links: Vec<RenderEdge>,
}

/// Strip a speaker id's disambiguation suffix: `"speakers/abc (1)"` becomes
/// `"speakers/abc"`. Ids without a suffix pass through unchanged.
pub fn canonical_id(id: &str) -> &str {
	match id.find('(') {
		Some(pos) => id[..pos].trim_end(),
		None => id,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn canonical_id_strips_suffix() {
		assert_eq!(canonical_id("speakers/abc (1)"), "speakers/abc");
		assert_eq!(canonical_id("speakers/abc(2)"), "speakers/abc");
		assert_eq!(canonical_id("speakers/abc"), "speakers/abc");
		assert_eq!(canonical_id(""), "");
	}

	#[test]
	fn snapshot_parse_tolerates_missing_fields() {
		let json = r#"{
			"nodes": [{"id": "meetings/1", "label": "Standup", "type": "meeting"}, {"label": "orphan"}],
			"edges": [{"from": "a", "to": "b", "type": "related"}, {}]
		}"#;
		let snap: RawSnapshot = serde_json::from_str(json).unwrap();
		assert_eq!(snap.nodes.len(), 2);
		assert_eq!(snap.nodes[1].id, "");
		assert_eq!(snap.edges[1].kind, "");
	}

	#[test]
	fn node_kind_parse_rejects_unknown() {
		assert_eq!(NodeKind::parse("speaker"), Some(NodeKind::Speaker));
		assert_eq!(NodeKind::parse("person"), None);
	}
}
