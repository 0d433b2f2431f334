use std::collections::{HashMap, HashSet};

use log::debug;

use super::types::{
	MEETING_TO_SPEAKER, MEETING_TO_UTTERANCE, NOISE_LABELS, NodeKind, RawSnapshot, RenderEdge,
	RenderGraph, RenderNode, SPEAKER_TO_UTTERANCE, UTTERANCE_TO_SPEAKER, canonical_id,
};

/// Display cap on accumulated tooltip lines per node.
const TOOLTIP_CAP: usize = 12;

/// Transform a raw backend snapshot into the render graph: admit and
/// canonicalize nodes, rewire utterance-mediated edges into direct ones,
/// derive meeting→speaker edges, and prune everything an edge no longer
/// touches. Pure and deterministic; malformed entries are skipped, never an
/// error.
pub fn preprocess(raw: &RawSnapshot) -> RenderGraph {
	// Kinds and utterance labels come from the raw node list; edges are
	// interpreted against them even for nodes that admission later drops.
	let mut raw_kinds: HashMap<&str, NodeKind> = HashMap::new();
	let mut utterance_labels: HashMap<&str, &str> = HashMap::new();
	for node in &raw.nodes {
		if node.id.is_empty() {
			continue;
		}
		let Some(kind) = NodeKind::parse(&node.kind) else {
			continue;
		};
		raw_kinds.entry(&node.id).or_insert(kind);
		if kind == NodeKind::Utterance && !node.label.trim().is_empty() {
			utterance_labels.entry(&node.id).or_insert(&node.label);
		}
	}

	// Admission: first-seen wins per canonical id.
	let mut nodes: Vec<RenderNode> = Vec::new();
	let mut index: HashMap<String, usize> = HashMap::new();
	for node in &raw.nodes {
		if node.id.is_empty() {
			debug!("dropping node with empty id");
			continue;
		}
		let Some(kind) = NodeKind::parse(&node.kind) else {
			debug!("dropping node {} with unknown type {:?}", node.id, node.kind);
			continue;
		};
		if kind == NodeKind::Utterance {
			continue;
		}
		let label = node.label.trim();
		if label.is_empty() || NOISE_LABELS.contains(&label) {
			debug!("dropping node {} with blank or noise label", node.id);
			continue;
		}
		let id = if kind == NodeKind::Speaker {
			canonical_id(&node.id)
		} else {
			node.id.as_str()
		};
		if index.contains_key(id) {
			continue;
		}
		index.insert(id.to_string(), nodes.len());
		nodes.push(RenderNode {
			id: id.to_string(),
			label: label.to_string(),
			kind,
			tooltip_utterances: Vec::new(),
		});
	}

	// Pass A: utterance parent associations over the whole edge list, so
	// rewiring below does not depend on edge order in the input.
	let mut speaker_of: HashMap<&str, String> = HashMap::new();
	let mut meeting_of: HashMap<&str, &str> = HashMap::new();
	let mut utterance_order: Vec<&str> = Vec::new();
	for edge in &raw.edges {
		let (Some(&src_kind), Some(&tgt_kind)) = (
			raw_kinds.get(edge.source.as_str()),
			raw_kinds.get(edge.target.as_str()),
		) else {
			continue;
		};
		if edge.kind == SPEAKER_TO_UTTERANCE || edge.kind == UTTERANCE_TO_SPEAKER {
			let (speaker, utterance) = match (src_kind, tgt_kind) {
				(NodeKind::Speaker, NodeKind::Utterance) => (&edge.source, &edge.target),
				(NodeKind::Utterance, NodeKind::Speaker) => (&edge.target, &edge.source),
				_ => continue,
			};
			if !speaker_of.contains_key(utterance.as_str()) && !meeting_of.contains_key(utterance.as_str()) {
				utterance_order.push(utterance);
			}
			speaker_of
				.entry(utterance)
				.or_insert_with(|| canonical_id(speaker).to_string());
		} else if edge.kind == MEETING_TO_UTTERANCE {
			let (meeting, utterance) = match (src_kind, tgt_kind) {
				(NodeKind::Meeting, NodeKind::Utterance) => (&edge.source, &edge.target),
				(NodeKind::Utterance, NodeKind::Meeting) => (&edge.target, &edge.source),
				_ => continue,
			};
			if !speaker_of.contains_key(utterance.as_str()) && !meeting_of.contains_key(utterance.as_str()) {
				utterance_order.push(utterance);
			}
			meeting_of.entry(utterance).or_insert(meeting);
		}
	}

	// Pass B: rewire utterance→keyword/topic edges into direct parent edges
	// and keep edges between surviving non-utterance nodes.
	let mut links: Vec<RenderEdge> = Vec::new();
	let mut seen: HashSet<(String, String, String)> = HashSet::new();
	let mut push_edge = |links: &mut Vec<RenderEdge>, source: &str, target: &str, kind: &str| {
		let key = (source.to_string(), target.to_string(), kind.to_string());
		if seen.insert(key) {
			links.push(RenderEdge {
				source: source.to_string(),
				target: target.to_string(),
				kind: kind.to_string(),
			});
		}
	};
	for edge in &raw.edges {
		let (Some(&src_kind), Some(&tgt_kind)) = (
			raw_kinds.get(edge.source.as_str()),
			raw_kinds.get(edge.target.as_str()),
		) else {
			debug!("skipping edge with unknown endpoint {:?} -> {:?}", edge.source, edge.target);
			continue;
		};

		let utterance_to_term = match (src_kind, tgt_kind) {
			(NodeKind::Utterance, NodeKind::Keyword | NodeKind::Topic) => {
				Some((&edge.source, &edge.target))
			}
			(NodeKind::Keyword | NodeKind::Topic, NodeKind::Utterance) => {
				Some((&edge.target, &edge.source))
			}
			_ => None,
		};

		if let Some((utterance, term)) = utterance_to_term {
			if let Some(&slot) = index.get(term.as_str()) {
				if let Some(&label) = utterance_labels.get(utterance.as_str()) {
					let tooltips = &mut nodes[slot].tooltip_utterances;
					if tooltips.len() < TOOLTIP_CAP && !tooltips.iter().any(|t| t == label) {
						tooltips.push(label.to_string());
					}
				}
				if let Some(meeting) = meeting_of.get(utterance.as_str()) {
					if index.contains_key(*meeting) {
						push_edge(&mut links, meeting, term, &edge.kind);
					}
				}
				if let Some(speaker) = speaker_of.get(utterance.as_str()) {
					if index.contains_key(speaker.as_str()) {
						push_edge(&mut links, speaker, term, &edge.kind);
					}
				}
			}
			continue;
		}

		if src_kind != NodeKind::Utterance && tgt_kind != NodeKind::Utterance {
			let source = resolve(&edge.source, src_kind);
			let target = resolve(&edge.target, tgt_kind);
			if index.contains_key(source) && index.contains_key(target) {
				push_edge(&mut links, source, target, &edge.kind);
			}
		}
	}

	// Derived meeting→speaker edges, one per utterance with both parents known.
	for utterance in utterance_order {
		match (meeting_of.get(utterance), speaker_of.get(utterance)) {
			(Some(meeting), Some(speaker)) => {
				if index.contains_key(*meeting) && index.contains_key(speaker.as_str()) {
					push_edge(&mut links, meeting, speaker, MEETING_TO_SPEAKER);
				}
			}
			(None, Some(_)) => {
				debug!("utterance {} has a speaker but no meeting; no derived edge", utterance);
			}
			_ => {}
		}
	}

	// Connectivity pruning: only nodes touched by a surviving edge remain.
	let connected: HashSet<&str> = links
		.iter()
		.flat_map(|e| [e.source.as_str(), e.target.as_str()])
		.collect();
	let nodes = nodes
		.into_iter()
		.filter(|n| connected.contains(n.id.as_str()))
		.collect();

	RenderGraph { nodes, links }
}

fn resolve(id: &str, kind: NodeKind) -> &str {
	if kind == NodeKind::Speaker { canonical_id(id) } else { id }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::types::{RawEdge, RawNode};

	fn node(id: &str, label: &str, kind: &str) -> RawNode {
		RawNode {
			id: id.into(),
			label: label.into(),
			kind: kind.into(),
		}
	}

	fn edge(source: &str, target: &str, kind: &str) -> RawEdge {
		RawEdge {
			source: source.into(),
			target: target.into(),
			kind: kind.into(),
		}
	}

	fn meeting_scenario() -> RawSnapshot {
		RawSnapshot {
			nodes: vec![
				node("meetings/m", "Planning", "meeting"),
				node("speakers/s1 (1)", "Ada", "speaker"),
				node("utterances/u1", "hello", "utterance"),
				node("keywords/k", "roadmap", "keyword"),
			],
			edges: vec![
				edge("meetings/m", "utterances/u1", MEETING_TO_UTTERANCE),
				edge("speakers/s1 (1)", "utterances/u1", SPEAKER_TO_UTTERANCE),
				edge("utterances/u1", "keywords/k", "utterance_to_keyword"),
			],
		}
	}

	#[test]
	fn rewires_utterance_edges_to_parents() {
		let out = preprocess(&meeting_scenario());
		let has = |s: &str, t: &str, k: &str| {
			out.links
				.iter()
				.any(|e| e.source == s && e.target == t && e.kind == k)
		};
		assert!(has("meetings/m", "speakers/s1", MEETING_TO_SPEAKER));
		assert!(has("speakers/s1", "keywords/k", "utterance_to_keyword"));
		assert!(has("meetings/m", "keywords/k", "utterance_to_keyword"));
		let keyword = out.nodes.iter().find(|n| n.id == "keywords/k").unwrap();
		assert_eq!(keyword.tooltip_utterances, vec!["hello".to_string()]);
	}

	#[test]
	fn no_duplicate_edge_triples() {
		let mut raw = meeting_scenario();
		// Repeat every edge; output must stay deduplicated.
		let doubled: Vec<RawEdge> = raw.edges.iter().chain(raw.edges.iter()).cloned().collect();
		raw.edges = doubled;
		let out = preprocess(&raw);
		let mut seen = std::collections::HashSet::new();
		for e in &out.links {
			assert!(
				seen.insert((e.source.clone(), e.target.clone(), e.kind.clone())),
				"duplicate edge {:?}",
				e
			);
		}
	}

	#[test]
	fn speaker_nodes_dedup_on_canonical_id_first_seen_wins() {
		let raw = RawSnapshot {
			nodes: vec![
				node("speakers/a (1)", "First", "speaker"),
				node("speakers/a (2)", "Second", "speaker"),
				node("topics/t", "budget", "topic"),
			],
			edges: vec![edge("speakers/a (2)", "topics/t", "speaker_to_topic")],
		};
		let out = preprocess(&raw);
		let speakers: Vec<_> = out
			.nodes
			.iter()
			.filter(|n| n.kind == NodeKind::Speaker)
			.collect();
		assert_eq!(speakers.len(), 1);
		assert_eq!(speakers[0].id, "speakers/a");
		assert_eq!(speakers[0].label, "First");
		// The edge endpoint was canonicalized too.
		assert!(out.links.iter().any(|e| e.source == "speakers/a"));
	}

	#[test]
	fn utterances_never_survive() {
		let out = preprocess(&meeting_scenario());
		assert!(out.nodes.iter().all(|n| n.kind != NodeKind::Utterance));
		assert!(out
			.links
			.iter()
			.all(|e| !e.source.starts_with("utterances/") && !e.target.starts_with("utterances/")));
	}

	#[test]
	fn isolated_nodes_are_pruned() {
		let mut raw = meeting_scenario();
		raw.nodes.push(node("keywords/lonely", "lonely", "keyword"));
		let out = preprocess(&raw);
		assert!(out.nodes.iter().all(|n| n.id != "keywords/lonely"));
	}

	#[test]
	fn utterance_without_meeting_yields_no_derived_edge() {
		let raw = RawSnapshot {
			nodes: vec![
				node("speakers/s", "Ada", "speaker"),
				node("utterances/u", "hi", "utterance"),
				node("keywords/k", "greeting", "keyword"),
			],
			edges: vec![
				edge("speakers/s", "utterances/u", SPEAKER_TO_UTTERANCE),
				edge("utterances/u", "keywords/k", "utterance_to_keyword"),
			],
		};
		let out = preprocess(&raw);
		assert!(out.links.iter().all(|e| e.kind != MEETING_TO_SPEAKER));
		// The speaker→keyword rewire still happens.
		assert!(out
			.links
			.iter()
			.any(|e| e.source == "speakers/s" && e.target == "keywords/k"));
	}

	#[test]
	fn parent_edges_after_utterance_edge_still_rewire() {
		// Association pass runs over the whole edge list, so input order of
		// the parent edges no longer matters.
		let mut raw = meeting_scenario();
		raw.edges.reverse();
		let out = preprocess(&raw);
		assert!(out
			.links
			.iter()
			.any(|e| e.source == "meetings/m" && e.target == "speakers/s1" && e.kind == MEETING_TO_SPEAKER));
	}

	#[test]
	fn tooltip_lines_dedup_in_first_appearance_order() {
		let mut raw = meeting_scenario();
		raw.nodes.push(node("utterances/u2", "world", "utterance"));
		raw.edges.push(edge("meetings/m", "utterances/u2", MEETING_TO_UTTERANCE));
		raw.edges.push(edge("utterances/u2", "keywords/k", "utterance_to_keyword"));
		raw.edges.push(edge("utterances/u1", "keywords/k", "utterance_to_keyword"));
		let out = preprocess(&raw);
		let keyword = out.nodes.iter().find(|n| n.id == "keywords/k").unwrap();
		assert_eq!(keyword.tooltip_utterances, vec!["hello".to_string(), "world".to_string()]);
	}

	#[test]
	fn malformed_entries_are_skipped_silently() {
		let raw = RawSnapshot {
			nodes: vec![
				node("", "no id", "keyword"),
				node("things/x", "mystery", "wormhole"),
				node("keywords/blank", "", "keyword"),
				node("keywords/noise", "undefined", "keyword"),
			],
			edges: vec![
				edge("ghosts/a", "ghosts/b", "related"),
				edge("", "", ""),
			],
		};
		let out = preprocess(&raw);
		assert!(out.nodes.is_empty());
		assert!(out.links.is_empty());
	}
}
