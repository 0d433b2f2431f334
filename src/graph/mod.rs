mod color;
mod poll;
mod preprocess;
mod types;

pub use color::ColorAssigner;
pub use poll::PollGate;
pub use preprocess::preprocess;
pub use types::{
	MEETING_TO_SPEAKER, MEETING_TO_UTTERANCE, NodeKind, RawEdge, RawNode, RawSnapshot, RenderEdge,
	RenderGraph, RenderNode, SPEAKER_TO_UTTERANCE, UTTERANCE_TO_SPEAKER, canonical_id,
};
