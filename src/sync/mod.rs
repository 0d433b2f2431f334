mod session;
mod synchronizer;
mod types;

pub use session::{SessionSync, SyncTransport};
pub use synchronizer::{Interaction, RemoteMerge, WhiteboardSync};
pub use types::{
	Envelope, JOIN_SESSION_EVENT, JoinMessage, SyncMessage, WHITEBOARD_SYNC_EVENT, WhiteboardRecord,
};
