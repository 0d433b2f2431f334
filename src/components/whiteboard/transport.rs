use log::warn;
use web_sys::WebSocket;

use crate::sync::SyncTransport;

/// WebSocket-backed session channel. Sends are fire-and-forget; a send on a
/// closing socket just logs, and the buffer retention in `SessionSync` covers
/// convergence on the next flush.
pub struct WebSocketTransport {
	ws: WebSocket,
}

impl WebSocketTransport {
	pub fn new(ws: WebSocket) -> Self {
		Self { ws }
	}
}

impl SyncTransport for WebSocketTransport {
	fn is_open(&self) -> bool {
		self.ws.ready_state() == WebSocket::OPEN
	}

	fn send(&self, event: &str, payload: &str) {
		// The payload is the full envelope; the event name only matters for logs.
		if let Err(err) = self.ws.send_with_str(payload) {
			warn!("failed to send {event} frame: {err:?}");
		}
	}
}
