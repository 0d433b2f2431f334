use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, PointerEvent, WebSocket, Window};

use super::transport::WebSocketTransport;
use crate::sync::{SessionSync, WhiteboardRecord};

/// Worst-case latency for remote visibility of idle edits.
const FLUSH_INTERVAL_MS: i32 = 150;
const WS_PATH: &str = "/ws/whiteboard";

type Session = Rc<RefCell<Option<SessionSync<WebSocketTransport>>>>;

/// Owned by the setup effect; dropped when the component unmounts. Leaving a
/// session stops the flush timer and unsubscribes from the channel; an
/// in-flight send is allowed to complete.
struct ChannelGuard {
	socket: Rc<RefCell<Option<WebSocket>>>,
	interval: Rc<Cell<Option<i32>>>,
}

impl Drop for ChannelGuard {
	fn drop(&mut self) {
		if let Some(handle) = self.interval.take() {
			if let Some(window) = web_sys::window() {
				window.clear_interval_with_handle(handle);
			}
		}
		if let Some(ws) = self.socket.borrow_mut().take() {
			ws.set_onopen(None);
			ws.set_onmessage(None);
			let _ = ws.close();
		}
	}
}

/// Wires one whiteboard session to the broadcast channel. Wraps the drawing
/// surface; pointer events bubbling out of it drive the drawing/idle state,
/// edits to `records` are diffed into the outbound buffer, and remote merges
/// land in `records` as one batched update.
#[component]
pub fn SyncSurface(
	#[prop(into)] session_id: String,
	records: RwSignal<Vec<WhiteboardRecord>>,
	children: Children,
) -> impl IntoView {
	let session: Session = Rc::new(RefCell::new(None));
	let socket: Rc<RefCell<Option<WebSocket>>> = Rc::new(RefCell::new(None));
	let on_open: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let on_message: Rc<RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>> =
		Rc::new(RefCell::new(None));
	let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let interval: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

	let (session_init, socket_init, on_open_init, on_message_init, tick_init, interval_init) = (
		session.clone(),
		socket.clone(),
		on_open.clone(),
		on_message.clone(),
		tick.clone(),
		interval.clone(),
	);
	let session_id_init = session_id.clone();
	let guard = ChannelGuard {
		socket: socket.clone(),
		interval: interval.clone(),
	};

	Effect::new(move |_| {
		let _ = &guard;
		if session_init.borrow().is_some() {
			return;
		}
		let window: Window = web_sys::window().unwrap();
		let location = window.location();
		let scheme = match location.protocol().as_deref() {
			Ok("https:") => "wss",
			_ => "ws",
		};
		let host = location.host().unwrap_or_default();
		let url = format!("{scheme}://{host}{WS_PATH}");

		let ws = match WebSocket::new(&url) {
			Ok(ws) => ws,
			Err(err) => {
				warn!("whiteboard channel unavailable: {err:?}");
				return;
			}
		};

		*session_init.borrow_mut() = Some(SessionSync::new(
			session_id_init.clone(),
			WebSocketTransport::new(ws.clone()),
		));

		let session_open = session_init.clone();
		*on_open_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *session_open.borrow_mut() {
				s.announce();
			}
		}));
		if let Some(ref cb) = *on_open_init.borrow() {
			ws.set_onopen(Some(cb.as_ref().unchecked_ref()));
		}

		let session_msg = session_init.clone();
		*on_message_init.borrow_mut() = Some(Closure::new(move |ev: MessageEvent| {
			let Some(raw) = ev.data().as_string() else {
				return;
			};
			let merge = match *session_msg.borrow_mut() {
				Some(ref mut s) => s.handle_message(&raw),
				None => None,
			};
			let Some(merge) = merge else {
				return;
			};
			if merge.is_empty() {
				return;
			}
			// One signal update, so observers never see a partial merge.
			records.update(|list| {
				for record in merge.upserts {
					match list.iter_mut().find(|r| r.id == record.id) {
						Some(slot) => *slot = record,
						None => list.push(record),
					}
				}
				list.retain(|r| !merge.removed.contains(&r.id));
			});
		}));
		if let Some(ref cb) = *on_message_init.borrow() {
			ws.set_onmessage(Some(cb.as_ref().unchecked_ref()));
		}

		let session_tick = session_init.clone();
		*tick_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *session_tick.borrow_mut() {
				s.tick();
			}
		}));
		if let Some(ref cb) = *tick_init.borrow() {
			match window.set_interval_with_callback_and_timeout_and_arguments_0(
				cb.as_ref().unchecked_ref(),
				FLUSH_INTERVAL_MS,
			) {
				Ok(handle) => interval_init.set(Some(handle)),
				Err(err) => warn!("failed to start flush timer: {err:?}"),
			}
		}

		*socket_init.borrow_mut() = Some(ws);
	});

	// Local edit observation: diff the surface state against the session's
	// record mirror. Remote merges already match the mirror, so echoing them
	// back through here is a no-op.
	let session_diff = session.clone();
	Effect::new(move |_| {
		let current = records.get();
		let mut guard = session_diff.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		let removed: Vec<String> = s
			.sync()
			.records()
			.map(|r| r.id.clone())
			.filter(|id| !current.iter().any(|r| r.id == *id))
			.collect();
		for id in removed {
			s.local_remove(&id);
		}
		for record in current {
			if s.sync().get(&record.id) != Some(&record) {
				s.local_upsert(record);
			}
		}
	});

	let session_down = session.clone();
	let on_pointerdown = move |_: PointerEvent| {
		if let Some(ref mut s) = *session_down.borrow_mut() {
			s.pointer_down();
		}
	};

	let session_up = session.clone();
	let on_pointerup = move |_: PointerEvent| {
		if let Some(ref mut s) = *session_up.borrow_mut() {
			s.pointer_up();
		}
	};

	let session_leave = session.clone();
	let on_pointerleave = move |_: PointerEvent| {
		if let Some(ref mut s) = *session_leave.borrow_mut() {
			s.pointer_up();
		}
	};

	view! {
		<div
			class="whiteboard-sync-surface"
			on:pointerdown=on_pointerdown
			on:pointerup=on_pointerup
			on:pointerleave=on_pointerleave
		>
			{children()}
		</div>
	}
}
