use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::components::force_graph::ForceGraphCanvas;
use crate::graph::{PollGate, RawSnapshot, RenderGraph, preprocess};

const GRAPH_ENDPOINT: &str = "/api/knowledge-graph";
const POLL_INTERVAL_MS: i32 = 7000;

/// Fetch one snapshot from the query endpoint. Any failure degrades to
/// "keep showing the previous graph" with a log line.
async fn fetch_snapshot() -> Option<RawSnapshot> {
	let window = web_sys::window()?;
	let resp = match JsFuture::from(window.fetch_with_str(GRAPH_ENDPOINT)).await {
		Ok(resp) => resp,
		Err(err) => {
			warn!("graph poll failed: {err:?}");
			return None;
		}
	};
	let resp: Response = resp.dyn_into().ok()?;
	if !resp.ok() {
		warn!("graph poll returned status {}", resp.status());
		return None;
	}
	let text = match resp.text() {
		Ok(promise) => match JsFuture::from(promise).await {
			Ok(text) => text,
			Err(err) => {
				warn!("graph poll body read failed: {err:?}");
				return None;
			}
		},
		Err(err) => {
			warn!("graph poll body read failed: {err:?}");
			return None;
		}
	};
	match serde_json::from_str(&text.as_string()?) {
		Ok(snapshot) => Some(snapshot),
		Err(err) => {
			warn!("malformed graph snapshot: {err}");
			None
		}
	}
}

/// One poll tick: skipped outright if the previous fetch is still in flight.
fn spawn_poll(gate: &PollGate, graph: RwSignal<RenderGraph>) {
	if !gate.try_begin() {
		return;
	}
	let gate = gate.clone();
	spawn_local(async move {
		if let Some(raw) = fetch_snapshot().await {
			graph.set(preprocess(&raw));
		}
		gate.finish();
	});
}

/// Stops the poll timer when the page's effects are disposed on unmount.
struct PollGuard {
	interval: Rc<Cell<Option<i32>>>,
}

impl Drop for PollGuard {
	fn drop(&mut self) {
		if let Some(handle) = self.interval.take() {
			if let Some(window) = web_sys::window() {
				window.clear_interval_with_handle(handle);
			}
		}
	}
}

/// Knowledge-map page: polls the backend snapshot, preprocesses it, and
/// feeds the force-directed canvas.
#[component]
pub fn Home() -> impl IntoView {
	let graph = RwSignal::new(RenderGraph::default());
	let gate = PollGate::new();
	let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let interval: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

	let (gate_init, tick_init, interval_init) = (gate.clone(), tick.clone(), interval.clone());
	let guard = PollGuard { interval };
	Effect::new(move |_| {
		let _ = &guard;
		if interval_init.get().is_some() {
			return;
		}
		spawn_poll(&gate_init, graph);

		let gate_tick = gate_init.clone();
		*tick_init.borrow_mut() = Some(Closure::new(move || {
			spawn_poll(&gate_tick, graph);
		}));
		if let Some(ref cb) = *tick_init.borrow() {
			let window = web_sys::window().unwrap();
			match window.set_interval_with_callback_and_timeout_and_arguments_0(
				cb.as_ref().unchecked_ref(),
				POLL_INTERVAL_MS,
			) {
				Ok(handle) => interval_init.set(Some(handle)),
				Err(err) => warn!("failed to start graph poll timer: {err:?}"),
			}
		}
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas data=graph fullscreen=true />
				<div class="graph-overlay">
					<h1>"Knowledge Map"</h1>
					<p class="subtitle">
						"Hover a keyword for its utterances. Drag nodes to reposition. Scroll to zoom."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
