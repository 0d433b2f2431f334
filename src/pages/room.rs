use leptos::prelude::*;
use leptos_router::hooks::use_params_map;

use crate::components::whiteboard::SyncSurface;
use crate::sync::WhiteboardRecord;

/// Meeting-room page: the collaborative whiteboard surface for one session.
#[component]
pub fn Room() -> impl IntoView {
	let params = use_params_map();
	let session_id = params
		.get_untracked()
		.get("id")
		.unwrap_or_else(|| "lobby".to_string());
	let records = RwSignal::new(Vec::<WhiteboardRecord>::new());

	view! {
		<div class="meeting-room">
			<SyncSurface session_id=session_id records=records>
				<p class="board-status">
					{move || format!("{} shapes on the board", records.get().len())}
				</p>
			</SyncSurface>
		</div>
	}
}
