use leptos::prelude::*;

/// 404 fallback page.
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"Not Found"</h1>
			<p>"We couldn't find that page."</p>
		</div>
	}
}
