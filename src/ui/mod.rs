use leptos::*;
use crate::core::config::Config;
use crate::core::state::{Page, Status, WorkflowState};
use crate::services::gemini::{GeminiClient, StoryClient};
use crate::services::workflow::WorkflowController;
use std::sync::Arc;

#[component]
pub fn App() -> impl IntoView {
    let config = Config::default();

    // A missing key is fatal: no run is ever attempted.
    let client = GeminiClient::new(&config).map(|c| Arc::new(c) as Arc<dyn StoryClient>);

    view! {
        <div class="app-container">
            <h1>"Storybook"</h1>
            {match client {
                Ok(client) => view! { <Book config=config client=client/> }.into_view(),
                Err(e) => view! { <p class="error">{e.to_string()}</p> }.into_view(),
            }}
        </div>
    }
}

#[component]
pub fn Book(config: Config, client: Arc<dyn StoryClient>) -> impl IntoView {
    let (state, set_state) = create_signal(WorkflowState::new(config.total_pages));

    let controller = WorkflowController::new(&config, client)
        .with_observer(move |s: &WorkflowState| set_state.set(s.clone()));
    set_state.set(controller.snapshot());

    let current_page = create_memo(move |_| state.with(|s| s.current_page().cloned()));
    let is_first = create_memo(move |_| state.with(WorkflowState::is_first_page));
    let is_last = create_memo(move |_| state.with(WorkflowState::is_last_page));
    let page_label = move || {
        state.with(|s| format!("{} / {}", s.current_page_index + 1, s.total_pages))
    };

    let start = {
        let controller = controller.clone();
        move || {
            let controller = controller.clone();
            spawn_local(async move {
                if let Err(e) = controller.generate_story().await {
                    leptos::logging::error!("Story run failed: {}", e);
                }
            });
        }
    };

    let start_on_load = start.clone();
    create_effect(move |_| start_on_load());

    let on_restart = move |_| start();
    let on_prev = {
        let controller = controller.clone();
        move |_| controller.retreat_page()
    };
    let on_next = move |_| controller.advance_page();

    view! {
        <div class="book">
            <p class="progress">{move || state.with(|s| s.progress_message.clone())}</p>

            <Show when=move || state.with(|s| s.status == Status::Error)>
                <p class="error">{move || state.with(|s| s.error_message.clone())}</p>
            </Show>

            <Show when=move || current_page.with(Option::is_some)>
                <div class="page">
                    <Show
                        when=move || current_page.with(|p| p.as_ref().is_some_and(Page::has_image))
                        fallback=|| view! { <div class="image-placeholder"></div> }
                    >
                        <img
                            class="illustration"
                            src=move || current_page.with(|p| p.as_ref().map(|p| p.image_url.clone()).unwrap_or_default())
                        />
                    </Show>
                    <p class="page-text">
                        {move || current_page.with(|p| p.as_ref().map(|p| p.text.clone()).unwrap_or_default())}
                    </p>
                </div>
                <div class="controls">
                    <button on:click=on_prev.clone() disabled=move || is_first.get()>"Previous"</button>
                    <span class="page-number">{page_label}</span>
                    <button on:click=on_next.clone() disabled=move || is_last.get()>"Next"</button>
                </div>
            </Show>

            <button
                class="restart"
                on:click=on_restart
                disabled=move || state.with(|s| s.status == Status::Generating)
            >
                "New story"
            </button>
        </div>
    }
}
