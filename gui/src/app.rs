#![allow(non_snake_case)]
use crate::components::{ResultsPanel, Sidebar, Toolbar};
use crate::config::theme::ThemePalette;
use crate::config::AppConfig;
use crate::services::EngineClient;
use crate::state::{AppState, EngineStatus};
use chrono::Local;
use dioxus::prelude::*;
use std::time::Duration;

/// Connects to the engine and loads the strategy list, recording the outcome in `state`.
pub async fn connect_engine(config: AppConfig, mut state: Signal<AppState>, mut engine: Signal<Option<EngineClient>>) {
    state.write().status = EngineStatus::Connecting;
    let timeout = Duration::from_secs(config.engine.connect_timeout_secs);
    let mut client = match EngineClient::connect(config.engine_endpoint(), timeout).await {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(endpoint = %config.engine_endpoint(), error = %e, "Engine unreachable");
            state.write().status = EngineStatus::Offline(e.to_string());
            return;
        }
    };
    match client.list_strategies().await {
        Ok(strategies) => {
            tracing::info!(count = strategies.len(), "Strategies loaded");
            let mut s = state.write();
            s.set_strategies(strategies);
            s.status = EngineStatus::Connected;
        }
        Err(e) => state.write().status = EngineStatus::Offline(e.to_string()),
    }
    engine.set(Some(client));
}

#[component]
pub fn App() -> Element {
    let config = use_context::<AppConfig>();
    let stylesheet = ThemePalette::for_name(&config.app.theme).stylesheet();
    let initial = config.clone();
    let state = use_context_provider(|| Signal::new(AppState::new(&initial, Local::now().date_naive())));
    let engine = use_context_provider(|| Signal::new(None::<EngineClient>));

    use_future(move || connect_engine(config.clone(), state, engine));

    rsx! {
        style { "{stylesheet}" }
        div { class: "layout",
            Toolbar {}
            div { class: "main",
                Sidebar {}
                div { class: "content", ResultsPanel {} }
            }
        }
    }
}
