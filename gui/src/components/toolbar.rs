// Toolbar: engine status, strategy reload and custom strategy templates
#![allow(non_snake_case)]
use crate::app::connect_engine;
use crate::config::AppConfig;
use crate::services::EngineClient;
use crate::state::{AppState, EngineStatus};
use dioxus::prelude::*;

#[component]
pub fn Toolbar() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let engine = use_context::<Signal<Option<EngineClient>>>();
    let config = use_context::<AppConfig>();
    let mut template_name = use_signal(String::new);

    let (status, notice) = {
        let read = state.read();
        (read.status.clone(), read.notice.clone().unwrap_or_default())
    };
    let status_class = match status {
        EngineStatus::Connected => "status online",
        EngineStatus::Connecting => "status",
        EngineStatus::Offline(_) => "status offline",
    };
    let status_label = status.label();
    let offline = matches!(status, EngineStatus::Offline(_));

    let reload = move |_: MouseEvent| {
        let client = engine.read().clone();
        spawn(async move {
            let Some(mut client) = client else {
                state.write().notice = Some("Engine is not connected".to_string());
                return;
            };
            let reloaded = match client.reload_strategies().await {
                Ok(r) => r,
                Err(e) => {
                    state.write().notice = Some(format!("Reload failed: {}", e));
                    return;
                }
            };
            match client.list_strategies().await {
                Ok(strategies) => {
                    let mut s = state.write();
                    s.set_strategies(strategies);
                    s.notice = Some(format!(
                        "Strategies reloaded: {} custom, {} total",
                        reloaded.custom_count, reloaded.total_count
                    ));
                }
                Err(e) => state.write().notice = Some(format!("Listing strategies failed: {}", e)),
            }
        });
    };

    let create_template = move |_: MouseEvent| {
        let name = template_name.read().trim().to_string();
        if name.is_empty() {
            state.write().notice = Some("Enter a name for the new strategy".to_string());
            return;
        }
        let client = engine.read().clone();
        spawn(async move {
            let Some(mut client) = client else {
                state.write().notice = Some("Engine is not connected".to_string());
                return;
            };
            match client.create_strategy_template(&name).await {
                Ok(path) => {
                    template_name.set(String::new());
                    state.write().notice = Some(format!("Template written to {}; edit it and press Reload", path));
                }
                Err(e) => state.write().notice = Some(format!("Template not created: {}", e)),
            }
        });
    };

    let reconnect = move |_: MouseEvent| {
        let config = config.clone();
        spawn(async move {
            connect_engine(config, state, engine).await;
        });
    };

    rsx! {
        div { class: "toolbar",
            span { class: "{status_class}", "{status_label}" }
            if offline {
                button { onclick: reconnect, "Reconnect" }
            }
            button { onclick: reload, "Reload strategies" }
            input {
                r#type: "text",
                placeholder: "New strategy name",
                value: "{template_name}",
                oninput: move |evt| template_name.set(evt.value()),
            }
            button { onclick: create_template, "New strategy template" }
            span { class: "spacer" }
            span { "{notice}" }
        }
    }
}
