// Backtest form: market, capital, strategy and its parameters.
#![allow(non_snake_case)]
use crate::services::EngineClient;
use crate::state::AppState;
use dioxus::prelude::*;
use engine::services::ParamSpec;
use shared::models::Interval;

#[component]
fn ParamInput(spec: ParamSpec, value: f64) -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let range_spec = spec.clone();
    let number_spec = spec.clone();
    let shown = if spec.kind == "int" { format!("{:.0}", value) } else { format!("{}", value) };

    rsx! {
        div { class: "param",
            label { title: "{spec.description}", "{spec.name}" }
            div { class: "row",
                input {
                    r#type: "range",
                    min: "{spec.min}",
                    max: "{spec.max}",
                    step: "{spec.step}",
                    value: "{value}",
                    oninput: move |evt| {
                        if let Ok(v) = evt.value().parse::<f64>() {
                            state.write().form.set_param(&range_spec, v);
                        }
                    },
                }
                input {
                    r#type: "number",
                    min: "{spec.min}",
                    max: "{spec.max}",
                    step: "{spec.step}",
                    value: "{shown}",
                    onchange: move |evt| {
                        if let Ok(v) = evt.value().parse::<f64>() {
                            state.write().form.set_param(&number_spec, v);
                        }
                    },
                }
            }
        }
    }
}

#[component]
pub fn Sidebar() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let engine = use_context::<Signal<Option<EngineClient>>>();

    let (form, strategy_names, params, running, form_error, description) = {
        let read = state.read();
        let selected = read.selected_strategy();
        let params: Vec<(ParamSpec, f64)> = selected
            .map(|info| {
                info.params
                    .iter()
                    .map(|p| (p.clone(), read.form.params.get(&p.name).copied().unwrap_or(p.default_value)))
                    .collect()
            })
            .unwrap_or_default();
        (
            read.form.clone(),
            read.strategies.iter().map(|s| s.name.clone()).collect::<Vec<_>>(),
            params,
            read.running,
            read.form_error.clone().unwrap_or_default(),
            selected.map(|s| s.description.clone()).unwrap_or_default(),
        )
    };
    let intervals: Vec<(&str, bool)> = Interval::ALL.iter().map(|i| (i.as_str(), *i == form.interval)).collect();
    let commission_label = format!("{:.2}%", form.commission_pct);

    let execute = move |_: MouseEvent| {
        let requests = state.read().form.requests();
        let requests = match requests {
            Ok(requests) => requests,
            Err(message) => {
                state.write().form_error = Some(message);
                return;
            }
        };
        let client = engine.read().clone();
        let Some(mut client) = client else {
            state.write().form_error = Some("Engine is not connected".to_string());
            return;
        };
        {
            let mut s = state.write();
            s.form_error = None;
            s.running = true;
        }
        tracing::info!(runs = requests.len(), "Submitting backtest");
        spawn(async move {
            let outcomes = client.run_batch(requests).await;
            state.write().finish_run(outcomes);
        });
    };

    rsx! {
        div { class: "sidebar",
            label { "Symbols (comma separated)" }
            input {
                r#type: "text",
                value: "{form.symbols}",
                oninput: move |evt| state.write().form.symbols = evt.value(),
            }
            label { "Start date" }
            input {
                r#type: "date",
                value: "{form.start_date}",
                oninput: move |evt| state.write().form.start_date = evt.value(),
            }
            label { "End date" }
            input {
                r#type: "date",
                value: "{form.end_date}",
                oninput: move |evt| state.write().form.end_date = evt.value(),
            }
            label { "Interval" }
            select {
                onchange: move |evt| {
                    if let Ok(interval) = evt.value().parse::<Interval>() {
                        state.write().form.interval = interval;
                    }
                },
                for (code, selected) in intervals {
                    option { key: "{code}", value: "{code}", selected: selected, "{code}" }
                }
            }
            label { "Initial capital" }
            input {
                r#type: "number",
                min: "1",
                step: "100",
                value: "{form.initial_capital}",
                onchange: move |evt| {
                    if let Ok(v) = evt.value().parse::<f64>() {
                        state.write().form.initial_capital = v;
                    }
                },
            }
            label { "Commission: {commission_label}" }
            input {
                r#type: "range",
                min: "0",
                max: "1",
                step: "0.01",
                value: "{form.commission_pct}",
                oninput: move |evt| {
                    if let Ok(v) = evt.value().parse::<f64>() {
                        state.write().form.commission_pct = v;
                    }
                },
            }
            label { "Strategy" }
            select {
                onchange: move |evt| {
                    let name = evt.value();
                    let info = state.read().strategies.iter().find(|s| s.name == name).cloned();
                    if let Some(info) = info {
                        state.write().form.select_strategy(&info);
                    }
                },
                for name in strategy_names {
                    option { key: "{name}", value: "{name}", selected: name == form.strategy, "{name}" }
                }
            }
            if !description.is_empty() {
                p { class: "placeholder", style: "padding: 4px 0; text-align: left;", "{description}" }
            }
            for (spec, value) in params {
                ParamInput { key: "{spec.name}", spec: spec.clone(), value: value }
            }
            div { class: "check",
                input {
                    r#type: "checkbox",
                    checked: form.use_ai,
                    onchange: move |_| {
                        let mut s = state.write();
                        s.form.use_ai = !s.form.use_ai;
                    },
                }
                span { "AI insights" }
            }
            div { class: "check",
                input {
                    r#type: "checkbox",
                    checked: form.include_benchmark,
                    onchange: move |_| {
                        let mut s = state.write();
                        s.form.include_benchmark = !s.form.include_benchmark;
                    },
                }
                span { "Compare with benchmark" }
            }
            button { class: "execute", disabled: running, onclick: execute,
                if running { "Running..." } else { "Execute backtest" }
            }
            if !form_error.is_empty() {
                div { class: "error", "{form_error}" }
            }
        }
    }
}
