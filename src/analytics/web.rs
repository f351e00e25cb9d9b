//! Browser bindings: the page's `window` as a [`TrackingHost`] and `<script>` insertion into the
//! document.
//!
//! Nothing here holds on to JS handles; every call resolves the globals again so the handles
//! never cross the `Send + Sync` bounds of the host traits.

use std::sync::Arc;

use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};

use crate::analytics::host::{CommandQueue, TrackingFunction, TrackingHost};
use crate::analytics::script::ScriptInjector;

const GA_STUB: &str = "window.GoogleAnalyticsObject = 'ga';\
    window.ga = window.ga || function () { (window.ga.q = window.ga.q || []).push(arguments); };\
    window.ga.l = 1 * new Date();";

fn window_property(name: &str) -> Option<JsValue> {
    let window = web_sys::window()?;
    let value = js_sys::Reflect::get(&window, &JsValue::from_str(name)).ok()?;
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(value)
    }
}

fn to_js(value: &Value) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or(JsValue::UNDEFINED)
}

fn to_js_array(values: &[Value]) -> js_sys::Array {
    let array = js_sys::Array::new();
    for value in values {
        array.push(&to_js(value));
    }
    array
}

/// The current browser window.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowHost;

impl WindowHost {
    pub fn new() -> Self {
        Self
    }

    /// Installs the queueing `ga` stub from Google's loader snippet, so universal calls made
    /// before `analytics.js` finishes loading are kept by the page.
    pub fn with_ga_stub() -> Self {
        match js_sys::Function::new_no_args(GA_STUB).call0(&JsValue::NULL) {
            Ok(_) => {}
            Err(err) => log::warn!("failed to install the ga stub: {err:?}"),
        }
        Self
    }
}

struct GaqQueue;

impl CommandQueue for GaqQueue {
    fn push(&self, entry: Vec<Value>) {
        let Some(queue) = window_property("_gaq") else {
            log::warn!("_gaq disappeared from window");
            return;
        };
        // Once ga.js loads, `_gaq` is replaced by an object with its own `push`.
        let push = js_sys::Reflect::get(&queue, &JsValue::from_str("push"))
            .ok()
            .and_then(|push| push.dyn_into::<js_sys::Function>().ok());
        if let Some(push) = push {
            if let Err(err) = push.call1(&queue, &to_js_array(&entry)) {
                log::warn!("_gaq.push failed: {err:?}");
            }
        }
    }
}

struct GaFunction;

impl TrackingFunction for GaFunction {
    fn call(&self, args: &[Value]) {
        let Some(ga) = window_property("ga").and_then(|ga| ga.dyn_into::<js_sys::Function>().ok())
        else {
            return;
        };
        if let Err(err) = ga.apply(&JsValue::NULL, &to_js_array(args)) {
            log::warn!("ga call failed: {err:?}");
        }
    }
}

impl TrackingHost for WindowHost {
    /// `_gaq` is created on demand, as ga.js expects to find it.
    fn command_queue(&self) -> Option<Arc<dyn CommandQueue>> {
        let window = web_sys::window()?;
        if window_property("_gaq").is_none() {
            js_sys::Reflect::set(&window, &JsValue::from_str("_gaq"), &js_sys::Array::new())
                .ok()?;
        }
        Some(Arc::new(GaqQueue))
    }

    fn tracking_function(&self) -> Option<Arc<dyn TrackingFunction>> {
        window_property("ga")?.dyn_into::<js_sys::Function>().ok()?;
        Some(Arc::new(GaFunction))
    }

    fn disable_tracker(&self, id: &str) {
        if let Some(window) = web_sys::window() {
            let key = JsValue::from_str(&format!("ga-disable-{id}"));
            if js_sys::Reflect::set(&window, &key, &JsValue::TRUE).is_err() {
                log::warn!("failed to disable tracker {id}");
            }
        }
    }

    fn enable_trace_debugging(&self) {
        if let Some(window) = web_sys::window() {
            let debug = to_js(&serde_json::json!({ "trace": true }));
            if js_sys::Reflect::set(&window, &JsValue::from_str("ga_debug"), &debug).is_err() {
                log::warn!("failed to enable trace debugging");
            }
        }
    }
}

/// Appends async `<script>` tags to the document head.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentScriptInjector;

impl DocumentScriptInjector {
    pub fn new() -> Self {
        Self
    }
}

fn insert_script(src: &str) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("document unavailable"))?;
    let script: web_sys::HtmlScriptElement = document
        .create_element("script")?
        .dyn_into()
        .map_err(JsValue::from)?;
    script.set_async(true);
    script.set_src(src);
    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("document has no head"))?;
    head.append_child(&script)?;
    Ok(())
}

impl ScriptInjector for DocumentScriptInjector {
    fn inject(&self, src: &str) {
        if let Err(err) = insert_script(src) {
            log::warn!("failed to inject `{src}`: {err:?}");
        }
    }
}
