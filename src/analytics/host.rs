//! Capabilities exposed by the page hosting the tracking scripts.
//!
//! In a browser these are the `_gaq` array and the `ga` function injected by Google's scripts.
//! Both may be missing (script not loaded yet), so adapters resolve them on every send.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// The classic `_gaq` push queue.
pub trait CommandQueue: Send + Sync {
    fn push(&self, entry: Vec<Value>);
}

/// The universal `ga` command function.
pub trait TrackingFunction: Send + Sync {
    fn call(&self, args: &[Value]);
}

pub trait TrackingHost: Send + Sync {
    fn command_queue(&self) -> Option<Arc<dyn CommandQueue>>;

    fn tracking_function(&self) -> Option<Arc<dyn TrackingFunction>>;

    /// Opts the given account out of collection (`window['ga-disable-<id>']`).
    fn disable_tracker(&self, _id: &str) {}

    fn enable_trace_debugging(&self) {}
}

/// Records every entry handed to it, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<Vec<Value>>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<Vec<Value>> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl CommandQueue for RecordingSink {
    fn push(&self, entry: Vec<Value>) {
        self.entries.lock().unwrap().push(entry);
    }
}

impl TrackingFunction for RecordingSink {
    fn call(&self, args: &[Value]) {
        self.entries.lock().unwrap().push(args.to_vec());
    }
}

#[derive(Debug, Default)]
struct MemoryHostState {
    command_queue: Option<Arc<RecordingSink>>,
    tracking_function: Option<Arc<RecordingSink>>,
    disabled: BTreeSet<String>,
    trace_debugging: bool,
}

/// In-process host that keeps what a page would receive in memory.
///
/// Targets start uninstalled; `install_*` models the script finishing its load.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<MemoryHostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with both targets already installed.
    pub fn loaded() -> Self {
        let host = Self::new();
        host.install_command_queue();
        host.install_tracking_function();
        host
    }

    pub fn install_command_queue(&self) -> Arc<RecordingSink> {
        self.state
            .lock()
            .unwrap()
            .command_queue
            .get_or_insert_with(Default::default)
            .clone()
    }

    pub fn install_tracking_function(&self) -> Arc<RecordingSink> {
        self.state
            .lock()
            .unwrap()
            .tracking_function
            .get_or_insert_with(Default::default)
            .clone()
    }

    pub fn uninstall_tracking_function(&self) {
        self.state.lock().unwrap().tracking_function = None;
    }

    pub fn uninstall_command_queue(&self) {
        self.state.lock().unwrap().command_queue = None;
    }

    /// Entries pushed onto the classic queue so far.
    pub fn queued(&self) -> Vec<Vec<Value>> {
        let sink = self.state.lock().unwrap().command_queue.clone();
        sink.map(|sink| sink.entries()).unwrap_or_default()
    }

    /// Calls made to the universal function so far.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        let sink = self.state.lock().unwrap().tracking_function.clone();
        sink.map(|sink| sink.entries()).unwrap_or_default()
    }

    pub fn clear(&self) {
        let state = self.state.lock().unwrap();
        if let Some(sink) = &state.command_queue {
            sink.clear();
        }
        if let Some(sink) = &state.tracking_function {
            sink.clear();
        }
    }

    pub fn disabled_trackers(&self) -> Vec<String> {
        self.state.lock().unwrap().disabled.iter().cloned().collect()
    }

    pub fn trace_debugging(&self) -> bool {
        self.state.lock().unwrap().trace_debugging
    }
}

impl TrackingHost for MemoryHost {
    fn command_queue(&self) -> Option<Arc<dyn CommandQueue>> {
        self.state
            .lock()
            .unwrap()
            .command_queue
            .clone()
            .map(|sink| sink as Arc<dyn CommandQueue>)
    }

    fn tracking_function(&self) -> Option<Arc<dyn TrackingFunction>> {
        self.state
            .lock()
            .unwrap()
            .tracking_function
            .clone()
            .map(|sink| sink as Arc<dyn TrackingFunction>)
    }

    fn disable_tracker(&self, id: &str) {
        self.state.lock().unwrap().disabled.insert(id.to_string());
    }

    fn enable_trace_debugging(&self) {
        self.state.lock().unwrap().trace_debugging = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn targets_are_missing_until_installed() {
        let host = MemoryHost::new();
        assert!(host.command_queue().is_none());
        assert!(host.tracking_function().is_none());

        host.install_tracking_function();
        assert!(host.tracking_function().is_some());
        assert!(host.command_queue().is_none());
    }

    #[test]
    fn install_is_idempotent() {
        let host = MemoryHost::new();
        let first = host.install_command_queue();
        first.push(vec![json!("_setAccount"), json!("UA-1")]);
        let second = host.install_command_queue();
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn records_calls_in_order() {
        let host = MemoryHost::loaded();
        let function = host.tracking_function().unwrap();
        function.call(&[json!("send"), json!("pageview")]);
        function.call(&[json!("set"), json!("page"), json!("/a")]);

        assert_eq!(
            host.calls(),
            vec![
                vec![json!("send"), json!("pageview")],
                vec![json!("set"), json!("page"), json!("/a")],
            ]
        );
        host.clear();
        assert!(host.calls().is_empty());
    }

    #[test]
    fn uninstall_drops_target() {
        let host = MemoryHost::loaded();
        host.uninstall_tracking_function();
        assert!(host.tracking_function().is_none());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn tracks_disabled_accounts_and_trace_flag() {
        let host = MemoryHost::new();
        host.disable_tracker("UA-2");
        host.disable_tracker("UA-1");
        host.enable_trace_debugging();
        assert_eq!(host.disabled_trackers(), ["UA-1", "UA-2"]);
        assert!(host.trace_debugging());
    }
}
