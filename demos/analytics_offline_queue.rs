//! Starts offline, records page views, then flushes them once the session comes back online.

use std::sync::Arc;

use ga_tracker_rs::analytics::{Analytics, AnalyticsConfig, MemoryHost};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = Arc::new(MemoryHost::loaded());
    let config = AnalyticsConfig::new()
        .with_account("UA-XXXXXX-xx")
        .with_start_offline(true)
        .with_test_mode();
    let analytics = Analytics::builder(config, host.clone()).build()?;

    analytics.register_script_tags();
    analytics.register_trackers();
    analytics.track_page(Some("/a"), Some("A"), None);
    analytics.track_page(Some("/b"), Some("B"), None);
    println!("offline: {}, delivered: {}", analytics.offline(None), host.calls().len());

    analytics.offline(Some(false));
    println!("offline: {}, delivered: {}", analytics.offline(None), host.calls().len());
    for call in host.calls() {
        println!("{call:?}");
    }

    Ok(())
}
