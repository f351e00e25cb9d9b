//! Fans events and e-commerce hits out to two universal trackers.
//! Only the named tracker opts into events, so the unnamed one never sees them.

use std::sync::Arc;

use ga_tracker_rs::analytics::{
    Analytics, AnalyticsConfig, Event, Item, MemoryHost, TrackerDescriptor, Transaction,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = Arc::new(MemoryHost::loaded());
    let config = AnalyticsConfig::new()
        .with_trackers([
            TrackerDescriptor::new("UA-1").with_name("t1").with_track_event(true),
            TrackerDescriptor::new("UA-2")
                // Skip e-commerce hits on the second account.
                .with_select(|call| !call.command().starts_with("ecommerce:")),
        ])
        .with_ecommerce(true, false)
        .with_test_mode();
    let analytics = Analytics::builder(config, host.clone()).build()?;

    analytics.track_event(&Event::new("Video").with_action("play").with_label("intro"));
    analytics.add_transaction(&Transaction {
        revenue: Some("12.50".into()),
        ..Transaction::new("T-1001")
    });
    analytics.add_item(&Item {
        name: Some("Poster".into()),
        quantity: Some("1".into()),
        ..Item::new("T-1001", "SKU-7")
    });
    analytics.track_trans();

    for entry in analytics.log().entries() {
        println!("{:?}", entry.to_values());
    }
    println!("ga calls: {}", host.calls().len());

    Ok(())
}
