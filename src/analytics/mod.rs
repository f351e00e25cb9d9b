mod api;
mod config;
mod constants;
mod dispatch;
pub mod ecommerce;
pub mod error;
mod gate;
pub mod host;
mod namer;
mod page;
mod queue;
mod script;
mod transport;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub mod web;

pub use api::{Analytics, AnalyticsBuilder};
pub use config::{
    AnalyticsConfig, AnalyticsSettings, EcommerceMode, SelectFn, TrackerDescriptor,
    TrackerSettings, TransportMode,
};
pub use dispatch::{Dispatcher, IncludeFn};
pub use ecommerce::{ActionFields, CartAction, Event, Impression, Item, Product, Promo, Transaction};
pub use error::{AnalyticsError, AnalyticsErrorCode, AnalyticsResult};
pub use gate::FeatureGate;
pub use host::{CommandQueue, MemoryHost, RecordingSink, TrackingFunction, TrackingHost};
pub use namer::{command_name, TrackerRef};
pub use page::{PageContext, StaticPage};
pub use queue::OfflineQueue;
pub use script::{protocol, script_sources, RecordingInjector, ScriptInjector, ScriptSources};
pub use transport::{adapter_for, ClassicAdapter, TrackingCall, TransportAdapter, UniversalAdapter};
