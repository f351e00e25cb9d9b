use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use crate::analytics::config::{AnalyticsConfig, EcommerceMode, TrackerDescriptor, TransportMode};
use crate::analytics::constants::*;
use crate::analytics::dispatch::{Dispatcher, IncludeFn};
use crate::analytics::ecommerce::{
    ActionFields, CartAction, Event, Impression, Item, Product, Promo, Transaction,
};
use crate::analytics::error::AnalyticsResult;
use crate::analytics::gate::FeatureGate;
use crate::analytics::host::TrackingHost;
use crate::analytics::namer::command_name;
use crate::analytics::page::{PageContext, StaticPage};
use crate::analytics::queue::OfflineQueue;
use crate::analytics::script::{script_sources, ScriptInjector};
use crate::analytics::transport::{adapter_for, TrackingCall, TransportAdapter};
use crate::logger::CallLog;
use crate::util::obj::{assign, string_or_null};

fn tracks_events(tracker: &TrackerDescriptor) -> bool {
    tracker.track_event()
}

fn tracks_ecommerce(tracker: &TrackerDescriptor) -> bool {
    tracker.track_ecommerce()
}

/// Tracking service for one page session.
///
/// Every operation is synchronous and infallible: problems are reported as warnings on
/// [`Analytics::log`] and the affected call is skipped.
#[derive(Clone)]
pub struct Analytics {
    inner: Arc<AnalyticsInner>,
}

impl fmt::Debug for Analytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analytics")
            .field("transport", &self.inner.config.transport)
            .field("trackers", &self.inner.config.trackers.len())
            .field("offline", &self.inner.queue.is_offline())
            .finish()
    }
}

struct AnalyticsInner {
    config: AnalyticsConfig,
    trackers: Mutex<Arc<Vec<TrackerDescriptor>>>,
    log: CallLog,
    host: Arc<dyn TrackingHost>,
    page: Arc<dyn PageContext>,
    injector: Option<Arc<dyn ScriptInjector>>,
    queue: Arc<OfflineQueue>,
    dispatcher: Dispatcher,
    gate: FeatureGate,
    scripts_registered: AtomicBool,
    trackers_registered: AtomicBool,
}

/// Assembles an [`Analytics`] service from a configuration and the host capabilities.
pub struct AnalyticsBuilder {
    config: AnalyticsConfig,
    host: Arc<dyn TrackingHost>,
    page: Option<Arc<dyn PageContext>>,
    injector: Option<Arc<dyn ScriptInjector>>,
    log: Option<CallLog>,
}

impl AnalyticsBuilder {
    pub fn new(config: AnalyticsConfig, host: Arc<dyn TrackingHost>) -> Self {
        Self {
            config,
            host,
            page: None,
            injector: None,
            log: None,
        }
    }

    pub fn with_page_context(mut self, page: Arc<dyn PageContext>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_script_injector(mut self, injector: Arc<dyn ScriptInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Records into an existing log instead of a fresh one.
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Validates the configuration and starts the service.
    ///
    /// Unless script injection is delayed, the script tags and trackers are registered before
    /// this returns.
    pub fn build(self) -> AnalyticsResult<Analytics> {
        let mut config = self.config;
        config.validate()?;

        let log = self.log.unwrap_or_else(|| CallLog::new(CALL_LOG_TARGET));
        if config.transport == TransportMode::Classic && config.trackers.len() > 1 {
            log.warn(WARN_MULTIPLE_CLASSIC_TRACKERS);
            config.trackers.truncate(1);
        }

        let queue = Arc::new(OfflineQueue::new(config.start_offline));
        let adapter = adapter_for(
            config.transport,
            Arc::clone(&self.host),
            Arc::clone(&queue),
            log.clone(),
            config.log_all_calls,
        );
        let dispatcher = Dispatcher::new(adapter, config.unqualified_fallback);
        let gate = FeatureGate::new(config.ecommerce, log.clone());
        let page = self
            .page
            .unwrap_or_else(|| Arc::new(StaticPage::new()) as Arc<dyn PageContext>);

        let inner = AnalyticsInner {
            trackers: Mutex::new(Arc::new(config.trackers.clone())),
            config,
            log,
            host: self.host,
            page,
            injector: self.injector,
            queue,
            dispatcher,
            gate,
            scripts_registered: AtomicBool::new(false),
            trackers_registered: AtomicBool::new(false),
        };
        let analytics = Analytics {
            inner: Arc::new(inner),
        };
        analytics.bootstrap();
        Ok(analytics)
    }
}

impl Analytics {
    pub fn builder(config: AnalyticsConfig, host: Arc<dyn TrackingHost>) -> AnalyticsBuilder {
        AnalyticsBuilder::new(config, host)
    }

    pub fn log(&self) -> &CallLog {
        &self.inner.log
    }

    pub fn configuration(&self) -> &AnalyticsConfig {
        &self.inner.config
    }

    /// Current tracker list; normalized once [`Analytics::register_trackers`] has run.
    pub fn trackers(&self) -> Vec<TrackerDescriptor> {
        self.tracker_snapshot().as_ref().clone()
    }

    /// Registers scripts and trackers unless script injection is delayed.
    pub fn bootstrap(&self) {
        if self.inner.config.delay_script_tag {
            return;
        }
        self.register_script_tags();
        self.register_trackers();
    }

    /// Loads the tracking script for the active transport. Only the first call has an effect.
    pub fn register_script_tags(&self) -> bool {
        if self.inner.scripts_registered.swap(true, Ordering::SeqCst) {
            self.inner.log.warn(WARN_SCRIPTS_ALREADY_CREATED);
            return false;
        }
        let config = &self.inner.config;

        if config.disable_analytics {
            for tracker in &config.trackers {
                self.inner
                    .log
                    .info(format!("Analytics disabled: {}", tracker.id()));
                self.inner.host.disable_tracker(tracker.id());
            }
        }

        let sources = script_sources(config, &self.inner.page.scheme());
        if config.test_mode {
            self.inner
                .log
                .record(LOG_LABEL_INJECT, vec![Value::String(sources.tracker)]);
        } else {
            self.inject(&sources.tracker);
        }

        if config.transport == TransportMode::Universal && config.trace_debugging {
            self.inner.host.enable_trace_debugging();
        }
        if let Some(experiment) = sources.experiment {
            self.inject(&experiment);
        }
        true
    }

    /// Normalizes the configured trackers and issues their creation commands.
    ///
    /// Runs once; later calls return `true` without sending anything. Returns `false` when no
    /// tracker is configured.
    pub fn register_trackers(&self) -> bool {
        let config = &self.inner.config;
        if config.trackers.is_empty() {
            self.inner.log.warn(WARN_NO_ACCOUNTS);
            return false;
        }
        if self.inner.trackers_registered.swap(true, Ordering::SeqCst) {
            return true;
        }

        let mut trackers = config.trackers.clone();
        for tracker in &mut trackers {
            tracker.normalize(config);
        }
        let trackers = Arc::new(trackers);
        *self.inner.trackers.lock().unwrap() = Arc::clone(&trackers);

        match config.transport {
            TransportMode::Universal => {
                for tracker in trackers.iter() {
                    self.create_universal_tracker(tracker);
                }
            }
            TransportMode::Classic => self.create_classic_tracker(&trackers[0]),
        }
        true
    }

    fn create_universal_tracker(&self, tracker: &TrackerDescriptor) {
        let config = &self.inner.config;
        self.send_direct(
            CMD_CREATE,
            vec![
                Value::String(tracker.id().to_string()),
                Value::Object(tracker.fields().clone()),
            ],
        );

        if config.hybrid_mobile_support {
            self.send_direct(
                command_name(CMD_SET, tracker),
                vec![json!("checkProtocolTask"), Value::Null],
            );
        }
        for (key, value) in tracker.set_fields() {
            self.send_direct(
                command_name(CMD_SET, tracker),
                vec![Value::String(key.clone()), value.clone()],
            );
        }

        if tracker.cross_domain_linker() {
            self.send_direct(command_name(CMD_REQUIRE, tracker), vec![json!("linker")]);
            self.send_direct(
                command_name(CMD_LINKER_AUTO_LINK, tracker),
                vec![json!(tracker.cross_link_domains())],
            );
        }
        if tracker.display_features() {
            self.send_direct(
                command_name(CMD_REQUIRE, tracker),
                vec![json!("displayfeatures")],
            );
        }
        if tracker.track_ecommerce() {
            if config.ecommerce == EcommerceMode::Enhanced {
                self.send_direct(command_name(CMD_REQUIRE, tracker), vec![json!("ec")]);
                self.send_direct(
                    command_name(CMD_SET, tracker),
                    vec![json!("&cu"), Value::String(config.currency.clone())],
                );
            } else {
                self.send_direct(command_name(CMD_REQUIRE, tracker), vec![json!("ecommerce")]);
            }
        }
        if tracker.enhanced_link_attribution() {
            self.send_direct(command_name(CMD_REQUIRE, tracker), vec![json!("linkid")]);
        }

        if config.track_routes && !config.ignore_first_page_load {
            self.send_direct(
                command_name(CMD_SEND, tracker),
                vec![json!("pageview"), Value::String(self.track_prefix_url(None))],
            );
        }
    }

    fn create_classic_tracker(&self, tracker: &TrackerDescriptor) {
        let config = &self.inner.config;
        self.send_direct(
            CMD_SET_ACCOUNT,
            vec![Value::String(tracker.id().to_string())],
        );
        if let Some(domain) = config.domain_name.as_deref().filter(|d| !d.is_empty()) {
            self.send_direct(CMD_SET_DOMAIN_NAME, vec![json!(domain)]);
        }
        if config.enhanced_link_attribution {
            self.send_direct(
                CMD_CLASSIC_REQUIRE,
                vec![json!("inpage_linkid"), json!(INPAGE_LINKID_PLUGIN)],
            );
        }
        if config.track_routes && !config.ignore_first_page_load {
            if config.remove_pattern.is_some() {
                self.send_direct(CMD_TRACK_PAGEVIEW, vec![Value::String(self.current_url())]);
            } else {
                self.send_direct(CMD_TRACK_PAGEVIEW, Vec::new());
            }
        }
    }

    /// The page URL to report: the route's tracking URL when reading from routes, else the path
    /// (or path and query) with the removal pattern stripped.
    pub fn current_url(&self) -> String {
        let config = &self.inner.config;
        if config.read_from_route {
            if let Some(page_track) = self.inner.page.route_page_track() {
                return page_track;
            }
        }
        let url = if config.track_url_params {
            self.inner.page.url()
        } else {
            self.inner.page.path()
        };
        match &config.remove_pattern {
            Some(pattern) => pattern.replace_all(&url, "").into_owned(),
            None => url,
        }
    }

    fn track_prefix_url(&self, url: Option<&str>) -> String {
        let url = match url.filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None => self.current_url(),
        };
        format!("{}{}", self.inner.config.track_prefix, url)
    }

    /// Campaign fields for the `utm_*` parameters of the current page.
    pub fn utm_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for (key, value) in self.inner.page.query() {
            if let Some((_, field)) = UTM_CAMPAIGN_FIELDS.iter().find(|(utm, _)| *utm == key) {
                fields.insert(field.to_string(), Value::String(value));
            }
        }
        fields
    }

    /// Reports a page view. `url` and `title` default to the current page.
    pub fn track_page(&self, url: Option<&str>, title: Option<&str>, custom: Option<&Value>) {
        let title = match title.filter(|title| !title.is_empty()) {
            Some(title) => title.to_string(),
            None => self.inner.page.title(),
        };
        let page = self.track_prefix_url(url);

        match self.transport() {
            TransportMode::Classic => {
                self.send_direct(CMD_CLASSIC_SET, vec![json!("title"), Value::String(title)]);
                self.send_direct(CMD_TRACK_PAGEVIEW, vec![Value::String(page)]);
            }
            TransportMode::Universal => {
                let mut fields = Map::new();
                fields.insert("page".into(), Value::String(page));
                fields.insert("title".into(), Value::String(title));
                fields.extend(self.utm_fields());
                if let Some(custom) = custom {
                    assign(&mut fields, custom);
                }
                self.dispatch(None, CMD_SEND, vec![json!("pageview"), Value::Object(fields)]);
            }
        }
    }

    /// Tracks a page view for the current route, if route tracking is on.
    ///
    /// With `read_from_route`, routes that declare no tracking URL are skipped.
    pub fn on_route_change(&self) -> bool {
        let config = &self.inner.config;
        if !config.track_routes {
            return false;
        }
        if config.read_from_route && self.inner.page.route_page_track().is_none() {
            return false;
        }
        self.track_page(None, None, None);
        true
    }

    /// Reports `event` to the trackers that accept events.
    pub fn track_event(&self, event: &Event) {
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_TRACK_EVENT, event.classic_args()),
            TransportMode::Universal => {
                let mut args = vec![json!("event")];
                args.extend(event.universal_args(&self.track_prefix_url(None)));
                let include: IncludeFn<'_> = &tracks_events;
                self.dispatch(Some(include), CMD_SEND, args);
            }
        }
    }

    pub fn add_transaction(&self, transaction: &Transaction) {
        if !self.inner.gate.classic_ecommerce_allowed(OP_ADD_TRANS, true) {
            return;
        }
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_ADD_TRANS, transaction.classic_args()),
            TransportMode::Universal => self.dispatch_ecommerce(
                CMD_ECOMMERCE_ADD_TRANSACTION,
                vec![transaction.universal_fields(&self.inner.config.currency)],
            ),
        }
    }

    pub fn add_item(&self, item: &Item) {
        if !self.inner.gate.classic_ecommerce_allowed(OP_ADD_ITEM, true) {
            return;
        }
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_ADD_ITEM, item.classic_args()),
            TransportMode::Universal => {
                self.dispatch_ecommerce(CMD_ECOMMERCE_ADD_ITEM, vec![item.universal_fields()])
            }
        }
    }

    /// Sends the pending transaction and its items.
    pub fn track_trans(&self) {
        if !self.inner.gate.classic_ecommerce_allowed(OP_TRACK_TRANS, true) {
            return;
        }
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_TRACK_TRANS, Vec::new()),
            TransportMode::Universal => self.dispatch_ecommerce(CMD_ECOMMERCE_SEND, Vec::new()),
        }
    }

    /// Discards the pending transaction. Universal transport only.
    pub fn clear_trans(&self) {
        if !self.universal_only(OP_CLEAR_TRANS) {
            return;
        }
        if self.inner.gate.classic_ecommerce_allowed(OP_CLEAR_TRANS, true) {
            self.dispatch_ecommerce(CMD_ECOMMERCE_CLEAR, Vec::new());
        }
    }

    pub fn add_product(&self, product: &Product) {
        if !self.inner.gate.enhanced_ecommerce_allowed(OP_ADD_PRODUCT, true) {
            return;
        }
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_ADD_PRODUCT, product.classic_args()),
            TransportMode::Universal => {
                self.dispatch_ecommerce(CMD_EC_ADD_PRODUCT, vec![product.universal_fields()])
            }
        }
    }

    pub fn add_impression(&self, impression: &Impression) {
        if !self.inner.gate.enhanced_ecommerce_allowed(OP_ADD_IMPRESSION, true) {
            return;
        }
        match self.transport() {
            TransportMode::Classic => {
                self.send_direct(CMD_ADD_IMPRESSION, impression.classic_args())
            }
            TransportMode::Universal => self
                .dispatch_ecommerce(CMD_EC_ADD_IMPRESSION, vec![impression.universal_fields()]),
        }
    }

    pub fn add_promo(&self, promo: &Promo) {
        if !self.inner.gate.enhanced_ecommerce_allowed(OP_ADD_PROMO, true) {
            return;
        }
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_ADD_PROMO, promo.classic_args()),
            TransportMode::Universal => {
                self.dispatch_ecommerce(CMD_EC_ADD_PROMO, vec![promo.universal_fields()])
            }
        }
    }

    /// Sets the enhanced e-commerce action for the next hit.
    pub fn set_action(&self, action: &str, fields: Option<&Value>) {
        if !self.inner.gate.enhanced_ecommerce_allowed(OP_SET_ACTION, true) {
            return;
        }
        let mut args = vec![Value::String(action.to_string())];
        if let Some(fields) = fields {
            args.push(fields.clone());
        }
        match self.transport() {
            TransportMode::Classic => self.send_direct(CMD_SET_ACTION, args),
            TransportMode::Universal => self.dispatch_ecommerce(CMD_EC_SET_ACTION, args),
        }
    }

    pub fn track_transaction(&self, fields: &ActionFields) {
        self.set_action("purchase", Some(&fields.to_value()));
    }

    pub fn track_refund(&self, transaction_id: &str) {
        self.set_action(
            "refund",
            Some(&ActionFields::for_transaction(transaction_id).to_value()),
        );
    }

    pub fn track_checkout(&self, step: Option<&str>, option: Option<&str>) {
        let fields = ActionFields {
            step: step.map(str::to_string),
            option: option.map(str::to_string),
            ..Default::default()
        };
        self.set_action("checkout", Some(&fields.to_value()));
    }

    pub fn track_detail(&self) {
        self.set_action("detail", None);
        self.page_view(None);
    }

    pub fn track_cart(&self, action: CartAction, list: &str) {
        self.set_action(action.as_str(), Some(&json!({ "list": list })));
        self.track_event(
            &Event::new("UX")
                .with_action("click")
                .with_label(action.event_label()),
        );
    }

    pub fn promo_click(&self, promotion_name: &str) {
        self.set_action("promo_click", None);
        self.track_event(
            &Event::new("Internal Promotions")
                .with_action("click")
                .with_label(promotion_name),
        );
    }

    pub fn product_click(&self, list: &str) {
        self.set_action("click", Some(&ActionFields::for_list(list).to_value()));
        self.track_event(&Event::new("UX").with_action("click").with_label(list));
    }

    /// Sends a bare page view hit to one tracker, or to the default tracker.
    pub fn page_view(&self, tracker: Option<&str>) {
        if self.universal_only("pageView") {
            self.send_direct(command_name(CMD_SEND, tracker), vec![json!("pageview")]);
        }
    }

    pub fn track_timing(&self, category: &str, variable: &str, value: i64, label: Option<&str>) {
        if self.universal_only("trackTimings") {
            self.dispatch(
                None,
                CMD_SEND,
                vec![
                    json!("timing"),
                    json!(category),
                    json!(variable),
                    json!(value),
                    string_or_null(label),
                ],
            );
        }
    }

    pub fn track_exception(&self, description: Option<&str>, fatal: bool) {
        if self.universal_only("trackException") {
            let fields = json!({
                "exDescription": string_or_null(description),
                "exFatal": fatal,
            });
            self.dispatch(None, CMD_SEND, vec![json!("exception"), fields]);
        }
    }

    /// Sends a raw hit described by `fields` to the default tracker.
    pub fn send(&self, fields: Value) {
        if self.universal_only("send") {
            self.send_direct(CMD_SEND, vec![fields]);
        }
    }

    pub fn set(&self, name: &str, value: Value, tracker: Option<&str>) {
        if self.universal_only("set") {
            self.send_direct(
                command_name(CMD_SET, tracker),
                vec![Value::String(name.to_string()), value],
            );
        }
    }

    /// Reads the offline flag, updating it first when `value` is given.
    ///
    /// Going online delivers every call buffered while offline, in order, before returning.
    /// Calls made by the host while that replay runs are delivered after it.
    pub fn offline(&self, value: Option<bool>) -> bool {
        if let Some(offline) = value {
            let adapter = Arc::clone(self.inner.dispatcher.adapter());
            self.inner
                .queue
                .set_offline(offline, |call| adapter.deliver(call));
        }
        self.inner.queue.is_offline()
    }

    fn transport(&self) -> TransportMode {
        self.inner.config.transport
    }

    fn universal_only(&self, operation: &str) -> bool {
        if self.transport() == TransportMode::Universal {
            return true;
        }
        log::debug!("`{operation}` is only available with analytics.js");
        false
    }

    fn tracker_snapshot(&self) -> Arc<Vec<TrackerDescriptor>> {
        Arc::clone(&self.inner.trackers.lock().unwrap())
    }

    fn send_direct(&self, command: impl Into<String>, args: Vec<Value>) {
        self.inner
            .dispatcher
            .adapter()
            .send(TrackingCall::new(command, args));
    }

    fn dispatch(&self, include: Option<IncludeFn<'_>>, command: &str, args: Vec<Value>) {
        let trackers = self.tracker_snapshot();
        self.inner
            .dispatcher
            .dispatch(&trackers, include, TrackingCall::new(command, args));
    }

    fn dispatch_ecommerce(&self, command: &str, args: Vec<Value>) {
        let include: IncludeFn<'_> = &tracks_ecommerce;
        self.dispatch(Some(include), command, args);
    }

    fn inject(&self, src: &str) {
        match &self.inner.injector {
            Some(injector) => injector.inject(src),
            None => log::debug!("no script injector configured; `{src}` not loaded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::host::MemoryHost;
    use crate::analytics::script::RecordingInjector;

    fn values(log: &CallLog) -> Vec<Vec<Value>> {
        log.entries().iter().map(|entry| entry.to_values()).collect()
    }

    fn service(config: AnalyticsConfig) -> (Analytics, Arc<MemoryHost>) {
        let host = Arc::new(MemoryHost::loaded());
        let analytics = Analytics::builder(config.with_test_mode(), host.clone())
            .build()
            .unwrap();
        (analytics, host)
    }

    /// Service with the startup registration already flushed from the log and host.
    fn started(config: AnalyticsConfig) -> (Analytics, Arc<MemoryHost>) {
        let (analytics, host) = service(config);
        analytics.log().clear();
        host.clear();
        (analytics, host)
    }

    #[test]
    fn startup_registers_script_and_tracker() {
        let (analytics, host) = service(AnalyticsConfig::new().with_account("UA-XXXXXX-xx"));
        assert_eq!(
            values(analytics.log()),
            vec![
                vec![json!("inject"), json!("//www.google-analytics.com/analytics.js")],
                vec![json!("create"), json!("UA-XXXXXX-xx"), json!({})],
                vec![json!("send"), json!("pageview"), json!("")],
            ]
        );
        assert_eq!(host.calls().len(), 2);
    }

    #[test]
    fn delayed_scripts_wait_for_bootstrap() {
        let (analytics, host) = service(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_delay_script_tag(true),
        );
        assert!(analytics.log().is_empty());
        analytics.bootstrap();
        assert_eq!(host.calls()[0], vec![json!("create"), json!("UA-1"), json!({})]);
    }

    #[test]
    fn second_script_registration_warns() {
        let (analytics, _) = started(AnalyticsConfig::new().with_account("UA-1"));
        assert!(!analytics.register_script_tags());
        assert_eq!(
            values(analytics.log()),
            vec![vec![json!("warn"), json!("Script tags already created")]]
        );
    }

    #[test]
    fn tracker_registration_runs_once() {
        let (analytics, host) = started(AnalyticsConfig::new().with_account("UA-1"));
        assert!(analytics.register_trackers());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn no_accounts_warns() {
        let (analytics, host) = service(AnalyticsConfig::new());
        assert_eq!(
            analytics.log().entries()[1].to_values(),
            vec![json!("warn"), json!("No accounts to register")]
        );
        assert!(host.calls().is_empty());
    }

    #[test]
    fn universal_registration_sequence() {
        let config = AnalyticsConfig::new()
            .with_tracker(
                TrackerDescriptor::new("UA-1")
                    .with_name("t1")
                    .with_set("forceSSL", json!(true))
                    .with_cross_domain_linker(true)
                    .with_cross_link_domains(["example.com"]),
            )
            .with_hybrid_mobile_support(true)
            .with_display_features(true)
            .with_enhanced_link_attribution(true)
            .with_ecommerce(true, true)
            .with_currency("EUR")
            .with_track_prefix("/app");
        let (_, host) = service(config);

        assert_eq!(
            host.calls(),
            vec![
                vec![json!("create"), json!("UA-1"), json!({"allowLinker": true, "name": "t1"})],
                vec![json!("t1.set"), json!("checkProtocolTask"), Value::Null],
                vec![json!("t1.set"), json!("forceSSL"), json!(true)],
                vec![json!("t1.require"), json!("linker")],
                vec![json!("t1.linker:autoLink"), json!(["example.com"])],
                vec![json!("t1.require"), json!("displayfeatures")],
                vec![json!("t1.require"), json!("ec")],
                vec![json!("t1.set"), json!("&cu"), json!("EUR")],
                vec![json!("t1.require"), json!("linkid")],
                vec![json!("t1.send"), json!("pageview"), json!("/app")],
            ]
        );
    }

    #[test]
    fn ignored_first_load_sends_no_pageview() {
        let (_, host) = service(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_ignore_first_page_load(true),
        );
        assert_eq!(host.calls().len(), 1);
    }

    #[test]
    fn classic_registration_sequence() {
        let config = AnalyticsConfig::new()
            .with_transport(TransportMode::Classic)
            .with_account("UA-1")
            .with_domain_name("example.com")
            .with_enhanced_link_attribution(true);
        let (analytics, host) = service(config);

        assert_eq!(
            analytics.log().entries()[0].to_values(),
            vec![json!("inject"), json!("http://www.google-analytics.com/ga.js")]
        );
        assert_eq!(
            host.queued(),
            vec![
                vec![json!("_setAccount"), json!("UA-1")],
                vec![json!("_setDomainName"), json!("example.com")],
                vec![json!("_require"), json!("inpage_linkid"), json!(INPAGE_LINKID_PLUGIN)],
                vec![json!("_trackPageview")],
            ]
        );
    }

    #[test]
    fn classic_transport_keeps_first_tracker_only() {
        let config = AnalyticsConfig::new()
            .with_transport(TransportMode::Classic)
            .with_trackers([TrackerDescriptor::new("UA-1"), TrackerDescriptor::new("UA-2")]);
        let (analytics, host) = service(config);

        assert_eq!(
            analytics.log().entries()[0].to_values(),
            vec![json!("warn"), json!(WARN_MULTIPLE_CLASSIC_TRACKERS)]
        );
        assert_eq!(analytics.trackers().len(), 1);
        assert_eq!(host.queued()[0], vec![json!("_setAccount"), json!("UA-1")]);
    }

    #[test]
    fn disabled_analytics_marks_trackers() {
        let (analytics, host) = service(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_disable_analytics(true),
        );
        assert_eq!(
            analytics.log().entries()[0].to_values(),
            vec![json!("info"), json!("Analytics disabled: UA-1")]
        );
        assert_eq!(host.disabled_trackers(), ["UA-1"]);
    }

    #[test]
    fn scripts_go_through_injector_outside_test_mode() {
        let injector = Arc::new(RecordingInjector::new());
        let host = Arc::new(MemoryHost::loaded());
        let analytics = Analytics::builder(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_debug_mode(true)
                .with_experiment_id("exp"),
            host.clone(),
        )
        .with_script_injector(injector.clone())
        .build()
        .unwrap();

        assert_eq!(
            injector.sources(),
            [
                "//www.google-analytics.com/analytics_debug.js",
                "//www.google-analytics.com/cx/api.js?experiment=exp",
            ]
        );
        assert!(host.trace_debugging());
        assert_eq!(analytics.log().entries()[0].label(), "create");
    }

    #[test]
    fn page_views_carry_title_utm_and_custom_fields() {
        let page = Arc::new(
            StaticPage::parse("http://example.com/landing?utm_source=mail&utm_campaign=spring")
                .unwrap()
                .with_title("Landing"),
        );
        let host = Arc::new(MemoryHost::loaded());
        let analytics = Analytics::builder(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_delay_script_tag(true),
            host.clone(),
        )
        .with_page_context(page)
        .build()
        .unwrap();

        analytics.track_page(None, None, Some(&json!({"dimension1": "x"})));

        assert_eq!(
            host.calls(),
            vec![vec![
                json!("send"),
                json!("pageview"),
                json!({
                    "page": "/landing",
                    "title": "Landing",
                    "campaignSource": "mail",
                    "campaignName": "spring",
                    "dimension1": "x",
                }),
            ]]
        );
    }

    #[test]
    fn current_url_applies_params_and_removal_pattern() {
        let page = Arc::new(StaticPage::parse("http://example.com/item/42?ref=home").unwrap());
        let config = AnalyticsConfig::new()
            .with_track_url_params(true)
            .with_remove_pattern(r"/\d+")
            .unwrap()
            .with_delay_script_tag(true);
        let analytics = Analytics::builder(config, Arc::new(MemoryHost::new()))
            .with_page_context(page.clone())
            .build()
            .unwrap();
        assert_eq!(analytics.current_url(), "/item?ref=home");
    }

    #[test]
    fn route_tracking_url_takes_precedence() {
        let page = Arc::new(StaticPage::parse("http://example.com/a").unwrap());
        let config = AnalyticsConfig::new()
            .with_read_from_route(true)
            .with_delay_script_tag(true);
        let analytics = Analytics::builder(config, Arc::new(MemoryHost::loaded()))
            .with_page_context(page.clone())
            .build()
            .unwrap();

        assert!(!analytics.on_route_change());
        page.set_route_page_track(Some("/tracked".into()));
        assert_eq!(analytics.current_url(), "/tracked");
        assert!(analytics.on_route_change());
    }

    #[test]
    fn classic_page_view_sets_title_first() {
        let (analytics, host) = started(
            AnalyticsConfig::new()
                .with_transport(TransportMode::Classic)
                .with_account("UA-1"),
        );
        analytics.track_page(Some("/page/here"), None, None);
        assert_eq!(
            host.queued(),
            vec![
                vec![json!("_set"), json!("title"), json!("")],
                vec![json!("_trackPageview"), json!("/page/here")],
            ]
        );
    }

    #[test]
    fn event_uses_prefix_url_as_page() {
        let (analytics, host) = started(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_track_prefix("test-prefix"),
        );
        analytics.track_event(&Event::new("test").with_action("action").with_label("label").with_value(0));
        assert_eq!(
            host.calls(),
            vec![vec![
                json!("send"),
                json!("event"),
                json!("test"),
                json!("action"),
                json!("label"),
                json!(0),
                json!({"page": "test-prefix"}),
            ]]
        );
    }

    #[test]
    fn classic_ecommerce_goes_to_ecommerce_trackers() {
        let (analytics, host) = started(
            AnalyticsConfig::new()
                .with_trackers([
                    TrackerDescriptor::new("UA-1").with_name("shop"),
                    TrackerDescriptor::new("UA-2").with_name("content").with_track_ecommerce(false),
                ])
                .with_ecommerce(true, false),
        );

        analytics.add_transaction(&Transaction {
            revenue: Some("2.42".into()),
            ..Transaction::new("1")
        });
        analytics.add_item(&Item::new("1", "sku-1"));
        analytics.track_trans();
        analytics.clear_trans();

        let commands: Vec<_> = host.calls().iter().map(|call| call[0].clone()).collect();
        assert_eq!(
            commands,
            vec![
                json!("shop.ecommerce:addTransaction"),
                json!("shop.ecommerce:addItem"),
                json!("shop.ecommerce:send"),
                json!("shop.ecommerce:clear"),
            ]
        );
        assert_eq!(
            host.calls()[0][1],
            json!({"id": "1", "revenue": "2.42", "currency": "USD"})
        );
    }

    #[test]
    fn enhanced_ecommerce_rejects_classic_operations() {
        let (analytics, host) = started(
            AnalyticsConfig::new()
                .with_account("UA-1")
                .with_ecommerce(true, true),
        );
        analytics.add_transaction(&Transaction::new("1"));
        analytics.add_product(&Product::new("p1"));

        assert_eq!(
            analytics.log().entries()[0].to_values(),
            vec![json!("warn"), json!("addTrans is not available when Enhanced Ecommerce is enabled")]
        );
        assert_eq!(host.calls(), vec![vec![json!("ec:addProduct"), json!({"id": "p1"})]]);
    }

    #[test]
    fn enhanced_helpers_set_actions_and_events() {
        let (analytics, host) = started(
            AnalyticsConfig::new()
                .with_tracker(TrackerDescriptor::new("UA-1").with_track_event(true))
                .with_ecommerce(true, true),
        );

        analytics.track_cart(CartAction::Add, "Search Results");
        analytics.track_refund("T1");
        analytics.track_checkout(Some("1"), None);
        analytics.track_detail();

        assert_eq!(
            host.calls(),
            vec![
                vec![json!("ec:setAction"), json!("add"), json!({"list": "Search Results"})],
                vec![
                    json!("send"),
                    json!("event"),
                    json!("UX"),
                    json!("click"),
                    json!("add to cart"),
                    Value::Null,
                    json!({"page": ""}),
                ],
                vec![json!("ec:setAction"), json!("refund"), json!({"id": "T1"})],
                vec![json!("ec:setAction"), json!("checkout"), json!({"step": "1"})],
                vec![json!("ec:setAction"), json!("detail")],
                vec![json!("send"), json!("pageview")],
            ]
        );
    }

    #[test]
    fn disabled_ecommerce_skips_everything() {
        let (analytics, host) = started(AnalyticsConfig::new().with_account("UA-1"));
        analytics.track_trans();
        analytics.promo_click("Summer");
        assert_eq!(
            analytics.log().entries()[0].args(),
            &[json!("Ecommerce must be enabled to use trackTrans")]
        );
        assert_eq!(
            analytics.log().entries()[1].args(),
            &[json!("Enhanced Ecommerce must be enabled to use setAction")]
        );
        // The accompanying event is still reported.
        assert_eq!(host.calls().len(), 1);
        assert_eq!(analytics.configuration().ecommerce(), EcommerceMode::Disabled);
    }

    #[test]
    fn timing_exception_send_and_set() {
        let (analytics, host) = started(AnalyticsConfig::new().with_account("UA-1"));

        analytics.track_timing("load", "dom", 120, None);
        analytics.track_exception(None, false);
        analytics.send(json!({"hitType": "social"}));
        analytics.set("dimension1", json!("x"), Some("t2"));
        analytics.page_view(Some("t2"));

        assert_eq!(
            host.calls(),
            vec![
                vec![json!("send"), json!("timing"), json!("load"), json!("dom"), json!(120), Value::Null],
                vec![json!("send"), json!("exception"), json!({"exDescription": null, "exFatal": false})],
                vec![json!("send"), json!({"hitType": "social"})],
                vec![json!("t2.set"), json!("dimension1"), json!("x")],
                vec![json!("t2.send"), json!("pageview")],
            ]
        );
    }

    #[test]
    fn universal_only_operations_are_ignored_by_classic() {
        let (analytics, host) = started(
            AnalyticsConfig::new()
                .with_transport(TransportMode::Classic)
                .with_account("UA-1"),
        );
        analytics.track_timing("load", "dom", 1, None);
        analytics.set("page", json!("/a"), None);
        assert!(host.queued().is_empty());
        assert!(analytics.log().is_empty());
    }

    #[test]
    fn offline_startup_replays_registration() {
        let host = Arc::new(MemoryHost::loaded());
        let analytics = Analytics::builder(
            AnalyticsConfig::new()
                .with_account("UA-XXXXXX-xx")
                .with_start_offline(true)
                .with_test_mode(),
            host.clone(),
        )
        .build()
        .unwrap();

        assert!(analytics.offline(None));
        analytics.register_script_tags();
        analytics.register_trackers();
        assert_eq!(analytics.log().len(), 1);

        assert!(!analytics.offline(Some(false)));
        assert_eq!(
            values(analytics.log()),
            vec![
                vec![json!("inject"), json!("//www.google-analytics.com/analytics.js")],
                vec![json!("create"), json!("UA-XXXXXX-xx"), json!({})],
                vec![json!("send"), json!("pageview"), json!("")],
            ]
        );
        assert_eq!(host.calls().len(), 2);
    }
}
