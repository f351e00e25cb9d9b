use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::analytics::constants::DEFAULT_CURRENCY;
use crate::analytics::error::{invalid_argument, invalid_configuration, AnalyticsResult};
use crate::analytics::transport::TrackingCall;

/// Which tracking protocol the process talks to. The two are mutually exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportMode {
    /// `ga.js`: commands are pushed onto the `_gaq` queue.
    Classic,
    /// `analytics.js`: commands are passed to the `ga` function.
    #[default]
    Universal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EcommerceMode {
    #[default]
    Disabled,
    Classic,
    Enhanced,
}

impl EcommerceMode {
    pub fn from_flags(ecommerce: bool, enhanced: bool) -> Self {
        match (ecommerce, enhanced) {
            (false, _) => EcommerceMode::Disabled,
            (true, false) => EcommerceMode::Classic,
            (true, true) => EcommerceMode::Enhanced,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != EcommerceMode::Disabled
    }
}

/// Per-call veto: returning `false` skips the tracker for that call.
pub type SelectFn = Arc<dyn Fn(&TrackingCall) -> bool + Send + Sync + 'static>;

/// One configured analytics account.
///
/// Optional flags fall back to the configuration-wide values when the tracker is normalized at
/// registration time.
#[derive(Clone, Default)]
pub struct TrackerDescriptor {
    id: String,
    name: Option<String>,
    track_event: Option<bool>,
    track_ecommerce: Option<bool>,
    cross_domain_linker: Option<bool>,
    cross_link_domains: Option<Vec<String>>,
    display_features: Option<bool>,
    enhanced_link_attribution: Option<bool>,
    set: Map<String, Value>,
    fields: Map<String, Value>,
    select: Option<SelectFn>,
}

impl fmt::Debug for TrackerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("track_event", &self.track_event)
            .field("track_ecommerce", &self.track_ecommerce)
            .field("fields", &self.fields)
            .field("select", &self.select.is_some())
            .finish()
    }
}

impl TrackerDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_track_event(mut self, enabled: bool) -> Self {
        self.track_event = Some(enabled);
        self
    }

    pub fn with_track_ecommerce(mut self, enabled: bool) -> Self {
        self.track_ecommerce = Some(enabled);
        self
    }

    pub fn with_cross_domain_linker(mut self, enabled: bool) -> Self {
        self.cross_domain_linker = Some(enabled);
        self
    }

    pub fn with_cross_link_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cross_link_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_display_features(mut self, enabled: bool) -> Self {
        self.display_features = Some(enabled);
        self
    }

    pub fn with_enhanced_link_attribution(mut self, enabled: bool) -> Self {
        self.enhanced_link_attribution = Some(enabled);
        self
    }

    /// Adds a field applied with `set` right after the tracker is created.
    pub fn with_set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set.insert(key.into(), value);
        self
    }

    /// Adds an initialization field passed to `create`.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn with_select<F>(mut self, select: F) -> Self
    where
        F: Fn(&TrackingCall) -> bool + Send + Sync + 'static,
    {
        self.select = Some(Arc::new(select));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn track_event(&self) -> bool {
        self.track_event.unwrap_or(false)
    }

    pub fn track_ecommerce(&self) -> bool {
        self.track_ecommerce.unwrap_or(false)
    }

    pub fn cross_domain_linker(&self) -> bool {
        self.cross_domain_linker.unwrap_or(false)
    }

    pub fn cross_link_domains(&self) -> &[String] {
        self.cross_link_domains.as_deref().unwrap_or(&[])
    }

    pub fn display_features(&self) -> bool {
        self.display_features.unwrap_or(false)
    }

    pub fn enhanced_link_attribution(&self) -> bool {
        self.enhanced_link_attribution.unwrap_or(false)
    }

    pub fn set_fields(&self) -> &Map<String, Value> {
        &self.set
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Whether this tracker accepts `call`; trackers without a `select` accept everything.
    pub fn selects(&self, call: &TrackingCall) -> bool {
        match &self.select {
            Some(select) => select(call),
            None => true,
        }
    }

    /// Fills every unset flag from `config` and derives the `create` fields.
    pub(crate) fn normalize(&mut self, config: &AnalyticsConfig) {
        self.cross_domain_linker.get_or_insert(config.cross_domain_linker);
        self.cross_link_domains
            .get_or_insert_with(|| config.cross_link_domains.clone());
        self.display_features.get_or_insert(config.display_features);
        self.enhanced_link_attribution
            .get_or_insert(config.enhanced_link_attribution);
        self.track_ecommerce.get_or_insert(config.ecommerce.is_enabled());
        self.track_event.get_or_insert(false);

        if self.cross_domain_linker() {
            self.fields.insert("allowLinker".into(), Value::Bool(true));
        }
        if let Some(name) = &self.name {
            self.fields.insert("name".into(), Value::String(name.clone()));
        }
    }
}

/// Resolved settings for one analytics session.
#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
    pub(crate) transport: TransportMode,
    pub(crate) trackers: Vec<TrackerDescriptor>,
    pub(crate) ecommerce: EcommerceMode,
    pub(crate) currency: String,
    pub(crate) track_prefix: String,
    pub(crate) start_offline: bool,
    pub(crate) domain_name: Option<String>,
    pub(crate) cross_domain_linker: bool,
    pub(crate) cross_link_domains: Vec<String>,
    pub(crate) display_features: bool,
    pub(crate) enhanced_link_attribution: bool,
    pub(crate) experiment_id: Option<String>,
    pub(crate) hybrid_mobile_support: bool,
    pub(crate) ignore_first_page_load: bool,
    pub(crate) track_routes: bool,
    pub(crate) track_url_params: bool,
    pub(crate) read_from_route: bool,
    pub(crate) remove_pattern: Option<Regex>,
    pub(crate) disable_analytics: bool,
    pub(crate) debug_mode: bool,
    pub(crate) trace_debugging: bool,
    pub(crate) test_mode: bool,
    pub(crate) delay_script_tag: bool,
    pub(crate) log_all_calls: bool,
    pub(crate) unqualified_fallback: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Universal,
            trackers: Vec::new(),
            ecommerce: EcommerceMode::Disabled,
            currency: DEFAULT_CURRENCY.to_string(),
            track_prefix: String::new(),
            start_offline: false,
            domain_name: None,
            cross_domain_linker: false,
            cross_link_domains: Vec::new(),
            display_features: false,
            enhanced_link_attribution: false,
            experiment_id: None,
            hybrid_mobile_support: false,
            ignore_first_page_load: false,
            track_routes: true,
            track_url_params: false,
            read_from_route: false,
            remove_pattern: None,
            disable_analytics: false,
            debug_mode: false,
            trace_debugging: false,
            test_mode: false,
            delay_script_tag: false,
            log_all_calls: true,
            unqualified_fallback: true,
        }
    }
}

impl AnalyticsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures a single account. Single-account setups also receive events.
    pub fn with_account(mut self, id: impl Into<String>) -> Self {
        self.trackers = vec![TrackerDescriptor::new(id).with_track_event(true)];
        self
    }

    pub fn with_tracker(mut self, tracker: TrackerDescriptor) -> Self {
        self.trackers.push(tracker);
        self
    }

    pub fn with_trackers<I>(mut self, trackers: I) -> Self
    where
        I: IntoIterator<Item = TrackerDescriptor>,
    {
        self.trackers = trackers.into_iter().collect();
        self
    }

    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_ecommerce(mut self, ecommerce: bool, enhanced: bool) -> Self {
        self.ecommerce = EcommerceMode::from_flags(ecommerce, enhanced);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_track_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.track_prefix = prefix.into();
        self
    }

    /// Starts the session offline. Script injection is delayed as well.
    pub fn with_start_offline(mut self, offline: bool) -> Self {
        self.start_offline = offline;
        if offline {
            self.delay_script_tag = true;
        }
        self
    }

    pub fn with_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.domain_name = Some(domain.into());
        self
    }

    pub fn with_cross_domain_linker(mut self, enabled: bool) -> Self {
        self.cross_domain_linker = enabled;
        self
    }

    pub fn with_cross_link_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cross_link_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_display_features(mut self, enabled: bool) -> Self {
        self.display_features = enabled;
        self
    }

    pub fn with_enhanced_link_attribution(mut self, enabled: bool) -> Self {
        self.enhanced_link_attribution = enabled;
        self
    }

    pub fn with_experiment_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_id = Some(id.into());
        self
    }

    pub fn with_hybrid_mobile_support(mut self, enabled: bool) -> Self {
        self.hybrid_mobile_support = enabled;
        self
    }

    pub fn with_ignore_first_page_load(mut self, ignore: bool) -> Self {
        self.ignore_first_page_load = ignore;
        self
    }

    pub fn with_track_routes(mut self, enabled: bool) -> Self {
        self.track_routes = enabled;
        self
    }

    pub fn with_track_url_params(mut self, enabled: bool) -> Self {
        self.track_url_params = enabled;
        self
    }

    pub fn with_read_from_route(mut self, enabled: bool) -> Self {
        self.read_from_route = enabled;
        self
    }

    /// Strips every match of `pattern` from tracked URLs.
    pub fn with_remove_pattern(mut self, pattern: &str) -> AnalyticsResult<Self> {
        let regex = Regex::new(pattern).map_err(|err| {
            invalid_configuration(format!("invalid URL removal pattern `{pattern}`: {err}"))
        })?;
        self.remove_pattern = Some(regex);
        Ok(self)
    }

    pub fn with_disable_analytics(mut self, disabled: bool) -> Self {
        self.disable_analytics = disabled;
        self
    }

    pub fn with_debug_mode(mut self, trace: bool) -> Self {
        self.debug_mode = true;
        self.trace_debugging = trace;
        self
    }

    pub fn with_test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    pub fn with_delay_script_tag(mut self, delay: bool) -> Self {
        self.delay_script_tag = delay;
        self
    }

    pub fn with_log_all_calls(mut self, enabled: bool) -> Self {
        self.log_all_calls = enabled;
        self
    }

    /// Controls whether a dispatch that matches no tracker still issues one unqualified call.
    pub fn with_unqualified_fallback(mut self, enabled: bool) -> Self {
        self.unqualified_fallback = enabled;
        self
    }

    pub fn transport(&self) -> TransportMode {
        self.transport
    }

    pub fn trackers(&self) -> &[TrackerDescriptor] {
        &self.trackers
    }

    pub fn ecommerce(&self) -> EcommerceMode {
        self.ecommerce
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn track_prefix(&self) -> &str {
        &self.track_prefix
    }

    pub fn start_offline(&self) -> bool {
        self.start_offline
    }

    pub fn delay_script_tag(&self) -> bool {
        self.delay_script_tag
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn track_routes(&self) -> bool {
        self.track_routes
    }

    pub fn log_all_calls(&self) -> bool {
        self.log_all_calls
    }

    pub fn unqualified_fallback(&self) -> bool {
        self.unqualified_fallback
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        for (index, tracker) in self.trackers.iter().enumerate() {
            if tracker.id.trim().is_empty() {
                return Err(invalid_argument(format!(
                    "tracker at position {index} has an empty id"
                )));
            }
        }
        if self.currency.trim().is_empty() {
            return Err(invalid_argument("currency must not be empty"));
        }
        Ok(())
    }

    /// Parses a JSON document shaped like [`AnalyticsSettings`].
    pub fn from_json(input: &str) -> AnalyticsResult<Self> {
        let settings: AnalyticsSettings = serde_json::from_str(input).map_err(|err| {
            invalid_configuration(format!("failed to parse analytics settings: {err}"))
        })?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: AnalyticsSettings) -> AnalyticsResult<Self> {
        let mut config = AnalyticsConfig::new()
            .with_transport(settings.transport)
            .with_ecommerce(settings.ecommerce, settings.enhanced_ecommerce)
            .with_currency(settings.currency)
            .with_track_prefix(settings.track_prefix)
            .with_cross_domain_linker(settings.cross_domain_linker)
            .with_cross_link_domains(settings.cross_link_domains)
            .with_display_features(settings.display_features)
            .with_enhanced_link_attribution(settings.enhanced_link_attribution)
            .with_hybrid_mobile_support(settings.hybrid_mobile_support)
            .with_ignore_first_page_load(settings.ignore_first_page_load)
            .with_track_routes(settings.track_routes)
            .with_track_url_params(settings.track_url_params)
            .with_read_from_route(settings.read_from_route)
            .with_disable_analytics(settings.disable_analytics)
            .with_delay_script_tag(settings.delay_script_tag)
            .with_start_offline(settings.start_offline)
            .with_log_all_calls(settings.log_all_calls)
            .with_unqualified_fallback(settings.unqualified_fallback);

        config.trackers = settings.accounts.into_iter().map(Into::into).collect();
        config.domain_name = settings.domain_name;
        config.experiment_id = settings.experiment_id;
        if settings.debug_mode {
            config = config.with_debug_mode(settings.trace_debugging);
        }
        if settings.test_mode {
            config = config.with_test_mode();
        }
        if let Some(pattern) = settings.remove_pattern.as_deref() {
            config = config.with_remove_pattern(pattern)?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Serializable form of [`AnalyticsConfig`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSettings {
    pub accounts: Vec<TrackerSettings>,
    pub transport: TransportMode,
    pub ecommerce: bool,
    pub enhanced_ecommerce: bool,
    pub currency: String,
    pub track_prefix: String,
    pub start_offline: bool,
    pub domain_name: Option<String>,
    pub cross_domain_linker: bool,
    pub cross_link_domains: Vec<String>,
    pub display_features: bool,
    pub enhanced_link_attribution: bool,
    pub experiment_id: Option<String>,
    pub hybrid_mobile_support: bool,
    pub ignore_first_page_load: bool,
    pub track_routes: bool,
    pub track_url_params: bool,
    pub read_from_route: bool,
    pub remove_pattern: Option<String>,
    pub disable_analytics: bool,
    pub debug_mode: bool,
    pub trace_debugging: bool,
    pub test_mode: bool,
    pub delay_script_tag: bool,
    pub log_all_calls: bool,
    pub unqualified_fallback: bool,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        let defaults = AnalyticsConfig::default();
        Self {
            accounts: Vec::new(),
            transport: defaults.transport,
            ecommerce: false,
            enhanced_ecommerce: false,
            currency: defaults.currency,
            track_prefix: defaults.track_prefix,
            start_offline: defaults.start_offline,
            domain_name: None,
            cross_domain_linker: defaults.cross_domain_linker,
            cross_link_domains: Vec::new(),
            display_features: defaults.display_features,
            enhanced_link_attribution: defaults.enhanced_link_attribution,
            experiment_id: None,
            hybrid_mobile_support: defaults.hybrid_mobile_support,
            ignore_first_page_load: defaults.ignore_first_page_load,
            track_routes: defaults.track_routes,
            track_url_params: defaults.track_url_params,
            read_from_route: defaults.read_from_route,
            remove_pattern: None,
            disable_analytics: defaults.disable_analytics,
            debug_mode: defaults.debug_mode,
            trace_debugging: defaults.trace_debugging,
            test_mode: defaults.test_mode,
            delay_script_tag: defaults.delay_script_tag,
            log_all_calls: defaults.log_all_calls,
            unqualified_fallback: defaults.unqualified_fallback,
        }
    }
}

/// Serializable form of [`TrackerDescriptor`]; `select` predicates can only be attached in code.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    #[serde(alias = "tracker")]
    pub id: String,
    pub name: Option<String>,
    pub track_event: Option<bool>,
    pub track_ecommerce: Option<bool>,
    pub cross_domain_linker: Option<bool>,
    pub cross_link_domains: Option<Vec<String>>,
    pub display_features: Option<bool>,
    pub enhanced_link_attribution: Option<bool>,
    pub set: Map<String, Value>,
    pub fields: Map<String, Value>,
}

impl From<TrackerSettings> for TrackerDescriptor {
    fn from(settings: TrackerSettings) -> Self {
        TrackerDescriptor {
            id: settings.id,
            name: settings.name,
            track_event: settings.track_event,
            track_ecommerce: settings.track_ecommerce,
            cross_domain_linker: settings.cross_domain_linker,
            cross_link_domains: settings.cross_link_domains,
            display_features: settings.display_features,
            enhanced_link_attribution: settings.enhanced_link_attribution,
            set: settings.set,
            fields: settings.fields,
            select: None,
        }
    }
}
