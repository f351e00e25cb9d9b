use std::sync::Mutex;

use crate::analytics::config::{AnalyticsConfig, TransportMode};

const UNIVERSAL_SCRIPT_HOST: &str = "//www.google-analytics.com/";
const CLASSIC_SCRIPT_HOST: &str = ".google-analytics.com/ga.js";
const DISPLAY_FEATURES_SCRIPT: &str = "//stats.g.doubleclick.net/dc.js";
const EXPERIMENT_SCRIPT: &str = "//www.google-analytics.com/cx/api.js?experiment=";

/// Adds `<script>` tags to the host document.
pub trait ScriptInjector: Send + Sync {
    fn inject(&self, src: &str);
}

/// Injector that only remembers what it was asked to load.
#[derive(Debug, Default)]
pub struct RecordingInjector {
    sources: Mutex<Vec<String>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

impl ScriptInjector for RecordingInjector {
    fn inject(&self, src: &str) {
        self.sources.lock().unwrap().push(src.to_string());
    }
}

/// Scheme prefix for a script source.
///
/// An explicit `http_postfix` selects plain http. Chrome extensions, hybrid mobile apps on the
/// universal transport, and https pages with an `https_postfix` switch to https. Otherwise the
/// source stays protocol-relative.
pub fn protocol(scheme: &str, hybrid_application: bool, http_postfix: &str, https_postfix: &str) -> String {
    let ssl = scheme == "https";
    let chrome_extension = scheme == "chrome-extension";

    let mut protocol = String::new();
    if !http_postfix.is_empty() {
        protocol = format!("http:{http_postfix}");
    }
    if chrome_extension || hybrid_application || (ssl && !https_postfix.is_empty()) {
        protocol = format!("https:{https_postfix}");
    }
    protocol
}

/// Scripts to load for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptSources {
    pub tracker: String,
    pub experiment: Option<String>,
}

pub fn script_sources(config: &AnalyticsConfig, scheme: &str) -> ScriptSources {
    match config.transport {
        TransportMode::Universal => {
            let prefix = protocol(scheme, config.hybrid_mobile_support, "", "");
            let file = if config.debug_mode {
                "analytics_debug.js"
            } else {
                "analytics.js"
            };
            ScriptSources {
                tracker: format!("{prefix}{UNIVERSAL_SCRIPT_HOST}{file}"),
                experiment: config
                    .experiment_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .map(|id| format!("{prefix}{EXPERIMENT_SCRIPT}{id}")),
            }
        }
        TransportMode::Classic => {
            let tracker = if config.display_features {
                format!("{}{DISPLAY_FEATURES_SCRIPT}", protocol(scheme, false, "", ""))
            } else {
                format!("{}{CLASSIC_SCRIPT_HOST}", protocol(scheme, false, "//www", "//ssl"))
            };
            ScriptSources {
                tracker,
                experiment: None,
            }
        }
    }
}
