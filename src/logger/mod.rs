//! Append-only call and diagnostic log.
//!
//! Every command that reaches a transport and every warning raised by the tracking engine is
//! recorded here as a [`LogEntry`]. Entries labelled with a log level are additionally mirrored
//! to a replaceable handler, which defaults to the [`log`] facade.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

type SharedLogHandler = Arc<dyn Fn(&CallLog, LogLevel, &[Value]) + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Log = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Log => "log",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    fn facade_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Log | LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "log" => Ok(LogLevel::Log),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => write!(f, "\"{level}\" is not a log level"),
        }
    }
}

impl std::error::Error for LogError {}

/// One recorded line: a level or command label followed by its arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    label: String,
    args: Vec<Value>,
}

impl LogEntry {
    pub fn new(label: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            label: label.into(),
            args,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The level this entry was logged at, when the label names one.
    pub fn level(&self) -> Option<LogLevel> {
        self.label.parse().ok()
    }

    /// Flattens the entry into `[label, ...args]`.
    pub fn to_values(&self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.args.len() + 1);
        values.push(Value::String(self.label.clone()));
        values.extend(self.args.iter().cloned());
        values
    }
}

#[derive(Clone)]
pub struct CallLog {
    inner: Arc<CallLogInner>,
}

struct CallLogInner {
    name: String,
    entries: Mutex<Vec<LogEntry>>,
    log_handler: RwLock<SharedLogHandler>,
}

impl fmt::Debug for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .finish()
    }
}

impl CallLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CallLogInner {
                name: name.into(),
                entries: Mutex::new(Vec::new()),
                log_handler: RwLock::new(default_log_handler_arc()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Appends an entry. Level-labelled entries with arguments are mirrored to the handler.
    pub fn record(&self, label: impl Into<String>, args: Vec<Value>) {
        let entry = LogEntry::new(label, args);
        let mirrored = match entry.level() {
            Some(level) if !entry.args.is_empty() => Some((level, entry.args.clone())),
            _ => None,
        };
        self.inner.entries.lock().unwrap().push(entry);

        if let Some((level, args)) = mirrored {
            let handler = self.log_handler();
            handler(self, level, &args);
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into());
    }

    fn emit(&self, level: LogLevel, message: String) {
        self.record(level.as_str(), vec![Value::String(message)]);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.entries.lock().unwrap().clear();
    }

    pub fn log_handler(&self) -> SharedLogHandler {
        self.inner.log_handler.read().unwrap().clone()
    }

    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&CallLog, LogLevel, &[Value]) + Send + Sync + 'static,
    {
        *self.inner.log_handler.write().unwrap() = Arc::new(handler);
    }

    pub fn reset_log_handler(&self) {
        *self.inner.log_handler.write().unwrap() = default_log_handler_arc();
    }
}

fn default_log_handler_arc() -> SharedLogHandler {
    Arc::new(default_log_handler)
}

fn default_log_handler(log: &CallLog, level: LogLevel, args: &[Value]) {
    log::log!(target: log.name(), level.facade_level(), "{}", build_message(args));
}

fn build_message(args: &[Value]) -> String {
    args.iter()
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
