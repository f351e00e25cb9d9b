use crate::analytics::config::TrackerDescriptor;

/// The tracker a command is addressed to.
#[derive(Clone, Copy, Debug)]
pub enum TrackerRef<'a> {
    /// The default, unnamed tracker.
    Default,
    Name(&'a str),
    Descriptor(&'a TrackerDescriptor),
}

impl<'a> From<&'a str> for TrackerRef<'a> {
    fn from(name: &'a str) -> Self {
        TrackerRef::Name(name)
    }
}

impl<'a> From<Option<&'a str>> for TrackerRef<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(TrackerRef::Default, TrackerRef::Name)
    }
}

impl<'a> From<&'a TrackerDescriptor> for TrackerRef<'a> {
    fn from(tracker: &'a TrackerDescriptor) -> Self {
        TrackerRef::Descriptor(tracker)
    }
}

/// Namespaces `base` for `tracker`: `"<name>.<base>"`, or `base` for the default tracker.
pub fn command_name<'a>(base: &str, tracker: impl Into<TrackerRef<'a>>) -> String {
    let name = match tracker.into() {
        TrackerRef::Default => None,
        TrackerRef::Name(name) => Some(name),
        TrackerRef::Descriptor(descriptor) => descriptor.name(),
    };
    match name {
        Some(name) => format!("{name}.{base}"),
        None => base.to_string(),
    }
}
