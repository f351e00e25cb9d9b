use std::sync::Mutex;

use url::Url;

use crate::analytics::error::{invalid_argument, AnalyticsResult};

/// Read-only view of the page the application is currently showing.
pub trait PageContext: Send + Sync {
    /// Location path, e.g. `/products/42`.
    fn path(&self) -> String;

    /// Path plus query string.
    fn url(&self) -> String;

    fn query(&self) -> Vec<(String, String)>;

    fn title(&self) -> String;

    fn scheme(&self) -> String {
        "http".to_string()
    }

    /// Tracking URL declared by the active route, if any.
    fn route_page_track(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
struct StaticPageState {
    location: Option<Url>,
    title: String,
    route_page_track: Option<String>,
}

/// A page whose location only changes through [`StaticPage::navigate`].
///
/// A page without a location reports an empty path, which is what a host application sees
/// before its router has resolved anything.
#[derive(Debug, Default)]
pub struct StaticPage {
    state: Mutex<StaticPageState>,
}

impl StaticPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(location: &str) -> AnalyticsResult<Self> {
        let page = Self::new();
        page.navigate(location)?;
        Ok(page)
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.set_title(title);
        self
    }

    pub fn navigate(&self, location: &str) -> AnalyticsResult<()> {
        let url = Url::parse(location)
            .map_err(|err| invalid_argument(format!("invalid page location `{location}`: {err}")))?;
        self.state.lock().unwrap().location = Some(url);
        Ok(())
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().unwrap().title = title.into();
    }

    pub fn set_route_page_track(&self, page_track: Option<String>) {
        self.state.lock().unwrap().route_page_track = page_track;
    }
}

impl PageContext for StaticPage {
    fn path(&self) -> String {
        let state = self.state.lock().unwrap();
        state
            .location
            .as_ref()
            .map(|url| url.path().to_string())
            .unwrap_or_default()
    }

    fn url(&self) -> String {
        let state = self.state.lock().unwrap();
        match &state.location {
            Some(url) => match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            },
            None => String::new(),
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        state
            .location
            .as_ref()
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default()
    }

    fn title(&self) -> String {
        self.state.lock().unwrap().title.clone()
    }

    fn scheme(&self) -> String {
        let state = self.state.lock().unwrap();
        state
            .location
            .as_ref()
            .map(|url| url.scheme().to_string())
            .unwrap_or_else(|| "http".to_string())
    }

    fn route_page_track(&self) -> Option<String> {
        self.state.lock().unwrap().route_page_track.clone()
    }
}
