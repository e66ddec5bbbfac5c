// In-memory dashboard used to drive the traversal without a browser

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

use statecrawl::page::{ControlInfo, Page, ResourceEntry};
use statecrawl::targets::{Locator, ScrollTo};
use statecrawl::types::{Theme, ViewportSize};
use statecrawl::{ActionError, CrawlConfig, Timings};
use tempfile::TempDir;

/// CSS key for a `data-testid`, matching `Locator::test_id(..).to_string()`
pub fn tid(id: &str) -> String {
    format!("[data-testid=\"{}\"]", id)
}

/// What the fake application renders and how it reacts
#[derive(Debug, Default, Clone)]
pub struct FakeApp {
    /// Locators visible right after a route loads
    pub routes: HashMap<String, Vec<String>>,
    /// Locators that appear after clicking a locator
    pub reveals: HashMap<String, Vec<String>>,
    /// Locators only rendered on mobile widths
    pub mobile_only: HashSet<String>,
    /// Locators only rendered on desktop widths
    pub desktop_only: HashSet<String>,
    /// Routes whose load fails
    pub broken_routes: HashSet<String>,
    /// Every load fails (app not running)
    pub unreachable: bool,
    /// Theme preference is ignored by the app
    pub ignores_theme: bool,
    /// Screenshot calls after this many succeed report a lost session
    pub lose_session_after: Option<usize>,
    /// Screenshot returns no data
    pub blank_screenshots: bool,
    /// Reading resource timings reports a lost session
    pub resources_lose_session: bool,
}

impl FakeApp {
    pub fn route(mut self, route: &str, visible: &[&str]) -> Self {
        self.routes
            .insert(route.to_string(), visible.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn reveal(mut self, on_click: &str, visible: &[&str]) -> Self {
        self.reveals
            .insert(on_click.to_string(), visible.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn mobile_only(mut self, key: &str) -> Self {
        self.mobile_only.insert(key.to_string());
        self
    }

    pub fn desktop_only(mut self, key: &str) -> Self {
        self.desktop_only.insert(key.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    viewport: Option<ViewportSize>,
    route: Option<String>,
    visible: HashSet<String>,
    stored_theme: Option<Theme>,
    active_theme: Option<Theme>,
    screenshots: usize,
    loads: usize,
    commands: Vec<String>,
}

pub struct FakePage {
    app: FakeApp,
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(app: FakeApp) -> Self {
        Self {
            app,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Every command the traversal issued, in order
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn screenshots_taken(&self) -> usize {
        self.state.lock().unwrap().screenshots
    }

    fn note(&self, state: &mut FakeState, command: String) {
        state.commands.push(command);
    }

    fn renders(&self, state: &FakeState, key: &str) -> bool {
        let mobile = state.viewport.map(|v| v.is_mobile()).unwrap_or(false);
        if mobile && self.app.desktop_only.contains(key) {
            return false;
        }
        if !mobile && self.app.mobile_only.contains(key) {
            return false;
        }
        true
    }

    fn load(&self, state: &mut FakeState, route: &str) {
        state.route = Some(route.to_string());
        state.loads += 1;
        state.visible = self
            .app
            .routes
            .get(route)
            .into_iter()
            .flatten()
            .filter(|key| self.renders(state, key))
            .cloned()
            .collect();
        state.active_theme = if self.app.ignores_theme {
            None
        } else {
            state.stored_theme
        };
    }
}

fn route_of(url: &str) -> String {
    match url.split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => fragment.to_string(),
        _ => "/".to_string(),
    }
}

fn tiny_png(theme: Option<Theme>) -> Vec<u8> {
    let shade = match theme {
        Some(Theme::Dark) => 20,
        _ => 235,
    };
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([shade, shade, shade]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

impl Page for FakePage {
    async fn set_viewport(&self, size: ViewportSize) -> Result<(), ActionError> {
        let mut state = self.state.lock().unwrap();
        state.viewport = Some(size);
        self.note(&mut state, format!("viewport {}", size));
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        let mut state = self.state.lock().unwrap();
        self.note(&mut state, format!("navigate {}", url));
        let route = route_of(url);
        if self.app.unreachable || self.app.broken_routes.contains(&route) {
            state.route = None;
            state.visible.clear();
            return Err(ActionError::Navigation {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.load(&mut state, &route);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        let state = self.state.lock().unwrap();
        Ok(format!(
            "http://fake.test/#{}",
            state.route.as_deref().unwrap_or("/")
        ))
    }

    async fn apply_theme(&self, theme: Theme) -> Result<(), ActionError> {
        let mut state = self.state.lock().unwrap();
        self.note(&mut state, format!("theme {}", theme));
        state.stored_theme = Some(theme);
        let route = state.route.clone().unwrap_or_else(|| "/".to_string());
        self.load(&mut state, &route);
        Ok(())
    }

    async fn active_theme(&self) -> Result<Option<Theme>, ActionError> {
        Ok(self.state.lock().unwrap().active_theme)
    }

    async fn wait_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
        _poll: Duration,
    ) -> Result<(), ActionError> {
        let state = self.state.lock().unwrap();
        if state.visible.contains(&locator.to_string()) {
            Ok(())
        } else {
            Err(ActionError::ElementNotFound {
                locator: locator.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), ActionError> {
        let mut state = self.state.lock().unwrap();
        let key = locator.to_string();
        self.note(&mut state, format!("click {}", key));
        if !state.visible.contains(&key) {
            return Err(ActionError::ElementNotFound {
                locator: key,
                waited_ms: 0,
            });
        }
        let revealed: Vec<String> = self
            .app
            .reveals
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|k| self.renders(&state, k))
            .cloned()
            .collect();
        state.visible.extend(revealed);
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ActionError> {
        self.click(locator).await?;
        let mut state = self.state.lock().unwrap();
        self.note(&mut state, format!("type {}", text));
        Ok(())
    }

    async fn scroll(&self, to: ScrollTo) -> Result<(), ActionError> {
        let mut state = self.state.lock().unwrap();
        self.note(&mut state, format!("scroll {:?}", to));
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), ActionError> {
        let mut state = self.state.lock().unwrap();
        self.note(&mut state, "escape".to_string());
        let route = state.route.clone().unwrap_or_else(|| "/".to_string());
        let base: HashSet<String> = self
            .app
            .routes
            .get(&route)
            .into_iter()
            .flatten()
            .filter(|k| self.renders(&state, k))
            .cloned()
            .collect();
        state.visible = base;
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, ActionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = self.app.lose_session_after
            && state.screenshots >= limit
        {
            return Err(ActionError::Session("browser process exited".to_string()));
        }
        state.screenshots += 1;
        if self.app.blank_screenshots {
            return Ok(Vec::new());
        }
        Ok(tiny_png(state.active_theme))
    }

    async fn scan_controls(&self) -> Result<Vec<ControlInfo>, ActionError> {
        let state = self.state.lock().unwrap();
        let mut keys: Vec<&String> = state.visible.iter().collect();
        keys.sort();
        Ok(keys
            .into_iter()
            .map(|key| ControlInfo {
                tag: "button".to_string(),
                kind: "submit".to_string(),
                text: key.clone(),
                id: None,
                classes: None,
                test_id: key
                    .strip_prefix("[data-testid=\"")
                    .and_then(|s| s.strip_suffix("\"]"))
                    .map(str::to_string),
                href: None,
                visible: true,
                enabled: true,
            })
            .collect())
    }

    async fn resources(&self) -> Result<Vec<ResourceEntry>, ActionError> {
        if self.app.resources_lose_session {
            return Err(ActionError::Session("browser process exited".to_string()));
        }
        let state = self.state.lock().unwrap();
        Ok(vec![ResourceEntry {
            url: format!("http://fake.test/static/js/main.js?load={}", state.loads),
            resource_type: "script".to_string(),
            duration_ms: 12.5,
            status: Some(200),
        }])
    }
}

/// Config pointing at the fake host, writing into a fresh temp dir
pub fn test_config() -> (CrawlConfig, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config =
        CrawlConfig::new("http://fake.test", temp_dir.path()).expect("valid base url");
    config.timings = Timings::immediate();
    (config, temp_dir)
}

/// A small dashboard with a home route, two modals (one with tabs) and a
/// mobile-only overflow path
pub fn dashboard_app() -> FakeApp {
    FakeApp::default()
        .route(
            "/",
            &[
                &tid("logs-btn"),
                &tid("logs-btn-mobile"),
                &tid("community-btn"),
                &tid("overflow-menu-btn"),
                &tid("help-center-btn"),
            ],
        )
        .route("/entertainment", &[&tid("nav-movies")])
        .desktop_only(&tid("logs-btn"))
        .desktop_only(&tid("help-center-btn"))
        .mobile_only(&tid("logs-btn-mobile"))
        .mobile_only(&tid("overflow-menu-btn"))
        .reveal(&tid("community-btn"), &[&tid("tab-directory"), &tid("community-close")])
        .reveal(&tid("overflow-menu-btn"), &["text~\"Help Center\""])
}
