//! Declarative table of the UI states the crawler captures.
//!
//! Each [`TargetState`] says where to navigate and which actions reach it
//! from a fresh load. The table is plain data and is shared by every
//! breakpoint; responsive differences live in `mobile_actions`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an action finds the element it operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "lowercase")]
pub enum Locator {
    /// CSS selector; the first visible match is used
    Css { selector: String },
    /// Element whose own text matches, either exactly or as a substring
    Text { text: String, exact: bool },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    /// Shorthand for `[data-testid="..."]`
    pub fn test_id(id: &str) -> Self {
        Locator::css(format!("[data-testid=\"{}\"]", id))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn exact_text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: true,
        }
    }

    /// XPath equivalent of a text locator.
    ///
    /// Matches on the element's own text nodes so ancestors containing the
    /// text further down don't match first.
    pub fn text_xpath(text: &str, exact: bool) -> String {
        let literal = xpath_literal(text);
        if exact {
            format!("//*[text()[normalize-space(.)={}]]", literal)
        } else {
            format!("//*[text()[contains(normalize-space(.), {})]]", literal)
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => f.write_str(selector),
            Locator::Text { text, exact: true } => write!(f, "text=\"{}\"", text),
            Locator::Text { text, exact: false } => write!(f, "text~\"{}\"", text),
        }
    }
}

/// Quote a string for use inside an XPath expression
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Scroll destination for [`Action::Scroll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollTo {
    Top,
    Middle,
    Bottom,
}

impl ScrollTo {
    pub fn script(&self) -> &'static str {
        match self {
            ScrollTo::Top => "window.scrollTo(0, 0);",
            ScrollTo::Middle => "window.scrollTo(0, document.body.scrollHeight / 2);",
            ScrollTo::Bottom => "window.scrollTo(0, document.body.scrollHeight);",
        }
    }
}

/// One step on the way to a target state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Wait for the element to be visible, then click it
    Click { target: Locator },
    /// Scroll the window
    Scroll { to: ScrollTo },
    /// Wait for the element, focus it and type text
    Type { target: Locator, text: String },
    /// Fixed pause in milliseconds
    Pause { ms: u64 },
}

impl Action {
    pub fn click(target: Locator) -> Self {
        Action::Click { target }
    }

    pub fn click_test_id(id: &str) -> Self {
        Action::Click {
            target: Locator::test_id(id),
        }
    }

    pub fn scroll(to: ScrollTo) -> Self {
        Action::Scroll { to }
    }

    pub fn type_text(target: Locator, text: impl Into<String>) -> Self {
        Action::Type {
            target,
            text: text.into(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Click { target } => write!(f, "click {}", target),
            Action::Scroll { to } => write!(f, "scroll {:?}", to),
            Action::Type { target, text } => write!(f, "type {:?} into {}", text, target),
            Action::Pause { ms } => write!(f, "pause {}ms", ms),
        }
    }
}

/// Where a state sits in the route → modal → tab hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Route,
    Modal,
    Tab,
    Widget,
}

/// A UI state the crawler tries to reach and photograph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetState {
    /// Unique snake_case identifier, used in file names
    pub name: String,
    /// Hash route to load first; `None` stays on the current route
    pub route: Option<String>,
    /// Steps from a fresh load of `route` to the state
    pub actions: Vec<Action>,
    /// Replacement steps for mobile breakpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_actions: Option<Vec<Action>>,
    /// Control that dismisses the state, tried before Escape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Locator>,
    pub kind: StateKind,
    /// Name of the enclosing modal or route state, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub description: String,
}

impl TargetState {
    pub fn new(name: impl Into<String>, kind: StateKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: None,
            actions: Vec::new(),
            mobile_actions: None,
            close: None,
            kind,
            parent: None,
            description: description.into(),
        }
    }

    pub fn on_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn on_mobile(mut self, actions: Vec<Action>) -> Self {
        self.mobile_actions = Some(actions);
        self
    }

    pub fn closed_by(mut self, close: Locator) -> Self {
        self.close = Some(close);
        self
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// The action sequence to run for a layout
    pub fn actions_for(&self, mobile: bool) -> &[Action] {
        match (&self.mobile_actions, mobile) {
            (Some(mobile_actions), true) => mobile_actions,
            _ => &self.actions,
        }
    }

    /// Whether reaching this state opens something that should be dismissed
    pub fn leaves_overlay(&self) -> bool {
        !matches!(self.kind, StateKind::Route)
    }
}

/// Header button with a separate mobile control
fn header_modal(name: &str, desktop_id: &str, mobile_id: &str, description: &str) -> TargetState {
    TargetState::new(name, StateKind::Modal, description)
        .on_route("/")
        .then(Action::click_test_id(desktop_id))
        .on_mobile(vec![Action::click_test_id(mobile_id)])
}

/// Header button that moves into the overflow menu on mobile
fn overflow_modal(name: &str, desktop_id: &str, menu_label: &str, description: &str) -> TargetState {
    TargetState::new(name, StateKind::Modal, description)
        .on_route("/")
        .then(Action::click_test_id(desktop_id))
        .on_mobile(vec![
            Action::click_test_id("overflow-menu-btn"),
            Action::click(Locator::text(menu_label)),
        ])
}

/// A tab inside a modal: open the modal the same way, then click the tab
fn modal_tab(modal: &TargetState, name: &str, tab: Action, description: &str) -> TargetState {
    let mut state = modal.clone();
    state.name = name.to_string();
    state.kind = StateKind::Tab;
    state.parent = Some(modal.name.clone());
    state.description = description.to_string();
    state.actions.push(tab.clone());
    if let Some(mobile) = state.mobile_actions.as_mut() {
        mobile.push(tab);
    }
    state
}

/// Canonical state table for the dashboard
pub fn dashboard_states() -> Vec<TargetState> {
    let mut states = vec![
        TargetState::new("home_default", StateKind::Route, "Home - default view").on_route("/"),
        TargetState::new("home_scroll_mid", StateKind::Route, "Home - scrolled middle")
            .on_route("/")
            .then(Action::scroll(ScrollTo::Middle))
            .under("home_default"),
        TargetState::new(
            "home_scroll_bottom",
            StateKind::Route,
            "Home - scrolled bottom (Entertainment)",
        )
        .on_route("/")
        .then(Action::scroll(ScrollTo::Bottom))
        .under("home_default"),
    ];

    let logs = header_modal("modal_logs", "logs-btn", "logs-btn-mobile", "LOGS Analytics modal")
        .closed_by(Locator::test_id("logs-close"));
    states.push(logs);

    let community = header_modal(
        "modal_community",
        "community-btn",
        "community-btn-mobile",
        "Community Hub modal",
    )
    .closed_by(Locator::test_id("community-close"));
    let community_tabs: Vec<TargetState> = [
        ("directory", "Directory"),
        ("analytics", "Analytics"),
        ("comms", "Comms"),
    ]
    .into_iter()
    .map(|(tab_id, label)| {
        modal_tab(
            &community,
            &format!("community_{}", tab_id),
            Action::click_test_id(&format!("tab-{}", tab_id)),
            &format!("Community - {} tab", label),
        )
    })
    .collect();
    states.push(community);
    states.extend(community_tabs);

    states.push(overflow_modal(
        "modal_helpcenter",
        "help-center-btn",
        "Help Center",
        "Help Center modal",
    ));

    let admin = overflow_modal(
        "modal_admin",
        "admin-console-btn",
        "Admin Console",
        "Admin Console modal (Fleet tab)",
    );
    let admin_tabs: Vec<TargetState> = ["broadcast", "system", "backups", "audit"]
        .into_iter()
        .map(|tab_id| {
            modal_tab(
                &admin,
                &format!("admin_{}", tab_id),
                Action::click_test_id(&format!("admin-tab-{}", tab_id)),
                &format!("Admin Console - {} tab", capitalize(tab_id)),
            )
        })
        .collect();
    states.push(admin);
    states.extend(admin_tabs);

    let status = TargetState::new("modal_systemstatus", StateKind::Modal, "System Status Panel")
        .on_route("/")
        .then(Action::click_test_id("system-status-btn"));
    let endpoints = modal_tab(
        &status,
        "systemstatus_endpoints",
        Action::click(Locator::text("ENDPOINT STATUS")),
        "System Status - Endpoints expanded",
    );
    states.push(status);
    states.push(endpoints);

    for (tool_id, label) in [
        ("quickguide", "Quick Guide"),
        ("calculator", "Calculator"),
        ("translator", "Translator"),
        ("sos", "SOS Beacon"),
        ("currency", "Currency Converter"),
        ("dictionary", "Dictionary"),
        ("notes", "Field Notes"),
    ] {
        states.push(
            TargetState::new(
                format!("quicktool_{}", tool_id),
                StateKind::Modal,
                format!("Quick Tool: {}", label),
            )
            .on_route("/")
            .then(Action::click_test_id(&format!("tool-{}", tool_id))),
        );
    }

    states.push(
        TargetState::new(
            "language_dropdown",
            StateKind::Widget,
            "Language selector dropdown",
        )
        .on_route("/")
        .then(Action::click_test_id("language-selector")),
    );

    let search = Locator::css("input[placeholder*=\"Search\"]");
    states.push(
        TargetState::new("search_focused", StateKind::Widget, "Search bar - focused")
            .on_route("/")
            .then(Action::click(search.clone())),
    );
    states.push(
        TargetState::new("search_query", StateKind::Widget, "Search bar - with query")
            .on_route("/")
            .then(Action::type_text(search, "weather"))
            .under("search_focused"),
    );

    states.push(
        TargetState::new(
            "entertainment_overview",
            StateKind::Route,
            "Entertainment - Overview",
        )
        .on_route("/entertainment"),
    );
    for (tab_id, label) in [
        ("movies", "Movies & TV"),
        ("games", "Games Hub"),
        ("music", "Music"),
        ("photos", "Photos"),
        ("vault", "Vault"),
        ("share", "File Drop"),
    ] {
        states.push(
            TargetState::new(
                format!("entertainment_{}", tab_id),
                StateKind::Tab,
                format!("Entertainment - {}", label),
            )
            .on_route("/entertainment")
            .then(Action::click_test_id(&format!("nav-{}", tab_id)))
            .under("entertainment_overview"),
        );
    }
    states.push(
        TargetState::new("modal_movienight", StateKind::Modal, "Movie Night modal")
            .on_route("/entertainment")
            .then(Action::click(Locator::text("Start Movie Night")))
            .under("entertainment_overview"),
    );

    states
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Names that appear more than once in a table
pub fn duplicate_names(states: &[TargetState]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut dups = Vec::new();
    for state in states {
        if !seen.insert(state.name.as_str()) && !dups.contains(&state.name) {
            dups.push(state.name.clone());
        }
    }
    dups
}

#[cfg(test)]
#[path = "targets_test.rs"]
mod targets_test;
