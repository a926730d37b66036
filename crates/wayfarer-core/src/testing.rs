//! Route fixtures shared by the coordinator tests

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use wayfarer_restore::SerdeConverter;
use wayfarer_stack::{
    DeepLinkStrategy, GuardFuture, LayoutKey, Location, PopDecision, RedirectFuture, Route,
};

use crate::builder::CoordinatorBuilder;
use crate::config::CoordinatorConfig;
use crate::coordinator::Coordinator;
use crate::layout::LayoutSpec;
use crate::observer::{LocationEvent, LocationListener};

pub const SHELL: LayoutKey = LayoutKey::new("shell");
pub const TABS: LayoutKey = LayoutKey::new("tabs");
pub const FEED: LayoutKey = LayoutKey::new("feed");
pub const SHEET: LayoutKey = LayoutKey::new("sheet");
pub const DRAWER: LayoutKey = LayoutKey::new("drawer");
pub const LOOP_A: LayoutKey = LayoutKey::new("loop_a");
pub const LOOP_B: LayoutKey = LayoutKey::new("loop_b");

#[derive(Debug, Clone, PartialEq)]
pub enum AppRoute {
    Home,
    Login,
    Profile(String),
    /// Redirects to the profile with the same id
    Legacy(u32),
    /// Redirects after a delay
    Slow,
    Editor { dirty: bool },
    /// Guard defers
    Confirm,
    /// Guard fails
    Broken,
    Draft { body: String },
    Article(String),
    Invite(String),

    Shell,
    Settings,
    About,

    Tabs,
    FeedTab,
    SearchTab,
    Post(String),

    Sheet,
    Share,

    Drawer,
    Menu,

    Orphan,
    LoopA,
    LoopB,
    Looped,
}

impl Route for AppRoute {
    fn owner(&self) -> Option<LayoutKey> {
        match self {
            AppRoute::Settings | AppRoute::About => Some(SHELL),
            AppRoute::FeedTab | AppRoute::SearchTab => Some(TABS),
            AppRoute::Post(_) => Some(FEED),
            AppRoute::Share => Some(SHEET),
            AppRoute::Menu => Some(DRAWER),
            AppRoute::Orphan => Some(LayoutKey::new("missing")),
            AppRoute::LoopA | AppRoute::Looped => Some(LOOP_B),
            AppRoute::LoopB => Some(LOOP_A),
            _ => None,
        }
    }

    fn layout(&self) -> Option<LayoutKey> {
        match self {
            AppRoute::Shell => Some(SHELL),
            AppRoute::Tabs => Some(TABS),
            AppRoute::FeedTab => Some(FEED),
            AppRoute::Sheet => Some(SHEET),
            AppRoute::Drawer => Some(DRAWER),
            AppRoute::LoopA => Some(LOOP_A),
            AppRoute::LoopB => Some(LOOP_B),
            _ => None,
        }
    }

    fn location(&self) -> Option<String> {
        let location = match self {
            AppRoute::Home => "/".to_string(),
            AppRoute::Login => "/login".to_string(),
            AppRoute::Profile(id) => format!("/profile/{}", id),
            AppRoute::Legacy(id) => format!("/legacy/{}", id),
            AppRoute::Slow => "/slow".to_string(),
            AppRoute::Editor { .. } => "/editor".to_string(),
            AppRoute::Confirm => "/confirm".to_string(),
            AppRoute::Broken => "/broken".to_string(),
            AppRoute::Article(id) => format!("/article/{}", id),
            AppRoute::Invite(code) => format!("/invite/{}", code),
            AppRoute::Settings => "/settings".to_string(),
            AppRoute::About => "/about".to_string(),
            AppRoute::FeedTab => "/feed".to_string(),
            AppRoute::SearchTab => "/search".to_string(),
            AppRoute::Post(id) => format!("/post/{}", id),
            AppRoute::Share => "/share".to_string(),
            AppRoute::Menu => "/menu".to_string(),
            AppRoute::Shell => "/shell".to_string(),
            AppRoute::Tabs => "/tabs".to_string(),
            AppRoute::Sheet => "/sheet".to_string(),
            AppRoute::Drawer => "/drawer".to_string(),
            _ => return None,
        };
        Some(location)
    }

    fn pop_guard(&self) -> Option<GuardFuture> {
        match self {
            AppRoute::Editor { dirty } => {
                let decision = PopDecision::from(!*dirty);
                Some(Box::pin(async move { Ok(decision) }))
            }
            AppRoute::Confirm => Some(Box::pin(async { Ok(PopDecision::Deferred) })),
            AppRoute::Broken => Some(Box::pin(async { Err(anyhow::anyhow!("guard exploded")) })),
            _ => None,
        }
    }

    fn redirect(&self) -> Option<RedirectFuture<Self>> {
        match self {
            AppRoute::Legacy(id) => {
                let id = id.to_string();
                Some(Box::pin(async move { Ok(Some(AppRoute::Profile(id))) }))
            }
            AppRoute::Slow => Some(Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Some(AppRoute::Profile("slow".to_string())))
            })),
            _ => None,
        }
    }

    fn deep_link(&self) -> DeepLinkStrategy {
        match self {
            AppRoute::Article(_) => DeepLinkStrategy::Push,
            AppRoute::Invite(_) => DeepLinkStrategy::Custom,
            _ => DeepLinkStrategy::Replace,
        }
    }

    fn converter(&self) -> Option<&'static str> {
        match self {
            AppRoute::Draft { .. } => Some("draft"),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct DraftPayload {
    body: String,
}

pub async fn parse(location: Location) -> anyhow::Result<AppRoute> {
    Ok(match location.segments().as_slice() {
        [] => AppRoute::Home,
        ["login"] => AppRoute::Login,
        ["profile", id] => AppRoute::Profile(id.to_string()),
        ["legacy", id] => AppRoute::Legacy(id.parse()?),
        ["slow"] => AppRoute::Slow,
        ["editor"] => AppRoute::Editor { dirty: false },
        ["confirm"] => AppRoute::Confirm,
        ["article", id] => AppRoute::Article(id.to_string()),
        ["invite", code] => AppRoute::Invite(code.to_string()),
        ["settings"] => AppRoute::Settings,
        ["about"] => AppRoute::About,
        ["feed"] => AppRoute::FeedTab,
        ["search"] => AppRoute::SearchTab,
        ["post", id] => AppRoute::Post(id.to_string()),
        ["share"] => AppRoute::Share,
        ["menu"] => AppRoute::Menu,
        ["shell"] => AppRoute::Shell,
        ["tabs"] => AppRoute::Tabs,
        ["sheet"] => AppRoute::Sheet,
        ["drawer"] => AppRoute::Drawer,
        other => anyhow::bail!("no route for {:?}", other),
    })
}

pub fn profile(id: &str) -> AppRoute {
    AppRoute::Profile(id.to_string())
}

pub fn post(id: &str) -> AppRoute {
    AppRoute::Post(id.to_string())
}

/// Every layout registered, no deep-link handler, no adapter for "drawer"
pub fn builder() -> CoordinatorBuilder<AppRoute> {
    Coordinator::builder(CoordinatorConfig::new().with_auxiliary("modal"))
        .parser(parse)
        .layout(SHELL, LayoutSpec::list(|| AppRoute::Shell))
        .layout(
            TABS,
            LayoutSpec::indexed(|| AppRoute::Tabs, vec![AppRoute::FeedTab, AppRoute::SearchTab]),
        )
        .layout(FEED, LayoutSpec::list(|| AppRoute::FeedTab))
        .layout(SHEET, LayoutSpec::list(|| AppRoute::Sheet).on_stack("modal"))
        .layout(DRAWER, LayoutSpec::custom(|| AppRoute::Drawer, "drawer"))
        .layout(LOOP_A, LayoutSpec::list(|| AppRoute::LoopA))
        .layout(LOOP_B, LayoutSpec::list(|| AppRoute::LoopB))
        .converter(
            "draft",
            SerdeConverter::new(
                |route: &AppRoute| match route {
                    AppRoute::Draft { body } => Some(DraftPayload { body: body.clone() }),
                    _ => None,
                },
                |payload: DraftPayload| AppRoute::Draft { body: payload.body },
            ),
        )
}

pub fn coordinator() -> Coordinator<AppRoute> {
    builder().build().unwrap()
}

#[derive(Default)]
pub struct Recorder(pub Mutex<Vec<LocationEvent>>);

impl Recorder {
    pub fn events(&self) -> Vec<LocationEvent> {
        self.0.lock().clone()
    }
}

impl LocationListener for Recorder {
    fn on_location(&self, event: &LocationEvent) {
        self.0.lock().push(event.clone());
    }
}

pub fn record(coordinator: &Coordinator<AppRoute>) -> Arc<Recorder> {
    let recorder = Arc::new(Recorder::default());
    coordinator.subscribe(recorder.clone());
    recorder
}
