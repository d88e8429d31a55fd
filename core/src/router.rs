//! Client-side page routing.
//!
//! Navigation keeps a history stack and runs every registered after-hook
//! once per successful navigation. The workspace refresh is one such hook
//! (see [`Router::on_workspace_enter`]), so callers observe navigations
//! without a global event bus.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`: upload and case list.
    Workspace,
    /// `/config`: extraction field configuration.
    FieldConfig,
    /// `/case/{id}`
    CaseDetail(Uuid),
}

impl Route {
    /// Match a location path. Query string, fragment and a trailing slash
    /// are ignored.
    pub fn parse(location: &str) -> Option<Route> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match path {
            "/" => Some(Route::Workspace),
            "/config" => Some(Route::FieldConfig),
            _ => {
                let id = path.strip_prefix("/case/")?;
                Uuid::parse_str(id).ok().map(Route::CaseDetail)
            }
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Workspace => "/".to_string(),
            Route::FieldConfig => "/config".to_string(),
            Route::CaseDetail(id) => format!("/case/{id}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Workspace => "Home",
            Route::FieldConfig => "Config",
            Route::CaseDetail(_) => "CaseDetail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no route matches {0:?}")]
    NotFound(String),
}

/// A completed navigation, as seen by after-hooks.
#[derive(Debug, Clone, Copy)]
pub struct Navigation<'a> {
    pub from: Option<&'a Route>,
    pub to: &'a Route,
}

type AfterHook = Box<dyn FnMut(&Navigation<'_>) + Send>;

#[derive(Default)]
pub struct Router {
    history: Vec<Route>,
    after_hooks: Vec<AfterHook>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Route> {
        self.history.last()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Register a hook run after every navigation, in registration order.
    pub fn after_each(&mut self, hook: impl FnMut(&Navigation<'_>) + Send + 'static) {
        self.after_hooks.push(Box::new(hook));
    }

    /// Run `refresh` each time navigation lands on the workspace.
    pub fn on_workspace_enter(&mut self, mut refresh: impl FnMut() + Send + 'static) {
        self.after_each(move |nav| {
            if *nav.to == Route::Workspace {
                refresh();
            }
        });
    }

    pub fn navigate(&mut self, location: &str) -> Result<&Route, RouteError> {
        let route = Route::parse(location).ok_or_else(|| RouteError::NotFound(location.to_string()))?;
        self.push(route);
        self.current().ok_or_else(|| RouteError::NotFound(location.to_string()))
    }

    pub fn push(&mut self, route: Route) {
        let from = self.history.last().cloned();
        self.history.push(route);
        self.run_hooks(from);
    }

    /// Go back one entry. Returns `None` when there is nothing to go back to.
    pub fn back(&mut self) -> Option<&Route> {
        if self.history.len() < 2 {
            return None;
        }
        let from = self.history.pop();
        self.run_hooks(from);
        self.history.last()
    }

    fn run_hooks(&mut self, from: Option<Route>) {
        let Some(to) = self.history.last() else {
            return;
        };
        let nav = Navigation {
            from: from.as_ref(),
            to,
        };
        tracing::debug!(from = ?nav.from.map(Route::name), to = nav.to.name(), "navigated");
        for hook in &mut self.after_hooks {
            hook(&nav);
        }
    }
}
