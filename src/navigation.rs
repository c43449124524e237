use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Clients,
    MyClients,
    Policies,
    Users,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Home => "/home",
            Self::Clients => "/clients",
            Self::MyClients => "/my-clients",
            Self::Policies => "/policies",
            Self::Users => "/users",
        }
    }
}

#[mockall::automock]
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// A one-shot CLI has no views to switch; the last requested route is kept so the
/// command can tell the user where the flow ended.
#[derive(Debug, Default)]
pub struct RouteLog(Mutex<Option<Route>>);

impl RouteLog {
    pub fn last(&self) -> Option<Route> {
        self.0.lock().ok().and_then(|route| *route)
    }
}

impl Navigator for RouteLog {
    fn navigate(&self, route: Route) {
        tracing::debug!(path = route.path(), "navigate");
        if let Ok(mut last) = self.0.lock() {
            *last = Some(route);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_log_keeps_last() {
        let log = RouteLog::default();
        assert_eq!(log.last(), None);
        log.navigate(Route::Clients);
        log.navigate(Route::MyClients);
        assert_eq!(log.last(), Some(Route::MyClients));
        assert_eq!(Route::MyClients.path(), "/my-clients");
    }
}
