//! Views, their access requirements, and the route guard
//!
//! Every view the client can show is a [`Route`]. Its [`RouteDescriptor`] is
//! static and says whether it needs a signed-in user and, optionally, which
//! role. [`evaluate`] turns a descriptor plus the current identity into a
//! [`NavigationDecision`]. It is pure and cheap, and callers run it on every
//! navigation and before every frame that shows a protected view.

use crate::identity::{Identity, Role};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Signup,
    Profile,
    Chat,
    Doctors,
    PatientDashboard,
    DoctorDashboard,
}

/// Static access requirements of one route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: &'static str,
    pub required_auth: bool,
    pub required_role: Option<Role>,
}

const ROUTES: [(Route, RouteDescriptor); 8] = [
    (Route::Home, RouteDescriptor { path: "/", required_auth: false, required_role: None }),
    (Route::Login, RouteDescriptor { path: "/login", required_auth: false, required_role: None }),
    (Route::Signup, RouteDescriptor { path: "/signup", required_auth: false, required_role: None }),
    (Route::Profile, RouteDescriptor { path: "/profile", required_auth: true, required_role: None }),
    (Route::Chat, RouteDescriptor { path: "/chat", required_auth: true, required_role: Some(Role::Patient) }),
    (Route::Doctors, RouteDescriptor { path: "/doctors", required_auth: true, required_role: Some(Role::Patient) }),
    (
        Route::PatientDashboard,
        RouteDescriptor { path: "/dashboard", required_auth: true, required_role: Some(Role::Patient) },
    ),
    (
        Route::DoctorDashboard,
        RouteDescriptor { path: "/doctor-dashboard", required_auth: true, required_role: Some(Role::Doctor) },
    ),
];

impl Route {
    pub fn all() -> Vec<Route> {
        ROUTES.iter().map(|(route, _)| *route).collect()
    }

    pub fn descriptor(&self) -> RouteDescriptor {
        ROUTES
            .iter()
            .find(|(route, _)| route == self)
            .map(|(_, descriptor)| *descriptor)
            .unwrap_or(ROUTES[0].1)
    }

    pub fn path(&self) -> &'static str {
        self.descriptor().path
    }

    pub fn from_path(path: &str) -> Option<Route> {
        ROUTES
            .iter()
            .find(|(_, descriptor)| descriptor.path == path)
            .map(|(route, _)| *route)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Login => "Log In",
            Route::Signup => "Sign Up",
            Route::Profile => "Profile",
            Route::Chat => "AI Consultation",
            Route::Doctors => "Find Doctors",
            Route::PatientDashboard => "My Dashboard",
            Route::DoctorDashboard => "Doctor Console",
        }
    }
}

/// Why a navigation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    WrongRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect { to: Route, reason: DenyReason },
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }
}

/// Decide whether `descriptor` may render for `identity`.
///
/// Signed-out users are sent to the login view, except for role-restricted
/// views which send them home like any other role mismatch.
pub fn evaluate(descriptor: &RouteDescriptor, identity: Option<&Identity>) -> NavigationDecision {
    if !descriptor.required_auth {
        return NavigationDecision::Allow;
    }

    let Some(identity) = identity else {
        let to = if descriptor.required_role.is_some() {
            Route::Home
        } else {
            Route::Login
        };
        return NavigationDecision::Redirect {
            to,
            reason: DenyReason::Unauthenticated,
        };
    };

    match descriptor.required_role {
        Some(role) if role != identity.role => NavigationDecision::Redirect {
            to: Route::Home,
            reason: DenyReason::WrongRole,
        },
        _ => NavigationDecision::Allow,
    }
}

/// Resolve a navigation intent to the route that will actually render.
///
/// Follows redirects; the redirect targets are public so this settles in one
/// hop, but the loop is bounded by the size of the route table regardless.
pub fn resolve(target: Route, identity: Option<&Identity>) -> (Route, NavigationDecision) {
    let first = evaluate(&target.descriptor(), identity);
    let mut current = target;
    let mut decision = first;

    for _ in 0..ROUTES.len() {
        match decision {
            NavigationDecision::Allow => break,
            NavigationDecision::Redirect { to, reason } => {
                debug!(from = current.path(), to = to.path(), ?reason, "Navigation redirected");
                current = to;
                decision = evaluate(&to.descriptor(), identity);
            }
        }
    }

    (current, first)
}
