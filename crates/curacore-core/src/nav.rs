//! Navigation visibility filter
//!
//! Decides which sidebar entries are offered for the current identity. This
//! is presentation only: a hidden entry does not protect anything, the route
//! guard does.

use crate::identity::{Identity, Role};
use crate::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSection {
    General,
    Patient,
    Doctor,
    Account,
}

impl NavSection {
    pub fn heading(&self) -> Option<&'static str> {
        match self {
            NavSection::General => None,
            NavSection::Patient => Some("Patient View"),
            NavSection::Doctor => Some("Doctor View"),
            NavSection::Account => Some("Account"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Go(Route),
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub section: NavSection,
    pub action: NavAction,
}

impl NavItem {
    fn go(label: &'static str, section: NavSection, route: Route) -> Self {
        Self {
            label,
            section,
            action: NavAction::Go(route),
        }
    }
}

/// What the account block at the bottom of the sidebar shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityBlock {
    SignedIn { display_name: String, role: Role },
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationMenu {
    pub items: Vec<NavItem>,
    pub identity: IdentityBlock,
}

impl NavigationMenu {
    pub fn for_identity(identity: Option<&Identity>) -> Self {
        let mut items = vec![NavItem::go("Home", NavSection::General, Route::Home)];

        match identity.map(|i| i.role) {
            None | Some(Role::Patient) => {
                items.push(NavItem::go("AI Consultation", NavSection::Patient, Route::Chat));
                items.push(NavItem::go("Find Doctors", NavSection::Patient, Route::Doctors));
                items.push(NavItem::go("My Dashboard", NavSection::Patient, Route::PatientDashboard));
            }
            Some(Role::Doctor) => {
                items.push(NavItem::go("Patient Queue", NavSection::Doctor, Route::DoctorDashboard));
            }
        }

        let identity = match identity {
            Some(user) => {
                items.push(NavItem::go("Profile", NavSection::Account, Route::Profile));
                items.push(NavItem {
                    label: "Sign Out",
                    section: NavSection::Account,
                    action: NavAction::SignOut,
                });
                IdentityBlock::SignedIn {
                    display_name: user.display_name.clone(),
                    role: user.role,
                }
            }
            None => {
                items.push(NavItem::go("Log In", NavSection::Account, Route::Login));
                IdentityBlock::SignedOut
            }
        };

        Self { items, identity }
    }

    pub fn routes(&self) -> Vec<Route> {
        self.items
            .iter()
            .filter_map(|item| match item.action {
                NavAction::Go(route) => Some(route),
                NavAction::SignOut => None,
            })
            .collect()
    }

    pub fn has_sign_out(&self) -> bool {
        self.items.iter().any(|item| item.action == NavAction::SignOut)
    }

    /// Index of the entry leading to `route`, for highlighting the active view
    pub fn position_of(&self, route: Route) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.action == NavAction::Go(route))
    }
}
