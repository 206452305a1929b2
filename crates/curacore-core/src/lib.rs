pub mod api;
pub mod booking;
pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod nav;
pub mod route;
pub mod session;

// Re-export main types for convenience
pub use api::ApiClient;
pub use booking::BookingDraft;
pub use chat::{ChatBackend, ChatSession, ChatTicket, Message, PendingSend, Speaker};
pub use config::Config;
pub use error::ApiError;
pub use identity::{Identity, Role};
pub use models::{Appointment, AppointmentStatus, Doctor, Profile};
pub use nav::{IdentityBlock, NavAction, NavItem, NavSection, NavigationMenu};
pub use route::{DenyReason, NavigationDecision, Route, RouteDescriptor};
pub use session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
