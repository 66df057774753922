use crate::auth::Principal;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Top-level UI surface. Exactly one tier is visible at any time; the enum
/// makes partial visibility unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Anonymous landing surface shown on startup.
    Facade,
    /// Credential-entry surface, revealed by an explicit action.
    Login,
    /// The authenticated application surface.
    Authenticated,
}

/// Named page inside the facade. Orthogonal to the tier itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacadePage {
    Home,
    About,
    Contact,
}

/// Tier state machine plus the small orthogonal bits that ride along with
/// it: the current facade page, the shutdown overlay inside the
/// authenticated tier, and the logged-in principal.
///
/// Transitions are caller-driven; nothing here reacts to network events on
/// its own, and no navigation history is kept.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<RwLock<InnerState>>,
}

struct InnerState {
    tier: Tier,
    facade_page: FacadePage,
    overlay: bool,
    principal: Option<Principal>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(InnerState {
                tier: Tier::Facade,
                facade_page: FacadePage::Home,
                overlay: false,
                principal: None,
            })),
        }
    }

    pub fn tier(&self) -> Tier {
        self.inner.read().tier
    }

    pub fn facade_page(&self) -> FacadePage {
        self.inner.read().facade_page
    }

    pub fn show_facade_page(&self, page: FacadePage) {
        self.inner.write().facade_page = page;
    }

    /// Facade → Login, triggered by the hidden reveal action. A no-op from
    /// any other tier.
    pub fn reveal_login(&self) {
        let mut inner = self.inner.write();
        if inner.tier == Tier::Facade {
            inner.tier = Tier::Login;
            debug!("tier" = ?inner.tier, "login revealed");
        }
    }

    /// Login → Authenticated, to be called only once a login has resolved
    /// successfully.
    pub fn complete_login(&self, principal: Principal) {
        let mut inner = self.inner.write();
        if inner.tier == Tier::Login {
            inner.tier = Tier::Authenticated;
            inner.principal = Some(principal);
            debug!("tier" = ?inner.tier, "login completed");
        }
    }

    /// Explicit "return" action, available from Login and Authenticated.
    pub fn return_to_facade(&self) {
        let mut inner = self.inner.write();
        inner.tier = Tier::Facade;
    }

    /// Authenticated → Facade after logout. Also lowers the overlay and
    /// forgets the principal.
    pub fn logout(&self) {
        let mut inner = self.inner.write();
        inner.tier = Tier::Facade;
        inner.overlay = false;
        inner.principal = None;
        debug!("tier" = ?inner.tier, "returned to facade after logout");
    }

    /// Raises the shutdown overlay. Only meaningful inside Authenticated;
    /// the overlay is not a tier and never changes which tier is shown.
    pub fn raise_overlay(&self) {
        let mut inner = self.inner.write();
        if inner.tier == Tier::Authenticated {
            inner.overlay = true;
        }
    }

    /// Lowers the overlay (escape/cancel signal).
    pub fn lower_overlay(&self) {
        self.inner.write().overlay = false;
    }

    pub fn overlay_raised(&self) -> bool {
        self.inner.read().overlay
    }

    pub fn principal(&self) -> Option<Principal> {
        self.inner.read().principal.clone()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
