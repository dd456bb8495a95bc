use std::collections::HashMap;

use tower_sessions::Session;

use crate::AppResult;

const GATE_KEY: &str = "dashboard_gate";

/// Per-username authentication state for one browsing session.
///
/// The whole map lives under a single session key; each username has its
/// own entry, so authenticating for one dashboard never opens another.
pub struct DashboardGate {
    session: Session,
}

impl DashboardGate {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn is_authorized(&self, username: &str) -> AppResult<bool> {
        Ok(self.entries().await?.get(username).copied().unwrap_or(false))
    }

    pub async fn authorize(&self, username: &str) -> AppResult<()> {
        let mut entries = self.entries().await?;
        entries.insert(username.to_owned(), true);
        self.session.insert(GATE_KEY, entries).await?;
        Ok(())
    }

    /// Clears this username's entry only; other dashboards authenticated in
    /// the same session stay authenticated.
    pub async fn revoke(&self, username: &str) -> AppResult<()> {
        let mut entries = self.entries().await?;
        entries.remove(username);
        self.session.insert(GATE_KEY, entries).await?;
        Ok(())
    }

    async fn entries(&self) -> AppResult<HashMap<String, bool>> {
        Ok(self
            .session
            .get::<HashMap<String, bool>>(GATE_KEY)
            .await?
            .unwrap_or_default())
    }
}
