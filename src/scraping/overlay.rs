use crate::browser::BrowserSession;
use crate::error::{self, ScrapeError, Stage};
use crate::selector::{Selector, SelectorStatus, SelectorSyntaxValidator};

/// Best-effort removal of cookie/consent overlays. Never fails a request.
#[derive(Debug, Clone, Default)]
pub struct OverlayDismisser {
    validator: SelectorSyntaxValidator,
}

impl OverlayDismisser {
    pub fn new(validator: SelectorSyntaxValidator) -> Self {
        Self { validator }
    }

    /// Clicks `popup` if given; failures are logged and dropped
    pub async fn dismiss(&self, session: &BrowserSession, popup: Option<&Selector>) {
        let Some(popup) = popup.filter(|s| !s.is_blank()) else {
            return;
        };

        match self.try_dismiss(session, popup).await {
            Ok(()) => ::log::info!("dismissed overlay {}", popup.path()),
            Err(e) => error::log_absorbed(Stage::DismissingOverlay, &e),
        }
    }

    async fn try_dismiss(
        &self,
        session: &BrowserSession,
        popup: &Selector,
    ) -> Result<(), ScrapeError> {
        let validity = self.validator.validate_selector(popup)?;
        if validity.selector.status() != Some(SelectorStatus::Valid) {
            return Err(ScrapeError::InvalidSelector {
                path: popup.path().to_string(),
            });
        }

        session.click(popup.path()).await?;
        session.settle().await;
        Ok(())
    }
}
