//! Best-effort consent overlay dismissal
//!
//! The whole step runs under one timeout and never fails its caller.

use crate::config::SelectorConfig;
use crate::crawler::driver::{ClickOptions, DriverCommand, PageDriver};
use std::time::Duration;

/// How an overlay was dealt with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// An accept button matching this selector was clicked
    Clicked(String),
    /// No button could be clicked; the dismiss key was pressed
    KeyPressed,
    /// Nothing worked, or the step ran out of time
    NotDismissed,
}

/// Tries each accept-button selector in order, then the dismiss key
pub async fn dismiss_consent(
    driver: &mut dyn PageDriver,
    selectors: &SelectorConfig,
    timeout: Duration,
) -> ConsentOutcome {
    match tokio::time::timeout(timeout, try_dismiss(driver, selectors)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!("Consent dismissal timed out after {:?}", timeout);
            ConsentOutcome::NotDismissed
        }
    }
}

async fn try_dismiss(driver: &mut dyn PageDriver, selectors: &SelectorConfig) -> ConsentOutcome {
    for selector in &selectors.consent {
        let Ok(buttons) = driver.query_selector_all(selector).await else {
            continue;
        };
        let Some(button) = buttons.into_iter().find(|b| b.visible) else {
            continue;
        };

        match driver.click(&button, ClickOptions::default()).await {
            Ok(()) => {
                tracing::info!("Dismissed consent overlay via '{}'", selector);
                return ConsentOutcome::Clicked(selector.clone());
            }
            Err(e) => tracing::debug!("Consent button '{}' not clickable: {}", selector, e),
        }
    }

    match driver
        .evaluate(&DriverCommand::PressKey(selectors.dismiss_key.clone()))
        .await
    {
        Ok(_) => {
            tracing::debug!("Pressed {} to dismiss any overlay", selectors.dismiss_key);
            ConsentOutcome::KeyPressed
        }
        Err(e) => {
            tracing::warn!("Could not dismiss consent overlay: {}", e);
            ConsentOutcome::NotDismissed
        }
    }
}
