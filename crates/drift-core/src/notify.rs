//! Best-effort notifications

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::template::render;

/// Message templates known to every notifier.
pub mod templates {
    pub const PULL_REQUEST_OPENED: &str = "pull_request_opened";
    pub const PULL_REQUEST_UPDATED: &str = "pull_request_updated";

    pub(crate) fn lookup(name: &str) -> Option<&'static str> {
        match name {
            PULL_REQUEST_OPENED => Some(
                "Opened {{ link }} to bump {{ src_module }} to {{ to_version }} in {{ dest_repository }}",
            ),
            PULL_REQUEST_UPDATED => Some("{{ id }} received new commits: {{ commits }}"),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `target` (a channel, address, ...).
    async fn notify(&self, target: &str, message: &str) -> Result<()>;

    /// Render a named template with `env` and deliver it. Unknown names
    /// deliver the name itself.
    async fn notify_template(&self, target: &str, name: &str, env: &Value) -> Result<()> {
        let message = match templates::lookup(name) {
            Some(template) => render(template, env),
            None => name.to_string(),
        };
        self.notify(target, &message).await
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, target: &str, message: &str) -> Result<()> {
        tracing::info!(target_name = %target, "{}", message);
        Ok(())
    }
}

/// Send a templated notification, logging and swallowing any failure.
pub async fn notify_best_effort(notifier: &dyn Notifier, target: Option<&str>, name: &str, env: &Value) {
    let Some(target) = target else {
        return;
    };
    if let Err(e) = notifier.notify_template(target, name, env).await {
        tracing::warn!(target_name = %target, template = name, error = %e, "Notification failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, target: &str, message: &str) -> Result<()> {
            if self.fail {
                return Err(Error::client("unreachable"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), message.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn template_is_rendered() {
        let notifier = Recording::default();
        let env = json!({
            "link": "https://git.example.com/acme/deploy/pull/3",
            "src_module": "api",
            "to_version": "1.2.0",
            "dest_repository": "deploy",
        });
        notify_best_effort(&notifier, Some("#ops"), templates::PULL_REQUEST_OPENED, &env).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(
            sent[0].1,
            "Opened https://git.example.com/acme/deploy/pull/3 to bump api to 1.2.0 in deploy"
        );
    }

    #[tokio::test]
    async fn failures_and_missing_targets_are_swallowed() {
        let notifier = Recording {
            fail: true,
            ..Default::default()
        };
        notify_best_effort(&notifier, Some("#ops"), "anything", &json!({})).await;
        notify_best_effort(&notifier, None, "anything", &json!({})).await;
        assert!(notifier.sent.lock().unwrap().is_empty());
    }
}
