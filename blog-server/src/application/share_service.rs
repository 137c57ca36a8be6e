use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::forms::ShareForm;
use crate::domain::post::Post;
use crate::infrastructure::config::{MailConfig, SiteConfig};
use crate::infrastructure::mailer::{EmailMessage, Mailer};
use tracing::{error, info, instrument};

/// Recommends a post to someone else by email.
pub struct ShareService {
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
    mail: MailConfig,
}

impl ShareService {
    pub fn new(mailer: Arc<dyn Mailer>, site: SiteConfig, mail: MailConfig) -> Self {
        Self { mailer, site, mail }
    }

    pub fn compose(&self, post: &Post, form: &ShareForm) -> EmailMessage {
        let post_url = self.site.absolute_url(&post.canonical_path());
        EmailMessage {
            from: self.mail.from_address.clone(),
            to: vec![form.to.clone()],
            subject: format!("{} recommends you read {}", form.name, post.title),
            text: format!(
                "Read {} at {}\n\n{}'s comments: {}",
                post.title, post_url, form.name, form.comments
            ),
        }
    }

    /// Validates the form and hands the message to the mailer. Returns once the
    /// message is accepted; delivery errors are not retried.
    #[instrument(skip(self, post, form), fields(post_id = %post.id))]
    pub async fn share(&self, post: &Post, form: ShareForm) -> Result<(), DomainError> {
        let form = form.clean()?;
        let message = self.compose(post, &form);
        self.mailer.send(message).await.map_err(|e| {
            error!("failed to send share email: {}", e);
            DomainError::Internal(e.to_string())
        })?;
        info!(to = %form.to, "post shared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::PostStatus;
    use crate::infrastructure::mailer::{MailError, MockMailer};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn post() -> Post {
        Post::new(
            Uuid::new_v4(),
            "Rust traits".into(),
            None,
            "body".into(),
            PostStatus::Published,
            Some(Utc.with_ymd_and_hms(2024, 6, 9, 8, 0, 0).unwrap()),
            vec![],
        )
    }

    fn form(to: &str) -> ShareForm {
        ShareForm {
            name: "Ann".into(),
            email: "ann@example.com".into(),
            to: to.into(),
            comments: "worth it".into(),
        }
    }

    fn service(mailer: MockMailer) -> ShareService {
        let site = SiteConfig {
            base_url: "https://blog.example.com".into(),
            ..SiteConfig::default()
        };
        ShareService::new(Arc::new(mailer), site, MailConfig::default())
    }

    #[tokio::test]
    async fn share_sends_recommendation() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|m| {
                m.to == vec!["bob@example.com".to_string()]
                    && m.subject == "Ann recommends you read Rust traits"
                    && m.text
                        == "Read Rust traits at https://blog.example.com/api/posts/2024/6/9/rust-traits\n\nAnn's comments: worth it"
            })
            .times(1)
            .returning(|_| Ok(()));

        service(mailer).share(&post(), form("bob@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_recipient_sends_nothing() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();

        let err = service(mailer).share(&post(), form("bob")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.contains("to")));
    }

    #[tokio::test]
    async fn delivery_failure_is_fatal() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(MailError::Rejected(503)));

        let err = service(mailer)
            .share(&post(), form("bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
