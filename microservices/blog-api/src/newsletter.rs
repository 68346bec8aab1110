//! Newsletter subscription workflow

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::mail::{Delivery, EmailTemplate, Mailer};
use crate::model::{string_or_none, RequestMeta, Subscriber, SubscriptionStatus};
use crate::store::JsonArrayStore;
use crate::{Error, Result};

pub const SUBSCRIBERS_FILE: &str = "newsletter_subscribers.json";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailForm {
    #[serde(default, deserialize_with = "string_or_none")]
    pub email: Option<String>,
}

impl EmailForm {
    /// Trimmed, lower-cased address; empty is rejected
    fn normalized(&self) -> Result<String> {
        let email = self
            .email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if email.is_empty() {
            return Err(Error::validation("Email is required"));
        }
        Ok(email)
    }
}

/// Subscriber listing with counts
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberListing {
    pub subscribers: Vec<Subscriber>,
    pub total: usize,
    pub active: usize,
}

pub struct NewsletterService {
    store: JsonArrayStore<Subscriber>,
    mailer: Arc<dyn Mailer>,
}

impl NewsletterService {
    pub fn new(data_dir: &Path, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store: JsonArrayStore::new(data_dir.join(SUBSCRIBERS_FILE)),
            mailer,
        }
    }

    /// Add an active subscription and send the welcome email.
    ///
    /// The duplicate check and the append happen under one store lock.
    pub async fn subscribe(&self, form: EmailForm, meta: RequestMeta) -> Result<Subscriber> {
        let email = form.normalized()?;
        if !email_pattern().is_match(&email) {
            return Err(Error::validation("Invalid email"));
        }

        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: email.clone(),
            timestamp: Utc::now(),
            ip: meta.ip,
            user_agent: meta.user_agent,
            status: SubscriptionStatus::Active,
            source: "website".to_string(),
            unsubscribed_at: None,
        };

        let added = self
            .store
            .append_unless(subscriber.clone(), |s| s.is_active_for(&email))
            .await?;
        if !added {
            return Err(Error::validation("This email is already subscribed"));
        }
        info!(subscriber_id = %subscriber.id, "Newsletter subscription added");

        match self
            .mailer
            .send(EmailTemplate::NewsletterWelcome { email })
            .await
        {
            Ok(Delivery::Sent) => info!(subscriber_id = %subscriber.id, "Welcome email sent"),
            Ok(Delivery::Skipped) => {}
            Err(e) => warn!(subscriber_id = %subscriber.id, error = %e, "Failed to send welcome email"),
        }

        Ok(subscriber)
    }

    /// Mark every record for the address as unsubscribed. Fails when the
    /// address has no active subscription. Returns the number of records
    /// updated.
    pub async fn unsubscribe(&self, form: EmailForm) -> Result<usize> {
        let email = form.normalized()?;
        let now = Utc::now();

        let updated = self
            .store
            .modify(|subscribers| {
                if !subscribers.iter().any(|s| s.is_active_for(&email)) {
                    return (None, false);
                }

                let mut updated = 0;
                for subscriber in subscribers.iter_mut().filter(|s| s.email == email) {
                    subscriber.status = SubscriptionStatus::Unsubscribed;
                    subscriber.unsubscribed_at = Some(now);
                    updated += 1;
                }
                (Some(updated), true)
            })
            .await?;

        match updated {
            Some(updated) => {
                info!(records = updated, "Newsletter subscription cancelled");
                Ok(updated)
            }
            None => Err(Error::validation("This email is not subscribed")),
        }
    }

    /// All subscription records, newest first
    pub async fn list(&self) -> Result<SubscriberListing> {
        let mut subscribers = self.store.load_all().await?;
        subscribers.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let active = subscribers.iter().filter(|s| s.is_active()).count();
        Ok(SubscriberListing {
            total: subscribers.len(),
            active,
            subscribers,
        })
    }
}
