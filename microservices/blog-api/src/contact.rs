//! Contact form workflow

use chrono::Utc;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::mail::{Delivery, EmailTemplate, Mailer};
use crate::model::{string_or_none, ContactRecord, RequestMeta};
use crate::store::JsonArrayStore;
use crate::{Error, Result};

/// Only the newest submissions are kept
pub const MAX_CONTACTS: usize = 1000;

pub const CONTACTS_FILE: &str = "contacts.json";

/// Contact form as submitted by the browser
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ContactForm {
    #[serde(default, deserialize_with = "string_or_none")]
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    #[validate(required, length(min = 1))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    #[validate(required, length(min = 1))]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    #[validate(required, length(min = 1))]
    pub message: Option<String>,
}

impl ContactForm {
    /// Checked in this order; the first failing field is reported
    const REQUIRED: [&'static str; 4] = ["name", "email", "subject", "message"];

    fn check(&self) -> Result<()> {
        if let Err(errors) = self.validate() {
            let fields = errors.field_errors();
            if let Some(field) = Self::REQUIRED.iter().find(|f| fields.contains_key(**f)) {
                return Err(Error::validation(format!("Field {} is required", field)));
            }
        }

        let email = self.email.as_deref().unwrap_or_default();
        if !email.contains('@') || !email.contains('.') {
            return Err(Error::validation("Invalid email"));
        }
        Ok(())
    }
}

pub struct ContactService {
    store: JsonArrayStore<ContactRecord>,
    mailer: Arc<dyn Mailer>,
}

impl ContactService {
    pub fn new(data_dir: &Path, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store: JsonArrayStore::new(data_dir.join(CONTACTS_FILE)),
            mailer,
        }
    }

    /// Validate and store a submission, then notify the administrator.
    /// A failed notification does not fail the submission.
    pub async fn submit(&self, form: ContactForm, meta: RequestMeta) -> Result<ContactRecord> {
        form.check()?;

        let record = ContactRecord {
            id: Uuid::new_v4(),
            name: form.name.unwrap_or_default(),
            email: form.email.unwrap_or_default(),
            subject: form.subject.unwrap_or_default(),
            message: form.message.unwrap_or_default(),
            timestamp: Utc::now(),
            ip: meta.ip,
            user_agent: meta.user_agent,
        };

        self.store.append(record.clone(), Some(MAX_CONTACTS)).await?;
        info!(contact_id = %record.id, "Contact submission stored");

        match self
            .mailer
            .send(EmailTemplate::ContactNotification(record.clone()))
            .await
        {
            Ok(Delivery::Sent) => info!(contact_id = %record.id, "Contact notification sent"),
            Ok(Delivery::Skipped) => {}
            Err(e) => warn!(contact_id = %record.id, error = %e, "Failed to send contact notification"),
        }

        Ok(record)
    }

    /// All stored submissions, newest first
    pub async fn list(&self) -> Result<Vec<ContactRecord>> {
        let mut contacts = self.store.load_all().await?;
        contacts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::RecordingMailer;
    use serde_json::json;

    fn form(json: serde_json::Value) -> ContactForm {
        serde_json::from_value(json).unwrap()
    }

    fn valid() -> serde_json::Value {
        json!({
            "name": "Ana",
            "email": "ana@example.com",
            "subject": "Hello",
            "message": "Nice blog"
        })
    }

    fn service(dir: &Path, mailer: Arc<RecordingMailer>) -> ContactService {
        ContactService::new(dir, mailer)
    }

    #[test]
    fn test_required_fields_in_order() {
        let err = form(json!({})).check().unwrap_err();
        assert_eq!(err.to_string(), "Field name is required");

        let err = form(json!({"name": "Ana", "subject": "x"})).check().unwrap_err();
        assert_eq!(err.to_string(), "Field email is required");

        let err = form(json!({"name": "Ana", "email": "a@b.c", "subject": ""}))
            .check()
            .unwrap_err();
        assert_eq!(err.to_string(), "Field subject is required");

        let err = form(json!({"name": "Ana", "email": "a@b.c", "subject": "x", "message": 5}))
            .check()
            .unwrap_err();
        assert_eq!(err.to_string(), "Field message is required");
    }

    #[test]
    fn test_email_needs_at_and_dot() {
        let mut body = valid();
        body["email"] = json!("ana-at-example");
        assert_eq!(form(body).check().unwrap_err().to_string(), "Invalid email");

        let mut body = valid();
        body["email"] = json!("ana@localhost");
        assert_eq!(form(body).check().unwrap_err().to_string(), "Invalid email");

        assert!(form(valid()).check().is_ok());
    }

    #[tokio::test]
    async fn test_submit_stores_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let contacts = service(dir.path(), mailer.clone());

        let meta = RequestMeta {
            ip: Some("10.1.2.3".to_string()),
            user_agent: "test-agent".to_string(),
        };
        let record = contacts.submit(form(valid()), meta).await.unwrap();
        assert_eq!(record.ip.as_deref(), Some("10.1.2.3"));

        let stored = contacts.list().await.unwrap();
        assert_eq!(stored, vec![record.clone()]);
        assert_eq!(mailer.sent(), vec![EmailTemplate::ContactNotification(record)]);
    }

    #[tokio::test]
    async fn test_invalid_submission_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let contacts = service(dir.path(), mailer.clone());

        let result = contacts
            .submit(form(json!({"name": "Ana"})), RequestMeta::default())
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(contacts.list().await.unwrap().is_empty());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_fail_submission() {
        let dir = tempfile::tempdir().unwrap();
        let contacts = service(dir.path(), Arc::new(RecordingMailer::failing()));

        assert!(contacts.submit(form(valid()), RequestMeta::default()).await.is_ok());
        assert_eq!(contacts.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_older_record_file_stays_usable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONTACTS_FILE),
            serde_json::to_string_pretty(&json!([{
                "name": "Old",
                "email": "old@example.com",
                "subject": "Legacy",
                "message": "Written before ids",
                "timestamp": "2025-03-01T12:00:00.123456",
                "ip": "1.2.3.4",
                "user_agent": "Mozilla/5.0"
            }]))
            .unwrap(),
        )
        .unwrap();
        let contacts = service(dir.path(), Arc::new(RecordingMailer::new()));

        let stored = contacts.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].subject, "Legacy");

        contacts.submit(form(valid()), RequestMeta::default()).await.unwrap();
        let subjects: Vec<String> = contacts
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.subject)
            .collect();
        assert_eq!(subjects, vec!["Hello", "Legacy"]);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let contacts = service(dir.path(), Arc::new(RecordingMailer::new()));

        let mut first = valid();
        first["subject"] = json!("first");
        let mut second = valid();
        second["subject"] = json!("second");

        contacts.submit(form(first), RequestMeta::default()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        contacts.submit(form(second), RequestMeta::default()).await.unwrap();

        let subjects: Vec<String> = contacts
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.subject)
            .collect();
        assert_eq!(subjects, vec!["second", "first"]);
    }
}
