//! Emergency contacts as read from the contact repository.

use serde::{Deserialize, Serialize};

/// Identifier of a contact, assigned by the owning repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Wrap a repository identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An emergency contact.
///
/// Addresses are optional; a blank or absent address excludes the contact
/// from the corresponding channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Repository identifier
    pub id: ContactId,
    /// Display name
    pub name: String,
    /// Phone number for SMS
    #[serde(default)]
    pub phone: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Push notification token
    #[serde(default)]
    pub push_token: Option<String>,
}

impl Contact {
    /// Create a contact with only a phone number
    pub fn new(id: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: ContactId::new(id),
            name: name.into(),
            phone: phone.into(),
            email: None,
            push_token: None,
        }
    }

    /// Set email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set push token
    pub fn with_push_token(mut self, token: impl Into<String>) -> Self {
        self.push_token = Some(token.into());
        self
    }

    /// Phone number, if non-blank
    pub fn sms_address(&self) -> Option<&str> {
        non_blank(Some(self.phone.as_str()))
    }

    /// Email address, if non-blank
    pub fn email_address(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    /// Push token, if non-blank
    pub fn push_address(&self) -> Option<&str> {
        non_blank(self.push_token.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_addresses_are_absent() {
        let c = Contact::new("c1", "Ana", "   ").with_email("").with_push_token(" tok ");
        assert!(c.sms_address().is_none());
        assert!(c.email_address().is_none());
        assert_eq!(c.push_address(), Some("tok"));
    }

    #[test]
    fn test_contact_json_shape() {
        let c: Contact = serde_json::from_str(
            r#"{"id":"c9","name":"Bo","phone":"+15550100","pushToken":"abc"}"#,
        )
        .unwrap();
        assert_eq!(c.id.as_str(), "c9");
        assert_eq!(c.push_address(), Some("abc"));
        assert!(c.email.is_none());
    }
}
