//! Normalized message types

use serde::Serialize;

/// Email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub address: String,
}

impl EmailAddress {
    pub fn new(name: Option<String>, address: String) -> Self {
        Self { name, address }
    }

    /// Format as "Name <address>" or just "address"
    pub fn to_display_string(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() && !self.address.is_empty() => {
                format!("{} <{}>", name, self.address)
            }
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.address.clone(),
        }
    }
}

/// One fetched message, reduced to what callers read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Subject line
    pub subject: Option<String>,
    /// From header, formatted as "Name <address>" list
    pub from: Option<String>,
    /// Date header as sent
    pub date: Option<String>,
    /// Plain-text body
    pub body: String,
    /// HTML markup, only when the body was taken from an HTML part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Message carries attachments
    pub has_attachments: bool,
}
