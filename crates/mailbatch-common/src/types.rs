//! Common types used across Mailbatch

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a sender configuration
pub type SenderConfigId = Uuid;

/// Unique identifier for a campaign
pub type CampaignId = Uuid;

/// Unique identifier for a lead
pub type LeadId = Uuid;

/// Timestamp type used across the system
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Local part (before @)
    pub local: String,
    /// Domain part (after @)
    pub domain: String,
}

impl EmailAddress {
    /// Parse an email address from a string
    pub fn parse(s: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = s.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(crate::Error::Validation(format!(
                "Invalid email address: {}",
                s
            )));
        }

        Ok(Self {
            local: parts[0].to_string(),
            domain: parts[1].to_string(),
        })
    }

    /// Get the full email address as a string
    pub fn as_str(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check whether a string looks like a deliverable email address.
///
/// Campaign recipient selection filters on this rather than a full
/// RFC 5321 parse: one @ sign, a non-empty local part, and a domain
/// with at least one dot.
pub fn is_deliverable_address(s: &str) -> bool {
    match EmailAddress::parse(s) {
        Ok(addr) => addr.domain.contains('.'),
        Err(_) => false,
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items in this page
    pub items: Vec<T>,
    /// Total number of items
    pub total: u64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Items per page
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_email_address_parse() {
        let addr = EmailAddress::parse("user@example.com").unwrap();
        assert_eq!(addr.local, "user");
        assert_eq!(addr.domain, "example.com");
        assert_eq!(addr.to_string(), "user@example.com");
    }

    #[test]
    fn test_email_address_invalid() {
        assert!(EmailAddress::parse("not-an-email").is_err());
        assert!(EmailAddress::parse("@example.com").is_err());
        assert!(EmailAddress::parse("user@").is_err());
        assert!(EmailAddress::parse("a@b@c").is_err());
    }

    #[test]
    fn test_deliverable_address() {
        assert!(is_deliverable_address("user@example.com"));
        assert!(is_deliverable_address("first.last@mail.example.co.uk"));
        assert!(!is_deliverable_address("user@localhost"));
        assert!(!is_deliverable_address("plain-string"));
        assert!(!is_deliverable_address(""));
    }
}
