use regex::Regex;
use serde::Deserialize;

use crate::errors::AppError;

/// One entry of the contact directory file.
///
/// Numbers are stored however the directory author typed them (separators,
/// country prefixes); matching is digit-based.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(alias = "phone")]
    pub number: String,
    pub email: String,
}

/// Recipient resolved for a call notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecipient {
    pub email: String,
    /// Contact name when the caller matched a directory entry.
    pub contact_name: Option<String>,
}

/// Read the directory fresh from disk.
///
/// An unreadable or unparsable file degrades to an empty directory so the
/// notification still goes out to the default recipient; a completed-call
/// notification is never dropped over a broken directory file.
pub async fn load_directory(path: &str) -> Vec<Contact> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                "Contact directory '{}' unreadable ({}); continuing with empty directory",
                path,
                e
            );
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Contact>>(&raw) {
        Ok(contacts) => {
            tracing::debug!("Loaded {} contact(s) from '{}'", contacts.len(), path);
            contacts
        }
        Err(e) => {
            tracing::warn!(
                "Contact directory '{}' unparsable ({}); continuing with empty directory",
                path,
                e
            );
            Vec::new()
        }
    }
}

/// Strip everything but ASCII digits.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Punctuation-insensitive phone comparison.
///
/// Exact digit equality, or equality of the trailing 10 digits when both
/// sides carry at least a full national number - so a directory entry of
/// "+1 (555) 123-4567" matches a caller id of "5551234567".
pub fn numbers_match(a: &str, b: &str) -> bool {
    let a = digits(a);
    let b = digits(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if a.len() >= 10 && b.len() >= 10 {
        return a[a.len() - 10..] == b[b.len() - 10..];
    }
    false
}

/// Minimal sanity check on an outbound address.
pub fn is_valid_address(addr: &str) -> bool {
    // One '@', no whitespace, non-empty local part and domain.
    let re = Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap();
    re.is_match(addr)
}

/// Resolve the notification recipient for a caller number.
///
/// First directory match wins; no match (or no caller id at all) falls back
/// to the configured default recipient.
pub fn resolve_recipient(
    caller: Option<&str>,
    directory: &[Contact],
    default_recipient: &str,
) -> Result<ResolvedRecipient, AppError> {
    if let Some(caller) = caller.filter(|c| !digits(c).is_empty()) {
        for contact in directory {
            if numbers_match(&contact.number, caller) {
                tracing::info!(
                    "Caller {} matched contact '{}' -> {}",
                    caller,
                    contact.name,
                    contact.email
                );
                if !is_valid_address(&contact.email) {
                    return Err(AppError::InvalidRecipient(format!(
                        "Contact '{}' has an invalid email address",
                        contact.name
                    )));
                }
                return Ok(ResolvedRecipient {
                    email: contact.email.clone(),
                    contact_name: Some(contact.name.clone()),
                });
            }
        }
        tracing::info!("Caller {} not found in directory; using default recipient", caller);
    } else {
        tracing::info!("No caller number on record; using default recipient");
    }

    if default_recipient.trim().is_empty() {
        return Err(AppError::NoRecipient(
            "No contact match and no default recipient configured".to_string(),
        ));
    }
    if !is_valid_address(default_recipient) {
        return Err(AppError::InvalidRecipient(
            "Default recipient is not a valid email address".to_string(),
        ));
    }

    Ok(ResolvedRecipient {
        email: default_recipient.to_string(),
        contact_name: None,
    })
}
