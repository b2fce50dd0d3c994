//! Contact details pulled from CV text

use regex::Regex;
use serde::{Deserialize, Serialize};

const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "proton.me",
    "protonmail.com",
];

/// Longest first line still taken to be a name
const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailCheck {
    pub valid: bool,
    pub professional: bool,
    pub domain: Option<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneCheck {
    pub valid: bool,
    pub digits: usize,
    pub note: String,
}

pub struct ContactExtractor {
    email: Regex,
    phone: Regex,
    linkedin: Regex,
}

impl Default for ContactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactExtractor {
    pub fn new() -> Self {
        Self {
            email: Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("Invalid email regex"),
            phone: Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{2,4}\)[\s.-]?|\d{2,4}[\s.-])?\d{3,4}[\s.-]?\d{3,4}")
                .expect("Invalid phone regex"),
            linkedin: Regex::new(r"(?i)(?:https?://)?(?:[a-z]{2,3}\.)?linkedin\.com/in/[a-z0-9_%-]+/?")
                .expect("Invalid LinkedIn regex"),
        }
    }

    pub fn extract(&self, text: &str) -> ContactInfo {
        ContactInfo {
            name: extract_name(text),
            email: self.email.find(text).map(|m| m.as_str().to_string()),
            phone: self
                .phone
                .find_iter(text)
                .map(|m| m.as_str().trim().to_string())
                .find(|candidate| self.validate_phone(candidate).valid),
            linkedin_url: self.linkedin.find(text).map(|m| normalize_linkedin(m.as_str())),
        }
    }

    pub fn validate_email(&self, email: &str) -> EmailCheck {
        let email = email.trim();
        if email.is_empty() {
            return EmailCheck {
                valid: false,
                professional: false,
                domain: None,
                note: "No email provided".to_string(),
            };
        }

        let whole = self
            .email
            .find(email)
            .map_or(false, |m| m.start() == 0 && m.end() == email.len());
        if !whole {
            return EmailCheck {
                valid: false,
                professional: false,
                domain: None,
                note: "Invalid email format".to_string(),
            };
        }

        let domain = email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .unwrap_or_default();
        let professional = !FREE_MAIL_DOMAINS.contains(&domain.as_str());

        EmailCheck {
            valid: true,
            professional,
            note: if professional {
                "Professional email domain".to_string()
            } else {
                "Personal email domain".to_string()
            },
            domain: Some(domain),
        }
    }

    /// 10 to 15 digits once formatting is stripped
    pub fn validate_phone(&self, phone: &str) -> PhoneCheck {
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let valid = (10..=15).contains(&digits);

        PhoneCheck {
            valid,
            digits,
            note: match (digits, valid) {
                (0, _) => "No phone number provided".to_string(),
                (_, true) => "Valid phone format".to_string(),
                _ => "Invalid phone format".to_string(),
            },
        }
    }
}

pub fn extract_contact_info(text: &str) -> ContactInfo {
    ContactExtractor::new().extract(text)
}

/// First short line without digits or an `@`
fn extract_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(5)
        .find(|line| {
            line.chars().count() <= MAX_NAME_CHARS
                && !line.contains('@')
                && !line.chars().any(|c| c.is_ascii_digit())
                && !line.contains("://")
                && line.split_whitespace().count() <= 5
        })
        .map(str::to_string)
}

fn normalize_linkedin(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.replacen("http://", "https://", 1)
    } else {
        format!("https://{}", url)
    }
}
