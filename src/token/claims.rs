//! Token claims and their canonical serialization.
//!
//! Claims are encoded as five netstrings (`<len>:<bytes>,`) in a fixed order:
//! purpose, subject, resource, issued-at, expires-at. Length prefixes make the
//! encoding unambiguous whatever bytes a field holds, so no escaping is needed
//! and the signature can be split off by position.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

use crate::model::{FileId, UserId};

/// Use case a token is scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    EmailVerify,
    FileDownload,
}

impl Purpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerify => "email-verify",
            Self::FileDownload => "file-download",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "email-verify" => Some(Self::EmailVerify),
            "file-download" => Some(Self::FileDownload),
            _ => None,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields bound into a token and recovered from it after verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claims {
    pub purpose: Purpose,
    pub subject: UserId,
    pub resource: Option<FileId>,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Claims {
    pub(crate) fn canonical(&self) -> String {
        let mut out = String::with_capacity(96);
        push_field(&mut out, self.purpose.as_str());
        push_field(&mut out, &self.subject.to_string());
        push_field(&mut out, self.resource.as_ref().map_or("", FileId::as_str));
        push_field(&mut out, &self.issued_at.to_string());
        push_field(&mut out, &self.expires_at.to_string());
        out
    }

    /// Parse a canonical claims string. Returns `None` on any structural problem.
    pub(crate) fn from_canonical(input: &str) -> Option<Self> {
        let mut reader = Fields { rest: input };
        let purpose = Purpose::parse(reader.next()?)?;
        let subject = UserId(reader.next()?.parse().ok()?);
        let resource = match reader.next()? {
            "" => None,
            raw => Some(FileId::parse(raw)?),
        };
        let issued_at = reader.next()?.parse().ok()?;
        let expires_at = reader.next()?.parse().ok()?;
        if !reader.rest.is_empty() {
            return None;
        }
        Some(Self {
            purpose,
            subject,
            resource,
            issued_at,
            expires_at,
        })
    }
}

fn push_field(out: &mut String, value: &str) {
    let _ = write!(out, "{}:{},", value.len(), value);
}

struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    // Netstring lengths are short; four digits is far beyond any valid field.
    const MAX_LEN_DIGITS: usize = 4;

    fn next(&mut self) -> Option<&'a str> {
        let colon = self.rest.find(':')?;
        let digits = &self.rest[..colon];
        if digits.is_empty()
            || digits.len() > Self::MAX_LEN_DIGITS
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let len: usize = digits.parse().ok()?;
        let start = colon + 1;
        let end = start.checked_add(len)?;
        let value = self.rest.get(start..end)?;
        let tail = self.rest.get(end..)?;
        self.rest = tail.strip_prefix(',')?;
        Some(value)
    }
}
