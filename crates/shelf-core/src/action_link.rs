//! Signed action links.
//!
//! The digest pipeline embeds "star" and "note" links in the emails it
//! sends. Each link carries the content metadata plus a short HMAC-SHA256
//! signature over `"{content_id}:{date}"`, so a link can be turned into a
//! star without trusting the query string.
//!
//! ```text
//! https://user.github.io/ai-digest/star?id=github-torvalds-linux&title=linux
//!     &url=https%3A%2F%2Fgithub.com%2Ftorvalds%2Flinux&type=repo&date=2024-02-10&t=1a2b3c4d5e6f7a8b
//! ```

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::defaults::SIGNATURE_LEN;
use crate::error::{Error, Result};
use crate::models::{ContentType, NoteDraft, StarItem};

type HmacSha256 = Hmac<Sha256>;

fn mac_for(content_id: &str, date: &str, secret: &str) -> Result<HmacSha256> {
    if secret.is_empty() {
        return Err(Error::Config(
            "secret key required to sign action links (SHELF_SECRET_KEY)".to_string(),
        ));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Config(format!("invalid secret key: {}", e)))?;
    mac.update(format!("{}:{}", content_id, date).as_bytes());
    Ok(mac)
}

/// Signature for a content item: first 16 hex chars of the HMAC digest.
pub fn generate_signature(content_id: &str, date: &str, secret: &str) -> Result<String> {
    let digest = hex::encode(mac_for(content_id, date, secret)?.finalize().into_bytes());
    Ok(digest[..SIGNATURE_LEN].to_string())
}

/// Constant-time check of a signature. Any failure (missing secret,
/// malformed signature) is reported as `false`.
pub fn verify_signature(content_id: &str, date: &str, signature: &str, secret: &str) -> bool {
    if signature.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(tag) = hex::decode(signature) else {
        return false;
    };
    match mac_for(content_id, date, secret) {
        Ok(mac) => mac.verify_truncated_left(&tag).is_ok(),
        Err(_) => false,
    }
}

/// What a link asks the receiver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Star,
    Note,
}

impl LinkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkAction::Star => "star",
            LinkAction::Note => "note",
        }
    }
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "star" => Ok(LinkAction::Star),
            "note" => Ok(LinkAction::Note),
            other => Err(Error::InvalidInput(format!("unknown link action '{}'", other))),
        }
    }
}

/// A parsed or freshly signed action link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLink {
    pub action: LinkAction,
    pub content_id: String,
    pub title: String,
    pub url: String,
    pub content_type: ContentType,
    pub date: String,
    pub signature: String,
}

impl ActionLink {
    /// Build and sign a link.
    pub fn signed(
        action: LinkAction,
        content_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        content_type: ContentType,
        date: impl Into<String>,
        secret: &str,
    ) -> Result<Self> {
        let content_id = content_id.into();
        let date = date.into();
        let signature = generate_signature(&content_id, &date, secret)?;
        Ok(Self {
            action,
            content_id,
            title: title.into(),
            url: url.into(),
            content_type,
            date,
            signature,
        })
    }

    /// Render as `{base_url}/{action}?id=..&title=..&url=..&type=..&date=..&t=..`.
    pub fn to_url(&self, base_url: &str) -> String {
        let params = [
            ("id", self.content_id.as_str()),
            ("title", self.title.as_str()),
            ("url", self.url.as_str()),
            ("type", self.content_type.as_str()),
            ("date", self.date.as_str()),
            ("t", self.signature.as_str()),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}/{}?{}",
            base_url.trim_end_matches('/'),
            self.action,
            query
        )
    }

    /// Parse a link produced by [`ActionLink::to_url`] or the digest pipeline.
    ///
    /// The signature is not checked here; call [`ActionLink::verify`].
    pub fn parse(link: &str) -> Result<Self> {
        let (path, query) = link
            .split_once('?')
            .ok_or_else(|| Error::InvalidInput("action link has no query string".to_string()))?;
        let action: LinkAction = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .parse()?;

        let mut params = HashMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value).map_err(|e| {
                Error::InvalidInput(format!("invalid encoding for '{}': {}", key, e))
            })?;
            params.insert(key.to_string(), value.into_owned());
        }

        let mut take = |key: &str| params.remove(key).unwrap_or_default();
        let content_id = take("id");
        let signature = take("t");
        let date = take("date");
        let content_type: ContentType = take("type").parse()?;
        if content_id.is_empty() {
            return Err(Error::InvalidInput("action link is missing 'id'".to_string()));
        }
        if signature.is_empty() {
            return Err(Error::InvalidInput("action link is missing 't'".to_string()));
        }

        Ok(Self {
            action,
            title: take("title"),
            url: take("url"),
            content_id,
            content_type,
            date,
            signature,
        })
    }

    pub fn verify(&self, secret: &str) -> bool {
        verify_signature(&self.content_id, &self.date, &self.signature, secret)
    }

    /// Star described by this link, saved at `now`.
    pub fn to_star(&self, now: DateTime<Utc>) -> StarItem {
        StarItem::new(
            self.content_id.clone(),
            self.title.clone(),
            self.url.clone(),
            self.content_type,
            self.date.clone(),
            now,
        )
    }

    /// Empty note draft for the content of this link.
    pub fn to_note_draft(&self) -> NoteDraft {
        NoteDraft {
            content_id: self.content_id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            content_type: Some(self.content_type),
            date: self.date.clone(),
            ..Default::default()
        }
    }
}
