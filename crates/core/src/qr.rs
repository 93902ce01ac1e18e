//! QR payloads and registration deep links.
//!
//! A business prints one QR code per profile. Scanning it yields either the
//! JSON payload produced by [`QrPayload::encode`] or, for codes printed from a
//! plain link, a registration URL of the form
//! `{base}/register?businessId=..&profileId=..[&ref=CODE]`. Both resolve to a
//! [`RegistrationLink`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::customer_code::normalize_customer_code;
use loyalty_shared::types::{BusinessId, ProfileId};

/// Highest payload version this build understands.
pub const QR_PAYLOAD_VERSION: u32 = 1;

const BUSINESS_PARAM: &str = "businessId";
const PROFILE_PARAM: &str = "profileId";
const REFERRAL_PARAM: &str = "ref";

/// Errors raised while decoding a scanned code or deep link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QrError {
    /// The payload is JSON but not a registration payload.
    #[error("Invalid QR payload: {0}")]
    InvalidPayload(String),

    /// The payload version is newer (or older) than supported.
    #[error("Unsupported QR payload version {0}")]
    UnsupportedVersion(u32),

    /// A required query parameter is missing.
    #[error("Registration link is missing '{0}'")]
    MissingParameter(&'static str),

    /// A parameter is not a valid UUID.
    #[error("Registration link has an invalid '{0}'")]
    InvalidId(&'static str),

    /// The referral code is not a customer code.
    #[error("Invalid referral code: {0}")]
    InvalidReferralCode(String),

    /// The input is neither JSON nor a registration link.
    #[error("Unrecognized QR content")]
    Unrecognized,
}

/// Discriminator stored in the payload's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrKind {
    /// Enroll the scanning customer at a business with a given profile.
    CustomerRegistration,
}

fn default_version() -> u32 {
    QR_PAYLOAD_VERSION
}

/// JSON content of a registration QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    /// Payload schema version; absent in version 1 payloads.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Payload kind.
    #[serde(rename = "type")]
    pub kind: QrKind,
    /// Business the customer enrolls at.
    pub business_id: BusinessId,
    /// Profile the customer is assigned.
    pub profile_id: ProfileId,
    /// Display name of the business.
    pub business_name: String,
    /// Display name of the profile.
    pub profile_name: String,
    /// Equivalent registration deep link.
    pub url: String,
}

impl QrPayload {
    /// Builds the payload for a business profile.
    #[must_use]
    pub fn new(
        business_id: BusinessId,
        profile_id: ProfileId,
        business_name: impl Into<String>,
        profile_name: impl Into<String>,
        base_url: &str,
    ) -> Self {
        let link = RegistrationLink {
            business_id,
            profile_id,
            referral_code: None,
        };
        Self {
            version: QR_PAYLOAD_VERSION,
            kind: QrKind::CustomerRegistration,
            business_id,
            profile_id,
            business_name: business_name.into(),
            profile_name: profile_name.into(),
            url: link.to_url(base_url),
        }
    }

    /// Serializes the payload to the JSON string that is rendered as a QR code.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes scanned content into a registration target.
    ///
    /// JSON payloads are preferred. A JSON object that is not a valid payload
    /// but carries a `url` falls back to that link; anything else is tried as
    /// a registration link.
    ///
    /// # Errors
    ///
    /// Returns a `QrError` describing why the content was rejected.
    pub fn parse(raw: &str) -> Result<RegistrationLink, QrError> {
        let raw = raw.trim();
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => {
                match serde_json::from_value::<Self>(value.clone()) {
                    Ok(payload) => payload.into_link(),
                    Err(err) => match value.get("url").and_then(Value::as_str) {
                        Some(url) => RegistrationLink::parse(url),
                        None => Err(QrError::InvalidPayload(err.to_string())),
                    },
                }
            }
            Ok(_) => Err(QrError::Unrecognized),
            Err(_) => RegistrationLink::parse(raw),
        }
    }

    fn into_link(self) -> Result<RegistrationLink, QrError> {
        if self.version == 0 || self.version > QR_PAYLOAD_VERSION {
            return Err(QrError::UnsupportedVersion(self.version));
        }
        Ok(RegistrationLink {
            business_id: self.business_id,
            profile_id: self.profile_id,
            referral_code: None,
        })
    }
}

/// Where a new customer should be enrolled, plus an optional referrer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationLink {
    /// Business to enroll at.
    pub business_id: BusinessId,
    /// Profile to assign.
    pub profile_id: ProfileId,
    /// Referrer's customer code.
    pub referral_code: Option<String>,
}

impl RegistrationLink {
    /// Renders the deep link under `base_url`.
    #[must_use]
    pub fn to_url(&self, base_url: &str) -> String {
        let mut url = format!(
            "{}/register?{BUSINESS_PARAM}={}&{PROFILE_PARAM}={}",
            base_url.trim_end_matches('/'),
            self.business_id,
            self.profile_id
        );
        if let Some(code) = &self.referral_code {
            url.push_str(&format!("&{REFERRAL_PARAM}={}", urlencoding::encode(code)));
        }
        url
    }

    /// Parses a registration deep link.
    ///
    /// # Errors
    ///
    /// Returns a `QrError` for missing or malformed parameters.
    pub fn parse(url: &str) -> Result<Self, QrError> {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let Some((_, query)) = without_fragment.split_once('?') else {
            return Err(QrError::Unrecognized);
        };

        let mut business = None;
        let mut profile = None;
        let mut referral = None;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let Ok(value) = urlencoding::decode(value) else {
                continue;
            };
            match key {
                BUSINESS_PARAM => business = Some(value.into_owned()),
                PROFILE_PARAM => profile = Some(value.into_owned()),
                REFERRAL_PARAM | "referralCode" => referral = Some(value.into_owned()),
                _ => {}
            }
        }

        let business_id = business
            .ok_or(QrError::MissingParameter(BUSINESS_PARAM))?
            .parse::<BusinessId>()
            .map_err(|_| QrError::InvalidId(BUSINESS_PARAM))?;
        let profile_id = profile
            .ok_or(QrError::MissingParameter(PROFILE_PARAM))?
            .parse::<ProfileId>()
            .map_err(|_| QrError::InvalidId(PROFILE_PARAM))?;
        let referral_code = match referral.filter(|r| !r.trim().is_empty()) {
            Some(raw) => {
                Some(normalize_customer_code(&raw).ok_or(QrError::InvalidReferralCode(raw))?)
            }
            None => None,
        };

        Ok(Self {
            business_id,
            profile_id,
            referral_code,
        })
    }
}
