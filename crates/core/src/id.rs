// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID newtypes for the domain

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier for an extracted knowledge candidate (content-derived).
    pub struct CandidateId;
}

define_id! {
    /// Identifier for a worker session whose transcript is forged.
    pub struct SessionId;
}

define_id! {
    /// Identifier for a running agent farm.
    pub struct FarmId;
}

define_id! {
    /// Identifier for a mailbox message.
    pub struct MessageId;
}

define_id! {
    /// Identifier for a validation plan (findings grouping).
    pub struct PlanId;
}

impl SessionId {
    /// Normalize a raw session identifier to the canonical
    /// `session-YYYYMMDD-HHMMSS` form used by citation and feedback logs.
    ///
    /// UUID-shaped ids (from worker transcripts) are replaced with a fresh
    /// canonical id; already-canonical and user-provided ids pass through.
    pub fn canonical(raw: &str, now: chrono::DateTime<chrono::Utc>) -> Self {
        let fresh = || Self::new(format!("session-{}", now.format("%Y%m%d-%H%M%S")));
        if raw.is_empty() {
            return fresh();
        }
        if canonical_session_re().is_match(raw) {
            return Self::new(raw);
        }
        if uuid_re().is_match(raw) {
            return fresh();
        }
        Self::new(raw)
    }
}

#[allow(clippy::expect_used)]
fn canonical_session_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^session-\d{8}-\d{6}$").expect("static pattern"))
}

#[allow(clippy::expect_used)]
fn uuid_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$")
            .expect("static pattern")
    })
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
