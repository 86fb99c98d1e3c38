//! Exit codes for the `skinrelay` binary.
//! Scripts branch on these, so they are part of the public contract.

use skinrelay_cache::SkinError;
use skinrelay_core::ResolveError;
use skinrelay_platform::PlatformError;

pub const SUCCESS: i32 = 0;
pub const INTERNAL_ERROR: i32 = 1; // Apply or scheduler failure
pub const CONFIG_ERROR: i32 = 2; // Bad config, unsupported platform, usage
pub const NOT_FOUND: i32 = 3; // No skin for the subject
pub const UPSTREAM_UNAVAILABLE: i32 = 4; // Rate limited, down, or garbled responses
pub const REJECTED: i32 = 5; // Refused image, bad signature, invalid request
pub const STORAGE_ERROR: i32 = 6;

/// Exit code for an error kind label.
pub fn for_kind(kind: &str) -> i32 {
    match kind {
        "not_found" => NOT_FOUND,
        "rate_limited" | "upstream_unavailable" | "invalid_response" => UPSTREAM_UNAVAILABLE,
        "rejected" | "invalid_signature" | "invalid_intent" => REJECTED,
        "storage" => STORAGE_ERROR,
        "config" | "unsupported_platform" => CONFIG_ERROR,
        _ => INTERNAL_ERROR,
    }
}

/// Kind label and coarse message for errors raised by the skinrelay crates.
///
/// Anything else is unexpected and reported in full by the caller.
pub fn classify(err: &anyhow::Error) -> Option<(&'static str, &'static str)> {
    if let Some(e) = err.downcast_ref::<ResolveError>() {
        return Some((e.kind(), e.user_message()));
    }
    if let Some(e) = err.downcast_ref::<SkinError>() {
        return Some((e.kind(), e.user_message()));
    }
    err.downcast_ref::<PlatformError>()
        .map(|e| (e.kind(), e.user_message()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_codes() {
        assert_eq!(for_kind("not_found"), 3);
        assert_eq!(for_kind("rate_limited"), 4);
        assert_eq!(for_kind("invalid_signature"), 5);
        assert_eq!(for_kind("invalid_intent"), 5);
        assert_eq!(for_kind("storage"), 6);
        assert_eq!(for_kind("unsupported_platform"), 2);
        assert_eq!(for_kind("scheduler_closed"), 1);
    }

    #[test]
    fn classify_sees_through_context() {
        let err = anyhow::Error::new(ResolveError::from(SkinError::NotFound {
            subject: "Notch".to_string(),
        }))
        .context("resolving Notch");
        assert_eq!(
            classify(&err),
            Some(("not_found", "No skin exists for that player."))
        );

        let err = anyhow::Error::new(SkinError::Storage {
            message: "disk full".to_string(),
        });
        assert_eq!(classify(&err).map(|(kind, _)| kind), Some("storage"));

        assert_eq!(classify(&anyhow::anyhow!("boom")), None);
    }
}
