use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("ACCESS_CODES is not configured")]
    NotConfigured,
}

/// Normalize a code for comparison: trimmed and upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Allow-list of normalized access codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCodeSet {
    codes: HashSet<String>,
}

impl AccessCodeSet {
    /// Parse the comma-separated configuration value.
    ///
    /// Blank entries are dropped; a value without any code is treated the
    /// same as a missing one.
    pub fn parse(raw: Option<&str>) -> Result<Self, GateError> {
        let codes: HashSet<String> = raw
            .unwrap_or_default()
            .split(',')
            .map(normalize_code)
            .filter(|code| !code.is_empty())
            .collect();

        if codes.is_empty() {
            return Err(GateError::NotConfigured);
        }

        Ok(Self { codes })
    }

    pub fn contains(&self, submitted: &str) -> bool {
        self.codes.contains(&normalize_code(submitted))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Shared-secret gate used by both the chat and the code-check endpoints.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    configured: Option<String>,
}

impl AccessGate {
    pub fn new(configured: Option<String>) -> Self {
        Self { configured }
    }

    /// Derive the allow-list for the current request.
    pub fn codes(&self) -> Result<AccessCodeSet, GateError> {
        AccessCodeSet::parse(self.configured.as_deref())
    }

    /// Check a submitted code. Missing or blank codes are never authorized.
    pub fn is_authorized(&self, submitted: Option<&str>) -> Result<bool, GateError> {
        let codes = self.codes()?;
        Ok(match submitted {
            Some(code) if !code.trim().is_empty() => codes.contains(code),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AccessGate {
        AccessGate::new(Some("ABC-123, xyz-789".to_string()))
    }

    #[test]
    fn test_parse_normalizes_entries() {
        let codes = AccessCodeSet::parse(Some(" abc-123 ,XYZ-789,, ")).unwrap();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("ABC-123"));
        assert!(codes.contains("xyz-789"));
    }

    #[test]
    fn test_missing_configuration_is_distinct_error() {
        assert_eq!(AccessCodeSet::parse(None), Err(GateError::NotConfigured));
        assert_eq!(AccessCodeSet::parse(Some("")), Err(GateError::NotConfigured));
        assert_eq!(AccessCodeSet::parse(Some(" , ,")), Err(GateError::NotConfigured));
        assert_eq!(AccessGate::default().is_authorized(Some("ABC-123")), Err(GateError::NotConfigured));
    }

    #[test]
    fn test_configured_codes_accept_any_casing_and_whitespace() {
        let gate = gate();
        for variant in ["ABC-123", "abc-123", "  Abc-123\t", "\nxyz-789 ", "XYZ-789"] {
            assert_eq!(gate.is_authorized(Some(variant)), Ok(true), "variant {variant:?}");
        }
    }

    #[test]
    fn test_unknown_codes_rejected_regardless_of_casing() {
        let gate = gate();
        for variant in ["ZZZ-000", "zzz-000", " abc-12 ", "ABC-1234", "ABC 123"] {
            assert_eq!(gate.is_authorized(Some(variant)), Ok(false), "variant {variant:?}");
        }
    }

    #[test]
    fn test_missing_or_blank_submission_is_unauthorized() {
        let gate = gate();
        assert_eq!(gate.is_authorized(None), Ok(false));
        assert_eq!(gate.is_authorized(Some("")), Ok(false));
        assert_eq!(gate.is_authorized(Some("   ")), Ok(false));
    }
}
