// ── Validated name newtypes ──
//
// Domains, hub paths and entry assemblies end up inside generated proxy
// config, unit files and command lines, so each one is parsed once at the
// boundary and carried as a type that cannot hold a bad value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;
const ASSEMBLY_EXTENSION: &str = ".dll";

// ── Domain ──────────────────────────────────────────────────────────

/// A hostname: ASCII letters, digits, `.` and `-`, in well-formed labels.
///
/// Stored lowercased so `Example.COM` and `example.com` are the same site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let reject = |reason: &str| CoreError::invalid("domain", format!("{reason}: '{raw}'"));

        if raw.is_empty() {
            return Err(CoreError::invalid("domain", "must not be empty"));
        }
        if raw.len() > MAX_DOMAIN_LEN {
            return Err(reject("longer than 253 characters"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(reject("only letters, digits, '.' and '-' are allowed"));
        }
        for label in raw.split('.') {
            if label.is_empty() {
                return Err(reject("empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(reject("label longer than 63 characters"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(reject("label may not start or end with '-'"));
            }
        }

        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the service unit backing this domain.
    pub fn unit_name(&self) -> String {
        format!("dotnet-{}", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

// ── Hub path ────────────────────────────────────────────────────────

/// URL path of a real-time messaging hub, always rooted at `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HubPath(String);

impl HubPath {
    /// Normalize `raw` to start with `/` and validate it.
    ///
    /// Accepts letters, digits and `_./-`. Rejects the bare root and any
    /// `.` or `..` segment, so a hub can never address a parent path.
    pub fn normalize(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid("hub path", "must not be empty"));
        }

        let path = if trimmed.starts_with('/') {
            trimmed.to_owned()
        } else {
            format!("/{trimmed}")
        };
        let reject = |reason: &str| CoreError::invalid("hub path", format!("{path}: {reason}"));

        if !path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-'))
        {
            return Err(reject("only letters, digits and '_./-' are allowed"));
        }
        if path == "/" {
            return Err(reject("the site root cannot be a hub"));
        }
        if path.contains("//") {
            return Err(reject("empty path segment"));
        }
        if path.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(reject("relative segments are not allowed"));
        }

        Ok(Self(path))
    }

    /// Normalize a whole list, failing on the first invalid entry.
    ///
    /// Blank entries are skipped and duplicates collapse, keeping the first
    /// occurrence so the caller's ordering is preserved.
    pub fn normalize_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, CoreError> {
        let mut hubs: Vec<Self> = Vec::with_capacity(raw.len());
        for entry in raw {
            let entry = entry.as_ref();
            if entry.trim().is_empty() {
                continue;
            }
            let hub = Self::normalize(entry)?;
            if !hubs.contains(&hub) {
                hubs.push(hub);
            }
        }
        Ok(hubs)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HubPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HubPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HubPath {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<HubPath> for String {
    fn from(hub: HubPath) -> Self {
        hub.0
    }
}

// ── Entry assembly ──────────────────────────────────────────────────

/// File name of the managed entry-point binary, e.g. `App.dll`.
///
/// A bare file name: it is resolved against the live release directory,
/// so separators are never accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryAssembly(String);

impl EntryAssembly {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let reject = |reason: &str| CoreError::invalid("entry assembly", reason.to_owned());

        if raw.is_empty() {
            return Err(reject(
                "provide the main entry DLL of the application (e.g. App.dll)",
            ));
        }
        let Some(stem) = raw.strip_suffix(ASSEMBLY_EXTENSION) else {
            return Err(reject(&format!("'{raw}' must end in {ASSEMBLY_EXTENSION}")));
        };
        if stem.is_empty() {
            return Err(reject("file name is missing before the extension"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
        {
            return Err(reject(&format!(
                "'{raw}' must be a bare file name (letters, digits, '._-+')"
            )));
        }

        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntryAssembly {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntryAssembly> for String {
    fn from(assembly: EntryAssembly) -> Self {
        assembly.0
    }
}
