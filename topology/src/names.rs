// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Human-readable device names

use crate::guid::Guid;
use ahash::RandomState;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

#[allow(unused)]
use tracing::{debug, warn};

/// Make a device-reported description printable: stop at the first NUL and
/// replace control characters with blanks.
#[must_use]
pub fn clean_description(description: &str) -> Cow<'_, str> {
    let description = description.split('\0').next().unwrap_or_default();
    if description.chars().any(char::is_control) {
        Cow::Owned(
            description
                .chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(description)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SwitchMapError {
    #[error("can't read switch map {0}: {1}")]
    Io(String, std::io::Error),
    #[error("line {0}: bad GUID '{1}'")]
    BadGuid(usize, String),
    #[error("line {0}: expected a quoted name after the GUID")]
    BadName(usize),
}

/// Friendly names for switches, keyed by node GUID.
///
/// The file format is one switch per line: a GUID followed by a double-quoted
/// name. Blank lines and lines starting with `#` are ignored.
///
/// ```text
/// # spine switches
/// 0x0008f104003f0c3e "spine-1"
/// 0x0008f104003f0c3f "spine-2"
/// ```
#[derive(Debug, Default)]
pub struct SwitchMap {
    names: HashMap<Guid, String, RandomState>,
}

impl SwitchMap {
    /// Parse a switch map from its text.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed line.
    pub fn parse(text: &str) -> Result<Self, SwitchMapError> {
        let mut names = HashMap::with_hasher(RandomState::with_seed(0));
        for (index, line) in text.lines().enumerate() {
            let lineno = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (guid, rest) = line
                .split_once(char::is_whitespace)
                .ok_or(SwitchMapError::BadName(lineno))?;
            let guid: Guid = guid
                .parse()
                .map_err(|_| SwitchMapError::BadGuid(lineno, guid.to_string()))?;
            let name = rest
                .trim()
                .strip_prefix('"')
                .and_then(|s| s.split_once('"'))
                .map(|(name, _)| name)
                .ok_or(SwitchMapError::BadName(lineno))?;
            if names.insert(guid, name.to_string()).is_some() {
                warn!("switch map line {lineno}: {guid} already named, keeping '{name}'");
            }
        }
        debug!("switch map holds {} names", names.len());
        Ok(Self { names })
    }

    /// Read and parse a switch map file.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read or is malformed.
    pub fn from_path(path: &Path) -> Result<Self, SwitchMapError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SwitchMapError::Io(path.display().to_string(), e))?;
        Self::parse(&text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The mapped name of switch `guid`, or its cleaned `description` if it has none.
    #[must_use]
    pub fn lookup<'a>(&'a self, guid: Guid, description: &'a str) -> Cow<'a, str> {
        match self.names.get(&guid) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => clean_description(description),
        }
    }
}
