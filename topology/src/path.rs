// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Directed-route paths.
//!
//! A device that has no routable address yet can only be reached by naming, hop
//! by hop, the port through which each device on the way must forward the query.
//! [`DrPath`] is that list of ports. It behaves as a bounded stack: discovery
//! [`extends`](DrPath::extend) it to descend through a port and
//! [`retracts`](DrPath::retract) it to come back to the parent.

use arrayvec::ArrayVec;
use std::fmt::Display;

/// Maximum number of hops of a directed route.
pub const MAXHOPS: usize = 63;

#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path would exceed {MAXHOPS} hops")]
    Overflow,
}

/// A directed route from the origin device.
///
/// The empty path addresses the origin itself.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DrPath {
    hops: ArrayVec<u8, MAXHOPS>,
}

impl DrPath {
    /// The empty path, addressing the origin device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hops in this path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.hops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// The outgoing port numbers, first hop first.
    #[must_use]
    pub fn hops(&self) -> &[u8] {
        &self.hops
    }

    /// Append one hop to the path.
    ///
    /// # Errors
    ///
    /// Fails with [`PathError::Overflow`] if the path already holds [`MAXHOPS`] hops.
    /// The path is left untouched in that case.
    pub fn extend(&mut self, port: u8) -> Result<usize, PathError> {
        self.hops.try_push(port).map_err(|_| PathError::Overflow)?;
        Ok(self.hops.len())
    }

    /// Remove the last hop, returning it.
    pub fn retract(&mut self) -> Option<u8> {
        self.hops.pop()
    }
}

impl<const N: usize> TryFrom<[u8; N]> for DrPath {
    type Error = PathError;

    fn try_from(hops: [u8; N]) -> Result<Self, Self::Error> {
        let mut path = DrPath::new();
        for hop in hops {
            path.extend(hop)?;
        }
        Ok(path)
    }
}

impl Display for DrPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DR path slid 0; dlid 0; 0")?;
        for hop in &self.hops {
            write!(f, ",{hop}")?;
        }
        Ok(())
    }
}

/// Extends paths while keeping the deepest depth ever reached.
///
/// The maximum is only reported (e.g. in the topology file header); it plays no
/// role in the walk itself.
#[derive(Debug, Default)]
pub struct PathTracker {
    max_depth: usize,
}

impl PathTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend `path` by `port`, recording the resulting depth.
    ///
    /// # Errors
    ///
    /// Fails with [`PathError::Overflow`] if the path is already [`MAXHOPS`] deep.
    pub fn extend(&mut self, path: &mut DrPath, port: u8) -> Result<usize, PathError> {
        let depth = path.extend(port)?;
        self.max_depth = self.max_depth.max(depth);
        Ok(depth)
    }

    /// Deepest path built so far.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}
