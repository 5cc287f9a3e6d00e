/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The ordered, deduplicated list of libraries a target links or propagates.
//!
//! Keyed on the target index; first insertion wins the position, later
//! insertions only OR in public-ness (once public, always public, so the
//! list stays a definite upper bound). Insertion order is a topological
//! order by construction: every target appends its direct dependency before
//! merging that dependency's own list.

use indexmap::IndexMap;

use crate::graph::TargetIndex;

#[derive(Clone, Debug, Default)]
pub struct InheritedLibraries {
    libs: IndexMap<TargetIndex, bool>,
}

impl InheritedLibraries {
    pub fn new() -> InheritedLibraries {
        InheritedLibraries::default()
    }

    pub fn append(&mut self, lib: TargetIndex, is_public: bool) {
        let entry = self.libs.entry(lib).or_insert(false);
        *entry |= is_public;
    }

    /// Merges another target's list. Public-ness is the AND along the path:
    /// an entry stays public only if it was public there *and* the edge it
    /// arrives through is public.
    pub fn append_inherited(&mut self, other: &InheritedLibraries, edge_is_public: bool) {
        for (lib, is_public) in other.ordered() {
            self.append(lib, is_public && edge_is_public);
        }
    }

    pub fn ordered(&self) -> impl Iterator<Item = (TargetIndex, bool)> + '_ {
        self.libs.iter().map(|(i, p)| (*i, *p))
    }

    pub fn contains(&self, lib: TargetIndex) -> bool {
        self.libs.contains_key(&lib)
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }
}
