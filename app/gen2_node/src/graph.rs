/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The arena owning every target and toolchain.
//!
//! Nodes refer to each other through stable `u32` indices rather than
//! pointers, so the graph can be shared immutably across worker threads
//! during emission and serialized if it ever needs to be.

use gazebo::dupe::Dupe;
use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::label::Label;
use indexmap::IndexMap;

use crate::resolve;
use crate::target::Target;
use crate::toolchain::Toolchain;

/// Index of a target in its [`TargetGraph`].
#[derive(Clone, Copy, Dupe, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TargetIndex(pub u32);

/// Index of a toolchain in its [`TargetGraph`].
#[derive(Clone, Copy, Dupe, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ToolchainIndex(pub u32);

/// A dependency edge: the label as written plus the index of the resolved
/// target it points at.
#[derive(Clone, Debug)]
pub struct LabelTargetPair {
    pub label: Label,
    pub target: TargetIndex,
}

impl LabelTargetPair {
    pub fn new(label: Label, target: TargetIndex) -> LabelTargetPair {
        LabelTargetPair { label, target }
    }
}

#[derive(Debug, Default)]
pub struct TargetGraph {
    targets: Vec<Target>,
    toolchains: Vec<Toolchain>,
    targets_by_label: IndexMap<Label, TargetIndex>,
    toolchains_by_label: IndexMap<Label, ToolchainIndex>,
    default_toolchain: Option<ToolchainIndex>,
}

impl TargetGraph {
    pub fn new() -> TargetGraph {
        TargetGraph::default()
    }

    /// The first toolchain added becomes the default unless
    /// [`TargetGraph::set_default_toolchain`] says otherwise.
    pub fn add_toolchain(&mut self, toolchain: Toolchain) -> ToolchainIndex {
        let idx = ToolchainIndex(self.toolchains.len() as u32);
        self.toolchains_by_label
            .insert(toolchain.label().dupe(), idx);
        self.toolchains.push(toolchain);
        if self.default_toolchain.is_none() {
            self.default_toolchain = Some(idx);
        }
        idx
    }

    pub fn set_default_toolchain(&mut self, idx: ToolchainIndex) {
        self.default_toolchain = Some(idx);
    }

    pub fn default_toolchain(&self) -> Option<ToolchainIndex> {
        self.default_toolchain
    }

    pub fn add_target(&mut self, target: Target) -> Result<TargetIndex, BuildError> {
        if self.targets_by_label.contains_key(target.label()) {
            return Err(BuildError::user(format!(
                "duplicate target {}",
                target.label()
            )));
        }
        let idx = TargetIndex(self.targets.len() as u32);
        self.targets_by_label.insert(target.label().dupe(), idx);
        self.targets.push(target);
        Ok(idx)
    }

    pub fn target(&self, idx: TargetIndex) -> &Target {
        &self.targets[idx.0 as usize]
    }

    pub fn target_mut(&mut self, idx: TargetIndex) -> &mut Target {
        &mut self.targets[idx.0 as usize]
    }

    pub fn toolchain(&self, idx: ToolchainIndex) -> &Toolchain {
        &self.toolchains[idx.0 as usize]
    }

    pub fn target_by_label(&self, label: &Label) -> Option<TargetIndex> {
        self.targets_by_label.get(label).copied()
    }

    pub fn toolchain_by_label(&self, label: &Label) -> Option<ToolchainIndex> {
        self.toolchains_by_label.get(label).copied()
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetIndex, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(i, t)| (TargetIndex(i as u32), t))
    }

    pub fn toolchains(&self) -> impl Iterator<Item = (ToolchainIndex, &Toolchain)> {
        self.toolchains
            .iter()
            .enumerate()
            .map(|(i, t)| (ToolchainIndex(i as u32), t))
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Dependencies before dependents, in a deterministic order. The
    /// front-end contract already forbids cycles; this is the defensive
    /// check, and it reports the full cycle path when the contract is
    /// broken.
    pub fn sorted_topologically(&self) -> Result<Vec<TargetIndex>, BuildError> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            White,
            Gray,
            Black,
        }

        let mut state = vec![State::White; self.targets.len()];
        let mut order = Vec::with_capacity(self.targets.len());
        // (index, next child position); explicit stack so deep graphs cannot
        // overflow the call stack.
        let mut stack: Vec<(TargetIndex, usize)> = Vec::new();

        for start in 0..self.targets.len() {
            let start = TargetIndex(start as u32);
            if state[start.0 as usize] != State::White {
                continue;
            }
            stack.push((start, 0));
            state[start.0 as usize] = State::Gray;

            while let Some((idx, child_pos)) = stack.pop() {
                let children = self.dep_indices(idx);
                match children.get(child_pos) {
                    None => {
                        state[idx.0 as usize] = State::Black;
                        order.push(idx);
                    }
                    Some(child) => {
                        stack.push((idx, child_pos + 1));
                        match state[child.0 as usize] {
                            State::White => {
                                state[child.0 as usize] = State::Gray;
                                stack.push((*child, 0));
                            }
                            State::Gray => {
                                return Err(self.cycle_error(&stack, *child));
                            }
                            State::Black => {}
                        }
                    }
                }
            }
        }
        Ok(order)
    }

    fn dep_indices(&self, idx: TargetIndex) -> Vec<TargetIndex> {
        let t = self.target(idx);
        t.public_deps()
            .iter()
            .chain(t.private_deps())
            .chain(t.data_deps())
            .chain(t.gen_deps())
            .map(|p| p.target)
            .collect()
    }

    fn cycle_error(&self, stack: &[(TargetIndex, usize)], back_edge: TargetIndex) -> BuildError {
        let mut path: Vec<Label> = Vec::new();
        let mut in_cycle = false;
        for (idx, _) in stack {
            if *idx == back_edge {
                in_cycle = true;
            }
            if in_cycle {
                path.push(self.target(*idx).label().dupe());
            }
        }
        path.push(self.target(back_edge).label().dupe());
        BuildError::Cycle { path }
    }

    /// Phase 1: resolves every target in dependency order. User errors are
    /// collected (the offending target and its dependents stay unresolved,
    /// everything else proceeds); a cycle aborts resolution entirely.
    pub fn resolve_all(&mut self, settings: &BuildSettings) -> Vec<BuildError> {
        let order = match self.sorted_topologically() {
            Ok(order) => order,
            Err(e) => return vec![e],
        };
        let mut errors = Vec::new();
        for idx in order {
            let unresolved_dep = self
                .dep_indices(idx)
                .into_iter()
                .any(|d| !self.target(d).is_resolved());
            if unresolved_dep {
                // A dependency already failed and reported; stay quiet to
                // avoid cascading diagnostics.
                tracing::debug!(
                    label = %self.target(idx).label(),
                    "skipping resolution, a dependency failed"
                );
                continue;
            }
            match resolve::compute(self, idx, settings) {
                Ok(state) => self.target_mut(idx).set_resolved(state),
                Err(e) => {
                    tracing::debug!(label = %self.target(idx).label(), error = %e, "resolution failed");
                    errors.push(e);
                }
            }
        }
        errors
    }
}
