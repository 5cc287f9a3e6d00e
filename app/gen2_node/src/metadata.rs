/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Per-target metadata and the recursive key/barrier walk over the graph.
//!
//! Metadata is a map from keys to lists of values. A walk starts from a set
//! of targets, concatenates the values under the requested data keys, and
//! recurses into dependencies. Walk keys act as barriers: when a target
//! declares values under a walk key, those values name the only dependencies
//! the walk continues into from there.

use gen2_core::error::BuildError;
use gen2_core::label::Label;
use gen2_core::path_utils::join_and_normalize;
use gen2_core::source_file::SourceDir;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::graph::TargetGraph;
use crate::graph::TargetIndex;

/// A metadata value. Lists are concatenated across targets during a walk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Metadata {
    contents: IndexMap<String, Value>,
    /// The directory of the declaring build file, used when collected file
    /// names are rebased.
    source_dir: SourceDir,
}

impl Metadata {
    pub fn contents(&self) -> &IndexMap<String, Value> {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut IndexMap<String, Value> {
        &mut self.contents
    }

    pub fn source_dir(&self) -> &SourceDir {
        &self.source_dir
    }

    pub fn set_source_dir(&mut self, dir: SourceDir) {
        self.source_dir = dir;
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Collects this target's share of a walk: the values under
    /// `keys_to_extract`, and the labels to walk next (the empty string
    /// meaning "all dependencies").
    pub fn walk_local(
        &self,
        keys_to_extract: &[String],
        keys_to_walk: &[String],
        rebase_files: bool,
    ) -> (Vec<Value>, Vec<String>) {
        let mut result = Vec::new();
        for key in keys_to_extract {
            let Some(value) = self.contents.get(key) else {
                continue;
            };
            match value {
                Value::List(items) => {
                    for item in items {
                        result.push(self.maybe_rebase(item, rebase_files));
                    }
                }
                other => result.push(self.maybe_rebase(other, rebase_files)),
            }
        }

        let mut next = Vec::new();
        for key in keys_to_walk {
            if let Some(Value::List(items)) = self.contents.get(key) {
                for item in items {
                    if let Value::String(s) = item {
                        next.push(s.clone());
                    }
                }
            }
        }
        if keys_to_walk.is_empty() {
            next.push(String::new());
        }
        (result, next)
    }

    fn maybe_rebase(&self, value: &Value, rebase_files: bool) -> Value {
        match value {
            Value::String(s) if rebase_files && !s.starts_with('/') => {
                Value::String(join_and_normalize(self.source_dir.as_str(), s))
            }
            other => other.clone(),
        }
    }
}

/// Walks metadata over the graph from `roots`. Returns the collected values
/// and the targets visited, both in deterministic first-visit order.
pub fn walk_metadata(
    graph: &TargetGraph,
    roots: &[TargetIndex],
    data_keys: &[String],
    walk_keys: &[String],
    rebase_files: bool,
) -> Result<(Vec<Value>, Vec<TargetIndex>), BuildError> {
    let mut visited: IndexSet<TargetIndex> = IndexSet::new();
    let mut result = Vec::new();
    for root in roots {
        walk_one(
            graph,
            *root,
            data_keys,
            walk_keys,
            rebase_files,
            &mut visited,
            &mut result,
        )?;
    }
    Ok((result, visited.into_iter().collect()))
}

fn walk_one(
    graph: &TargetGraph,
    idx: TargetIndex,
    data_keys: &[String],
    walk_keys: &[String],
    rebase_files: bool,
    visited: &mut IndexSet<TargetIndex>,
    result: &mut Vec<Value>,
) -> Result<(), BuildError> {
    if !visited.insert(idx) {
        return Ok(());
    }
    let target = graph.target(idx);
    let (values, next) = target
        .metadata()
        .walk_local(data_keys, walk_keys, rebase_files);
    result.extend(values);

    for key in next {
        if key.is_empty() {
            for pair in target
                .public_deps()
                .iter()
                .chain(target.private_deps())
                .chain(target.data_deps())
            {
                walk_one(
                    graph,
                    pair.target,
                    data_keys,
                    walk_keys,
                    rebase_files,
                    visited,
                    result,
                )?;
            }
        } else {
            let wanted = Label::parse(&key)?;
            let pair = target
                .public_deps()
                .iter()
                .chain(target.private_deps())
                .chain(target.data_deps())
                .find(|p| p.label.no_toolchain() == wanted.no_toolchain());
            match pair {
                Some(pair) => walk_one(
                    graph,
                    pair.target,
                    data_keys,
                    walk_keys,
                    rebase_files,
                    visited,
                    result,
                )?,
                None => {
                    return Err(BuildError::user(format!(
                        "metadata walk key `{}` of {} does not name a dependency",
                        key,
                        target.label()
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LabelTargetPair;
    use crate::target::OutputType;
    use crate::testing::TestSetup;

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::String((*s).to_owned())).collect())
    }

    #[test]
    fn collect_without_recursing() {
        let mut setup = TestSetup::new();

        let mut one = setup.target("//foo:one", OutputType::SourceSet);
        one.metadata_mut().contents_mut().insert("a".to_owned(), list(&["foo"]));
        one.metadata_mut()
            .contents_mut()
            .insert("b".to_owned(), Value::List(vec![Value::Bool(true)]));
        let one = setup.add_target(one);

        let mut two = setup.target("//foo:two", OutputType::SourceSet);
        two.metadata_mut().contents_mut().insert("a".to_owned(), list(&["bar"]));
        two.metadata_mut()
            .contents_mut()
            .insert("b".to_owned(), Value::List(vec![Value::Bool(false)]));
        let two = setup.add_target(two);

        let (result, walked) = walk_metadata(
            &setup.graph,
            &[one, two],
            &["a".to_owned(), "b".to_owned()],
            &[],
            false,
        )
        .unwrap();

        assert_eq!(
            result,
            vec![
                Value::String("foo".to_owned()),
                Value::Bool(true),
                Value::String("bar".to_owned()),
                Value::Bool(false),
            ]
        );
        assert_eq!(walked, vec![one, two]);
    }

    #[test]
    fn collect_recurses_into_deps() {
        let mut setup = TestSetup::new();

        let mut two = setup.target("//foo:two", OutputType::SourceSet);
        two.metadata_mut().contents_mut().insert("a".to_owned(), list(&["bar"]));
        let two = setup.add_target(two);

        let mut one = setup.target("//foo:one", OutputType::SourceSet);
        one.metadata_mut().contents_mut().insert("a".to_owned(), list(&["foo"]));
        one.public_deps_mut().push(LabelTargetPair::new(
            setup.graph.target(two).label().clone(),
            two,
        ));
        let one = setup.add_target(one);

        let (result, walked) =
            walk_metadata(&setup.graph, &[one], &["a".to_owned()], &[], false).unwrap();

        assert_eq!(
            result,
            vec![Value::String("foo".to_owned()), Value::String("bar".to_owned())]
        );
        assert_eq!(walked, vec![one, two]);
    }

    #[test]
    fn walk_keys_act_as_barriers() {
        let mut setup = TestSetup::new();

        let mut hidden = setup.target("//foo:hidden", OutputType::SourceSet);
        hidden
            .metadata_mut()
            .contents_mut()
            .insert("a".to_owned(), list(&["hidden"]));
        let hidden = setup.add_target(hidden);

        let mut chosen = setup.target("//foo:chosen", OutputType::SourceSet);
        chosen
            .metadata_mut()
            .contents_mut()
            .insert("a".to_owned(), list(&["chosen"]));
        let chosen = setup.add_target(chosen);

        let mut root = setup.target("//foo:root", OutputType::Group);
        root.metadata_mut()
            .contents_mut()
            .insert("barrier".to_owned(), list(&["//foo:chosen"]));
        for idx in [hidden, chosen] {
            root.public_deps_mut().push(LabelTargetPair::new(
                setup.graph.target(idx).label().clone(),
                idx,
            ));
        }
        let root = setup.add_target(root);

        let (result, walked) = walk_metadata(
            &setup.graph,
            &[root],
            &["a".to_owned()],
            &["barrier".to_owned()],
            false,
        )
        .unwrap();

        assert_eq!(result, vec![Value::String("chosen".to_owned())]);
        assert_eq!(walked, vec![root, chosen]);
    }

    #[test]
    fn walk_key_must_name_a_dependency() {
        let mut setup = TestSetup::new();
        let mut root = setup.target("//foo:root", OutputType::Group);
        root.metadata_mut()
            .contents_mut()
            .insert("barrier".to_owned(), list(&["//foo:nonexistent"]));
        let root = setup.add_target(root);

        let err = walk_metadata(
            &setup.graph,
            &[root],
            &["a".to_owned()],
            &["barrier".to_owned()],
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not name a dependency"));
    }

    #[test]
    fn rebasing_joins_onto_the_declaring_dir() {
        let mut setup = TestSetup::new();
        let mut t = setup.target("//foo:files", OutputType::SourceSet);
        t.metadata_mut().contents_mut().insert("f".to_owned(), list(&["data/x.txt"]));
        t.metadata_mut()
            .set_source_dir(SourceDir::unchecked_new("//foo/"));
        let t = setup.add_target(t);

        let (result, _) =
            walk_metadata(&setup.graph, &[t], &["f".to_owned()], &[], true).unwrap();
        assert_eq!(result, vec![Value::String("//foo/data/x.txt".to_owned())]);
    }
}
