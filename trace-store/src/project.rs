//  Copyright 2024 The trace-store Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The top-level container grouping one span store and one evaluation
//! store, plus a registry for hosting several named projects in one
//! process.
use crate::eval_store::EvalStore;
use crate::span_store::SpanStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use trace_types::Timestamp;

/// The project name used when a caller doesn't ask for a specific one.
pub const DEFAULT_PROJECT_NAME: &str = "default";

/// A narrow composition of a [`SpanStore`] and an [`EvalStore`].
///
/// `Project` holds no lock of its own and never acquires both sub-stores'
/// locks at once - callers reach each store's operations directly through
/// [`Project::spans`] and [`Project::evaluations`], eliminating deadlock by
/// construction rather than by careful lock ordering.
pub struct Project {
    spans: SpanStore,
    evaluations: EvalStore,
}

impl Project {
    /// Creates an empty project.
    pub fn new() -> Project {
        Project {
            spans: SpanStore::new(),
            evaluations: EvalStore::new(),
        }
    }

    /// The project's span store.
    #[inline]
    pub fn spans(&self) -> &SpanStore {
        &self.spans
    }

    /// The project's evaluation store.
    #[inline]
    pub fn evaluations(&self) -> &EvalStore {
        &self.evaluations
    }

    /// The more recent of the two sub-stores' `last_updated_at` clocks, or
    /// either one if the other has never been updated.
    pub fn last_updated_at(&self) -> Option<Timestamp> {
        match (self.spans.last_updated_at(), self.evaluations.last_updated_at()) {
            (Some(a), Some(b)) => Some(if a >= b { a } else { b }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

impl Default for Project {
    fn default() -> Project {
        Project::new()
    }
}

/// A named collection of independent [`Project`]s hosted in one process.
///
/// Projects never share data; `get_or_create` lazily initializes a new,
/// empty project the first time a name is seen.
pub struct ProjectRegistry {
    projects: RwLock<HashMap<String, Arc<Project>>>,
}

impl ProjectRegistry {
    /// Creates an empty registry.
    pub fn new() -> ProjectRegistry {
        ProjectRegistry {
            projects: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the project named `name`, creating it if this is the first
    /// time it has been requested.
    pub fn get_or_create(&self, name: &str) -> Arc<Project> {
        if let Some(project) = self.projects.read().get(name) {
            return project.clone();
        }
        self.projects
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Project::new()))
            .clone()
    }

    /// Returns the project named `name` if it has already been created,
    /// without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<Project>> {
        self.projects.read().get(name).cloned()
    }

    /// The names of every project created so far.
    pub fn project_names(&self) -> Vec<String> {
        self.projects.read().keys().cloned().collect()
    }
}

impl Default for ProjectRegistry {
    fn default() -> ProjectRegistry {
        ProjectRegistry::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use trace_types::{Span, SpanKind, StatusCode};

    #[test]
    fn last_updated_at_is_the_more_recent_clock() {
        let project = Project::new();
        assert_eq!(project.last_updated_at(), None);

        let span = Span::builder()
            .span_id("a")
            .trace_id("t1")
            .span_kind(SpanKind::Chain)
            .status_code(StatusCode::Ok)
            .start_time(Timestamp::from_unix_nanos(0))
            .end_time(Timestamp::from_unix_nanos(1))
            .build();
        project.spans().add_span(span);
        assert!(project.last_updated_at().is_some());
    }

    #[test]
    fn registry_returns_independent_projects_per_name() {
        let registry = ProjectRegistry::new();
        let default_project = registry.get_or_create(DEFAULT_PROJECT_NAME);
        let other_project = registry.get_or_create("other");

        let span = Span::builder()
            .span_id("a")
            .trace_id("t1")
            .span_kind(SpanKind::Chain)
            .status_code(StatusCode::Ok)
            .start_time(Timestamp::from_unix_nanos(0))
            .end_time(Timestamp::from_unix_nanos(1))
            .build();
        default_project.spans().add_span(span);

        assert_eq!(default_project.spans().span_count(), 1);
        assert_eq!(other_project.spans().span_count(), 0);
        assert_eq!(registry.get_or_create(DEFAULT_PROJECT_NAME).spans().span_count(), 1);
    }
}
