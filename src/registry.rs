// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Catalog of known producers and reachable cloud backends

use std::fmt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};

/// Independent id sets tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Camera,
    Application,
    Cloud,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Camera => "camera",
            Category::Application => "application",
            Category::Cloud => "cloud",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered set of ids; every operation holds the set's lock for
/// its whole duration, so membership test and insert never interleave.
#[derive(Default)]
struct IdSet {
    ids: RwLock<Vec<String>>,
}

impl IdSet {
    async fn add_if_absent(&self, id: &str) -> bool {
        let mut ids = self.ids.write().await;
        if ids.iter().any(|known| known == id) {
            return false;
        }
        ids.push(id.to_string());
        true
    }

    async fn remove(&self, id: &str) -> bool {
        let mut ids = self.ids.write().await;
        match ids.iter().position(|known| known == id) {
            Some(index) => {
                ids.remove(index);
                true
            }
            None => false,
        }
    }

    async fn contains(&self, id: &str) -> bool {
        self.ids.read().await.iter().any(|known| known == id)
    }

    async fn snapshot(&self) -> Vec<String> {
        self.ids.read().await.clone()
    }
}

/// Process-wide registry shared by all sessions
#[derive(Default)]
pub struct Registry {
    cameras: IdSet,
    applications: IdSet,
    clouds: IdSet,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, category: Category) -> &IdSet {
        match category {
            Category::Camera => &self.cameras,
            Category::Application => &self.applications,
            Category::Cloud => &self.clouds,
        }
    }

    /// Register `id`, returning true when it was not known before
    pub async fn add_if_absent(&self, category: Category, id: &str) -> bool {
        let added = self.set(category).add_if_absent(id).await;
        if added {
            info!(category = %category, id = %id, "Registered new {}", category);
        }
        added
    }

    /// Remove `id`; absent ids leave the set untouched and yield `NotFound`
    pub async fn remove(&self, category: Category, id: &str) -> GatewayResult<()> {
        if self.set(category).remove(id).await {
            info!(category = %category, id = %id, "Removed {}", category);
            Ok(())
        } else {
            debug!(category = %category, id = %id, "Remove of unknown id");
            Err(GatewayError::NotFound {
                kind: category.as_str(),
                id: id.to_string(),
            })
        }
    }

    pub async fn contains(&self, category: Category, id: &str) -> bool {
        self.set(category).contains(id).await
    }

    /// Snapshot copy in insertion order
    pub async fn list(&self, category: Category) -> Vec<String> {
        self.set(category).snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_categories_are_independent() {
        let registry = Registry::new();
        registry.add_if_absent(Category::Camera, "shared").await;

        assert!(registry.contains(Category::Camera, "shared").await);
        assert!(!registry.contains(Category::Application, "shared").await);
        assert!(registry.list(Category::Cloud).await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = Registry::new();
        registry.add_if_absent(Category::Camera, "cam1").await;

        let snapshot = registry.list(Category::Camera).await;
        registry.add_if_absent(Category::Camera, "cam2").await;

        assert_eq!(snapshot, vec!["cam1".to_string()]);
    }
}
