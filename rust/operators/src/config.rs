// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session configuration loaded from environment variables.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Vertices created by one operator run closer than this are merged.
    pub merge_distance: f64,
    /// Root of the script library.
    pub script_dir: PathBuf,
    /// Maximum operator runs one user action may trigger.
    pub max_replay: usize,
    /// Bridge perimeter insertion when a parameter record does not say.
    pub insert_perimeter: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            merge_distance: std::env::var("ARCHKIT_MERGE_DISTANCE")
                .unwrap_or_else(|_| "1e-5".into())
                .parse()
                .unwrap_or(1e-5),
            script_dir: std::env::var("ARCHKIT_SCRIPT_DIR")
                .unwrap_or_else(|_| "./scripts".into())
                .into(),
            max_replay: std::env::var("ARCHKIT_MAX_REPLAY")
                .unwrap_or_else(|_| "10000".into())
                .parse()
                .unwrap_or(10_000),
            insert_perimeter: std::env::var("ARCHKIT_INSERT_PERIMETER")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
        }
    }

    pub fn with_merge_distance(mut self, distance: f64) -> Self {
        self.merge_distance = distance;
        self
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }

    pub fn with_max_replay(mut self, runs: usize) -> Self {
        self.max_replay = runs;
        self
    }

    pub fn with_insert_perimeter(mut self, insert: bool) -> Self {
        self.insert_perimeter = insert;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override() {
        let config = Config::default()
            .with_merge_distance(1e-3)
            .with_script_dir("/tmp/scripts")
            .with_max_replay(5)
            .with_insert_perimeter(false);
        assert_eq!(config.merge_distance, 1e-3);
        assert_eq!(config.script_dir, PathBuf::from("/tmp/scripts"));
        assert_eq!(config.max_replay, 5);
        assert!(!config.insert_perimeter);
    }
}
