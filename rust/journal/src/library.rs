// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk library of exported journal subtrees ("scripts").
//!
//! Layout: `<root>/<style>/<category>/<name>.json` in journal format, with an
//! optional `<name>.png` preview next to it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::journal::Journal;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptEntry {
    pub style: String,
    pub category: String,
    pub name: String,
    pub has_preview: bool,
}

#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    root: PathBuf,
}

impl ScriptLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn script_path(&self, style: &str, category: &str, name: &str) -> Result<PathBuf> {
        Ok(self.dir(style, category)?.join(format!("{}.json", check_part(name)?)))
    }

    pub fn preview_path(&self, style: &str, category: &str, name: &str) -> Result<PathBuf> {
        Ok(self.dir(style, category)?.join(format!("{}.png", check_part(name)?)))
    }

    fn dir(&self, style: &str, category: &str) -> Result<PathBuf> {
        Ok(self.root.join(check_part(style)?).join(check_part(category)?))
    }

    /// Writes a script and its optional preview, creating directories.
    pub fn save(
        &self,
        style: &str,
        category: &str,
        name: &str,
        script: &Journal,
        preview: Option<&[u8]>,
    ) -> Result<PathBuf> {
        let path = self.script_path(style, category, name)?;
        fs::create_dir_all(self.dir(style, category)?)?;
        fs::write(&path, script.to_json()?)?;
        if let Some(png) = preview {
            fs::write(self.preview_path(style, category, name)?, png)?;
        }
        tracing::info!(path = %path.display(), operations = script.len(), "saved script");
        Ok(path)
    }

    pub fn load(&self, style: &str, category: &str, name: &str) -> Result<Journal> {
        let path = self.script_path(style, category, name)?;
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::UserInput(format!("no script {style}/{category}/{name}"))
            }
            _ => Error::Io(e),
        })?;
        let script = Journal::from_json(&text)?;
        script.validate()?;
        Ok(script)
    }

    /// All scripts, sorted by style, category and name.
    pub fn list(&self) -> Result<Vec<ScriptEntry>> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for style in subdirs(&self.root)? {
            for category in subdirs(&self.root.join(&style))? {
                let dir = self.root.join(&style).join(&category);
                for entry in fs::read_dir(&dir)? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    out.push(ScriptEntry {
                        style: style.clone(),
                        category: category.clone(),
                        name: name.to_string(),
                        has_preview: path.with_extension("png").is_file(),
                    });
                }
            }
        }
        out.sort();
        Ok(out)
    }

    /// Deletes a script and its preview.
    pub fn remove(&self, style: &str, category: &str, name: &str) -> Result<()> {
        let path = self.script_path(style, category, name)?;
        if !path.is_file() {
            return Err(Error::UserInput(format!("no script {style}/{category}/{name}")));
        }
        fs::remove_file(&path)?;
        let preview = self.preview_path(style, category, name)?;
        if preview.is_file() {
            fs::remove_file(preview)?;
        }
        Ok(())
    }
}

fn check_part(part: &str) -> Result<&str> {
    let bad = part.is_empty()
        || part == "."
        || part == ".."
        || part.contains(['/', '\\'])
        || part.starts_with('.');
    if bad {
        return Err(Error::UserInput(format!("invalid library path component {part:?}")));
    }
    Ok(part)
}

fn subdirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
