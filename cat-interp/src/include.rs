// BSD 2-Clause License
//
// Copyright (c) 2019, 2020 Alasdair Armstrong
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
// notice, this list of conditions and the following disclaimer in the
// documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Resolution of `include` statements. Parsing model files is not
//! the interpreter's business, so a loader that reads files is handed
//! a parse function by its creator.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::Model;
use crate::config::InterpConfig;

pub trait ModelLoader {
    fn load(&self, name: &str) -> Result<Rc<Model>, String>;
}

/// A loader for contexts where includes are not allowed.
pub struct NoIncludes;

impl ModelLoader for NoIncludes {
    fn load(&self, name: &str) -> Result<Rc<Model>, String> {
        Err(format!("Cannot include {}: includes are not supported here", name))
    }
}

/// Serves models that have already been parsed, by name.
#[derive(Default)]
pub struct MemoryLoader {
    models: HashMap<String, Rc<Model>, ahash::RandomState>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add<S: Into<String>>(&mut self, name: S, model: Model) {
        self.models.insert(name.into(), Rc::new(model));
    }

    pub fn with<S: Into<String>>(mut self, name: S, model: Model) -> Self {
        self.add(name, model);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }
}

impl ModelLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<Rc<Model>, String> {
        self.models.get(name).cloned().ok_or_else(|| format!("Could not find cat: {}", name))
    }
}

pub type ParseFn = dyn Fn(&Path, &str) -> Result<Model, String>;

/// Finds included files in a list of directories, followed by the
/// directory named by the HERDLIB environment variable (if set).
/// Built-in models, such as a stdlib.cat, take priority over files.
pub struct SearchPathLoader {
    dirs: Vec<PathBuf>,
    builtins: MemoryLoader,
    parse: Box<ParseFn>,
}

impl SearchPathLoader {
    pub fn new(mut dirs: Vec<PathBuf>, parse: Box<ParseFn>) -> Self {
        if let Ok(directory) = env::var("HERDLIB") {
            dirs.push(directory.into())
        }
        SearchPathLoader { dirs, builtins: MemoryLoader::new(), parse }
    }

    pub fn from_config(config: &InterpConfig, parse: Box<ParseFn>) -> Self {
        Self::new(config.include_dirs.clone(), parse)
    }

    /// Files included by the model at `path` are searched for in the
    /// directory containing it before any other.
    pub fn for_model_path<P: AsRef<Path>>(path: P, mut dirs: Vec<PathBuf>, parse: Box<ParseFn>) -> Self {
        let mut directory = path.as_ref().to_path_buf();
        directory.pop();
        if directory.is_dir() {
            dirs.insert(0, directory)
        }
        Self::new(dirs, parse)
    }

    pub fn with_builtin<S: Into<String>>(mut self, name: S, model: Model) -> Self {
        self.builtins.add(name, model);
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn parse_file(&self, file: &Path) -> Result<Rc<Model>, String> {
        let contents =
            fs::read_to_string(file).map_err(|e| format!("Error when loading cat '{}': {}", file.display(), e))?;
        (self.parse)(file, &contents).map(Rc::new)
    }
}

impl ModelLoader for SearchPathLoader {
    fn load(&self, name: &str) -> Result<Rc<Model>, String> {
        if self.builtins.contains(name) {
            return self.builtins.load(name);
        }

        let path = Path::new(name);
        if path.is_absolute() && path.is_file() {
            return self.parse_file(path);
        }

        for dir in &self.dirs {
            let cat_file = dir.join(name);
            if cat_file.is_file() {
                return self.parse_file(&cat_file);
            }
        }

        Err(format!("Could not find cat: {}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    // Each line of a test file names a file to include
    fn parse_includes(file: &Path, contents: &str) -> Result<Model, String> {
        let code = contents.lines().filter(|l| !l.is_empty()).map(include).collect();
        Ok(Model::new(file.display().to_string(), code))
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with("stdlib.cat", Model::new("stdlib", vec![]));
        assert_eq!(loader.load("stdlib.cat").unwrap().name, "stdlib");
        assert!(loader.load("cos.cat").is_err())
    }

    #[test]
    fn test_search_path() {
        let dir = env::temp_dir().join(format!("cat-interp-include-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.cat"), "b.cat\nc.cat\n").unwrap();

        let loader = SearchPathLoader::new(vec![dir.clone()], Box::new(parse_includes))
            .with_builtin("stdlib.cat", Model::new("stdlib", vec![]));
        let model = loader.load("a.cat").unwrap();
        assert_eq!(model.code.len(), 2);
        assert_eq!(loader.load("stdlib.cat").unwrap().name, "stdlib");
        assert_eq!(
            loader.load("missing-cat-interp-test.cat").unwrap_err(),
            "Could not find cat: missing-cat-interp-test.cat"
        );

        fs::remove_dir_all(&dir).unwrap()
    }
}
