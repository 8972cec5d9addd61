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

//! This module loads a TOML file configuring how models are
//! interpreted: which checks to skip, which relations to show, and
//! which variants are enabled.

use std::collections::HashSet;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use toml::Value;

use crate::log;

fn get_table_bool(config: &Value, table: &str, key: &str) -> Result<bool, String> {
    match config.get(table).and_then(|table| table.get(key)) {
        None => Ok(false),
        Some(Value::Boolean(b)) => Ok(*b),
        Some(_) => Err(format!("Configuration option {}.{} must be a boolean", table, key)),
    }
}

fn get_table_strings(config: &Value, table: &str, key: &str) -> Result<Vec<String>, String> {
    match config.get(table).and_then(|table| table.get(key)) {
        None => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| format!("Each element of {}.{} must be a string", table, key))
            })
            .collect(),
        Some(_) => Err(format!("Configuration option {}.{} must be an array of strings", table, key)),
    }
}

fn get_log_flags(config: &Value) -> Result<u32, String> {
    let mut flags = 0;
    for name in get_table_strings(config, "log", "flags")? {
        flags |= log::flag_from_str(&name).ok_or_else(|| format!("Unknown log flag {}", name))?
    }
    Ok(flags)
}

#[derive(Clone, Debug, Default)]
pub struct InterpConfig {
    /// Named checks (tests or calls) that succeed without being evaluated
    pub skip_checks: HashSet<String>,
    /// Evaluate skipped checks anyway
    pub strict_skip: bool,
    /// Relations registered for display when they are defined
    pub show_names: HashSet<String>,
    /// Register every defined relation and set for display
    pub show_all: bool,
    pub variants: HashSet<String>,
    pub include_dirs: Vec<PathBuf>,
    /// Interpret models as bell files
    pub bell: bool,
    log_flags: u32,
}

impl InterpConfig {
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config = match contents.parse::<Value>() {
            Ok(config) => config,
            Err(e) => return Err(format!("Error when parsing configuration: {}", e)),
        };

        Ok(InterpConfig {
            skip_checks: get_table_strings(&config, "checks", "skip")?.into_iter().collect(),
            strict_skip: get_table_bool(&config, "checks", "strict_skip")?,
            show_names: get_table_strings(&config, "show", "names")?.into_iter().collect(),
            show_all: get_table_bool(&config, "show", "all")?,
            variants: get_table_strings(&config, "model", "variants")?.into_iter().collect(),
            include_dirs: get_table_strings(&config, "model", "include_dirs")?.into_iter().map(PathBuf::from).collect(),
            bell: get_table_bool(&config, "model", "bell")?,
            log_flags: get_log_flags(&config)?,
        })
    }

    /// Load the configuration from a TOML file.
    pub fn from_file<P>(path: P) -> Result<Self, String>
    where
        P: AsRef<Path>,
    {
        let mut contents = String::new();
        match File::open(&path) {
            Ok(mut handle) => match handle.read_to_string(&mut contents) {
                Ok(_) => (),
                Err(e) => return Err(format!("Unexpected failure while reading config: {}", e)),
            },
            Err(e) => return Err(format!("Error when loading config '{}': {}", path.as_ref().display(), e)),
        };
        Self::parse(&contents)
    }

    pub fn log_flags(&self) -> u32 {
        self.log_flags
    }

    pub fn variant(&self, name: &str) -> bool {
        self.variants.contains(name)
    }

    pub fn should_show(&self, name: &str) -> bool {
        self.show_all || self.show_names.contains(name)
    }

    /// Whether a named check is skipped rather than evaluated.
    pub fn skips(&self, name: &str) -> bool {
        !self.strict_skip && self.skip_checks.contains(name)
    }
}
