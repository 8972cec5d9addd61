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

//! Bell files declare the annotations that events and relations of a
//! model may carry. They are written in the same language as models
//! and run by the same interpreter, but a few instructions behave
//! differently depending on which kind of file is being run.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Model,
    Bell,
}

/// What a bell file has declared so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BellInfo {
    /// For each kind of event, the sets of tags allowed in each
    /// annotation position
    events: BTreeMap<String, Vec<BTreeSet<String>>>,
    relations: BTreeMap<String, Vec<BTreeSet<String>>>,
    orders: BTreeMap<String, BTreeSet<(String, String)>>,
}

impl BellInfo {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.relations.is_empty() && self.orders.is_empty()
    }

    pub fn add_events<S: Into<String>>(&mut self, name: S, annots: Vec<BTreeSet<String>>) {
        self.events.insert(name.into(), annots);
    }

    pub fn add_relations<S: Into<String>>(&mut self, name: S, annots: Vec<BTreeSet<String>>) {
        self.relations.insert(name.into(), annots);
    }

    pub fn add_order<S: Into<String>>(&mut self, name: S, order: BTreeSet<(String, String)>) {
        self.orders.insert(name.into(), order);
    }

    pub fn events(&self, name: &str) -> Option<&[BTreeSet<String>]> {
        self.events.get(name).map(Vec::as_slice)
    }

    pub fn relations(&self, name: &str) -> Option<&[BTreeSet<String>]> {
        self.relations.get(name).map(Vec::as_slice)
    }

    pub fn order(&self, name: &str) -> Option<&BTreeSet<(String, String)>> {
        self.orders.get(name)
    }

    /// Check whether an event of the given kind may carry the given
    /// annotations. Each annotation must come from a different
    /// declared position.
    pub fn allows_event(&self, kind: &str, annots: &[&str]) -> bool {
        match self.events.get(kind) {
            None => annots.is_empty(),
            Some(positions) => {
                annots.len() <= positions.len()
                    && annots.iter().all(|annot| positions.iter().any(|pos| pos.contains(*annot)))
                    && positions.iter().all(|pos| annots.iter().filter(|annot| pos.contains(**annot)).count() <= 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(ts: &[&str]) -> BTreeSet<String> {
        ts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_allows_event() {
        let mut bell = BellInfo::new();
        bell.add_events("R", vec![tags(&["once", "acquire"]), tags(&["wg", "dev"])]);
        assert!(bell.allows_event("R", &["once"]));
        assert!(bell.allows_event("R", &["acquire", "dev"]));
        assert!(!bell.allows_event("R", &["once", "acquire"]));
        assert!(!bell.allows_event("R", &["release"]));
        assert!(bell.allows_event("F", &[]));
        assert!(!bell.allows_event("F", &["mb"]))
    }
}
