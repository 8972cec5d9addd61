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

//! The execution context is everything the interpreter knows about
//! the candidate execution it is checking. It is built once per
//! candidate by whatever enumerates candidates, and is never modified
//! while a model runs.

use std::collections::HashMap;

use crate::events::{Event, EventSet, Relation};

/// A candidate execution, as far as the interpreter is concerned. It
/// is only used to produce readable diagnostics.
pub trait Candidate {
    fn event_name(&self, ev: Event) -> String {
        format!("{}", ev)
    }

    fn describe_cycle(&self, cycle: &[Event]) -> String {
        let mut names: Vec<String> = cycle.iter().map(|ev| self.event_name(*ev)).collect();
        if let Some(first) = names.first().cloned() {
            names.push(first)
        }
        names.join(" -> ")
    }
}

/// A candidate with no extra information, events are named by their id.
pub struct Anonymous;

impl Candidate for Anonymous {}

/// A candidate whose events have names, such as the instruction
/// labels of a litmus test.
pub struct NamedEvents {
    names: HashMap<Event, String, ahash::RandomState>,
}

impl NamedEvents {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (Event, S)>,
        S: Into<String>,
    {
        NamedEvents { names: names.into_iter().map(|(ev, name)| (ev, name.into())).collect() }
    }
}

impl Candidate for NamedEvents {
    fn event_name(&self, ev: Event) -> String {
        match self.names.get(&ev) {
            Some(name) => name.clone(),
            None => format!("{}", ev),
        }
    }
}

pub struct ExecutionContext {
    id: Relation,
    unv: Relation,
    events: EventSet,
    tag_events: HashMap<String, EventSet, ahash::RandomState>,
    tag_scopes: HashMap<String, Relation, ahash::RandomState>,
    candidate: Box<dyn Candidate>,
}

impl ExecutionContext {
    /// Create a context over the given events. The universe relation
    /// defaults to every pair of events.
    pub fn new(events: EventSet) -> Self {
        ExecutionContext {
            id: Relation::identity(&events),
            unv: Relation::cartesian(&events, &events),
            events,
            tag_events: HashMap::default(),
            tag_scopes: HashMap::default(),
            candidate: Box::new(Anonymous),
        }
    }

    pub fn with_universe(mut self, unv: Relation) -> Self {
        self.unv = unv;
        self
    }

    pub fn with_candidate(mut self, candidate: Box<dyn Candidate>) -> Self {
        self.candidate = candidate;
        self
    }

    /// The events carrying a tag, as returned by `tag2events`.
    pub fn with_tag_events<S: Into<String>>(mut self, tag: S, events: EventSet) -> Self {
        self.tag_events.insert(tag.into(), events);
        self
    }

    /// The pairs of events in the same instance of a scope, as
    /// returned by `tag2scope`.
    pub fn with_tag_scope<S: Into<String>>(mut self, tag: S, scope: Relation) -> Self {
        self.tag_scopes.insert(tag.into(), scope);
        self
    }

    pub fn id(&self) -> &Relation {
        &self.id
    }

    pub fn unv(&self) -> &Relation {
        &self.unv
    }

    pub fn events(&self) -> &EventSet {
        &self.events
    }

    pub fn tag_events(&self, tag: &str) -> Option<&EventSet> {
        self.tag_events.get(tag)
    }

    pub fn tag_scope(&self, tag: &str) -> Option<&Relation> {
        self.tag_scopes.get(tag)
    }

    pub fn candidate(&self) -> &dyn Candidate {
        &*self.candidate
    }
}
