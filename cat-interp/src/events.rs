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

//! Concrete events, event sets, and relations over events. These are
//! the values the cat relational algebra ultimately computes with for
//! a single candidate execution.

use std::collections::btree_set;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::FromIterator;

/// An event is an opaque identifier chosen by whoever builds the
/// execution context. Names for diagnostics come from the
/// [crate::context::Candidate] the context was built with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Event(u32);

impl Event {
    pub fn new(id: u32) -> Self {
        Event(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventSet {
    events: BTreeSet<Event>,
}

impl EventSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn singleton(ev: Event) -> Self {
        let mut events = BTreeSet::new();
        events.insert(ev);
        EventSet { events }
    }

    pub fn insert(&mut self, ev: Event) -> bool {
        self.events.insert(ev)
    }

    pub fn contains(&self, ev: Event) -> bool {
        self.events.contains(&ev)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.events.iter().copied()
    }

    pub fn first(&self) -> Option<Event> {
        self.events.iter().next().copied()
    }

    pub fn remove(&mut self, ev: Event) -> bool {
        self.events.remove(&ev)
    }

    pub fn union(&self, other: &EventSet) -> EventSet {
        EventSet { events: self.events.union(&other.events).copied().collect() }
    }

    pub fn inter(&self, other: &EventSet) -> EventSet {
        EventSet { events: self.events.intersection(&other.events).copied().collect() }
    }

    pub fn diff(&self, other: &EventSet) -> EventSet {
        EventSet { events: self.events.difference(&other.events).copied().collect() }
    }

    pub fn is_subset(&self, other: &EventSet) -> bool {
        self.events.is_subset(&other.events)
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        EventSet { events: iter.into_iter().collect() }
    }
}

impl IntoIterator for EventSet {
    type Item = Event;
    type IntoIter = btree_set::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl fmt::Display for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for ev in &self.events {
            if !first {
                write!(f, ", ")?
            }
            write!(f, "{}", ev)?;
            first = false
        }
        write!(f, "}}")
    }
}

/// A binary relation over events, i.e. a set of ordered pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Relation {
    pairs: BTreeSet<(Event, Event)>,
}

impl Relation {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn singleton(ev1: Event, ev2: Event) -> Self {
        let mut pairs = BTreeSet::new();
        pairs.insert((ev1, ev2));
        Relation { pairs }
    }

    /// The identity relation over a set of events
    pub fn identity(events: &EventSet) -> Self {
        Relation { pairs: events.iter().map(|ev| (ev, ev)).collect() }
    }

    pub fn cartesian(xs: &EventSet, ys: &EventSet) -> Self {
        let mut pairs = BTreeSet::new();
        for x in xs.iter() {
            for y in ys.iter() {
                pairs.insert((x, y));
            }
        }
        Relation { pairs }
    }

    pub fn insert(&mut self, ev1: Event, ev2: Event) -> bool {
        self.pairs.insert((ev1, ev2))
    }

    pub fn remove(&mut self, ev1: Event, ev2: Event) -> bool {
        self.pairs.remove(&(ev1, ev2))
    }

    pub fn contains(&self, ev1: Event, ev2: Event) -> bool {
        self.pairs.contains(&(ev1, ev2))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Event, Event)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn first(&self) -> Option<(Event, Event)> {
        self.pairs.iter().next().copied()
    }

    pub fn union(&self, other: &Relation) -> Relation {
        Relation { pairs: self.pairs.union(&other.pairs).copied().collect() }
    }

    pub fn inter(&self, other: &Relation) -> Relation {
        Relation { pairs: self.pairs.intersection(&other.pairs).copied().collect() }
    }

    pub fn diff(&self, other: &Relation) -> Relation {
        Relation { pairs: self.pairs.difference(&other.pairs).copied().collect() }
    }

    pub fn is_subset(&self, other: &Relation) -> bool {
        self.pairs.is_subset(&other.pairs)
    }

    pub fn inverse(&self) -> Relation {
        Relation { pairs: self.pairs.iter().map(|(x, y)| (*y, *x)).collect() }
    }

    pub fn domain(&self) -> EventSet {
        self.pairs.iter().map(|(x, _)| *x).collect()
    }

    pub fn range(&self) -> EventSet {
        self.pairs.iter().map(|(_, y)| *y).collect()
    }

    /// Keep only the pairs whose source is in `xs` and whose target
    /// is in `ys`. This is `self & (xs * ys)` without building the
    /// product.
    pub fn restrict(&self, xs: &EventSet, ys: &EventSet) -> Relation {
        Relation { pairs: self.pairs.iter().filter(|(x, y)| xs.contains(*x) && ys.contains(*y)).copied().collect() }
    }

    fn successors(&self) -> BTreeMap<Event, Vec<Event>> {
        let mut succs: BTreeMap<Event, Vec<Event>> = BTreeMap::new();
        for (x, y) in &self.pairs {
            succs.entry(*x).or_default().push(*y)
        }
        succs
    }

    /// Relational composition `self; other`
    pub fn seq(&self, other: &Relation) -> Relation {
        let succs = other.successors();
        let mut pairs = BTreeSet::new();
        for (x, y) in &self.pairs {
            if let Some(zs) = succs.get(y) {
                for z in zs {
                    pairs.insert((*x, *z));
                }
            }
        }
        Relation { pairs }
    }

    pub fn transitive_closure(&self) -> Relation {
        let succs = self.successors();
        let mut pairs = BTreeSet::new();
        for start in succs.keys() {
            let mut stack: Vec<Event> = succs[start].clone();
            let mut seen = BTreeSet::new();
            while let Some(ev) = stack.pop() {
                if seen.insert(ev) {
                    pairs.insert((*start, ev));
                    if let Some(next) = succs.get(&ev) {
                        stack.extend(next.iter().copied())
                    }
                }
            }
        }
        Relation { pairs }
    }

    pub fn reflexive_transitive_closure(&self, events: &EventSet) -> Relation {
        self.transitive_closure().union(&Relation::identity(events))
    }

    pub fn is_irreflexive(&self) -> bool {
        self.pairs.iter().all(|(x, y)| x != y)
    }

    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    /// Returns a cycle `e1 -> e2 -> ... -> e1` as the list of events
    /// on it, if there is one.
    pub fn find_cycle(&self) -> Option<Vec<Event>> {
        #[derive(Copy, Clone, PartialEq, Eq)]
        enum Mark {
            Active,
            Done,
        }

        let succs = self.successors();
        let mut marks: BTreeMap<Event, Mark> = BTreeMap::new();

        for root in succs.keys() {
            if marks.contains_key(root) {
                continue;
            }
            // Iterative depth-first search keeping the current path so
            // that a back edge can be turned into a witness.
            let mut path: Vec<(Event, usize)> = vec![(*root, 0)];
            marks.insert(*root, Mark::Active);
            while let Some((ev, next)) = path.last().copied() {
                let children = succs.get(&ev).map(Vec::as_slice).unwrap_or(&[]);
                if next < children.len() {
                    if let Some(top) = path.last_mut() {
                        top.1 += 1
                    }
                    let child = children[next];
                    match marks.get(&child) {
                        Some(Mark::Active) => {
                            let start = path.iter().position(|(e, _)| *e == child).unwrap_or(0);
                            return Some(path[start..].iter().map(|(e, _)| *e).collect());
                        }
                        Some(Mark::Done) => (),
                        None => {
                            marks.insert(child, Mark::Active);
                            path.push((child, 0))
                        }
                    }
                } else {
                    marks.insert(ev, Mark::Done);
                    path.pop();
                }
            }
        }
        None
    }
}

impl FromIterator<(Event, Event)> for Relation {
    fn from_iter<I: IntoIterator<Item = (Event, Event)>>(iter: I) -> Self {
        Relation { pairs: iter.into_iter().collect() }
    }
}

impl IntoIterator for Relation {
    type Item = (Event, Event);
    type IntoIter = btree_set::IntoIter<(Event, Event)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (x, y) in &self.pairs {
            if !first {
                write!(f, ", ")?
            }
            write!(f, "({}, {})", x, y)?;
            first = false
        }
        write!(f, "}}")
    }
}
