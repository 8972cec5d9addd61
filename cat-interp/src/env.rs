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

use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Exp;
use crate::value::Value;

/// A lazily evaluated binding. The expression is evaluated by the
/// interpreter the first time the binding is read, and the result is
/// cached for every later read.
#[derive(Clone)]
pub struct Thunk(Rc<ThunkInner>);

struct ThunkInner {
    value: OnceCell<Value>,
    deferred: Option<(Env, Rc<Exp>)>,
}

impl Thunk {
    pub fn forced(v: Value) -> Self {
        let value = OnceCell::new();
        let _ = value.set(v);
        Thunk(Rc::new(ThunkInner { value, deferred: None }))
    }

    pub fn deferred(env: Env, exp: Rc<Exp>) -> Self {
        Thunk(Rc::new(ThunkInner { value: OnceCell::new(), deferred: Some((env, exp)) }))
    }

    pub fn get(&self) -> Option<&Value> {
        self.0.value.get()
    }

    /// The environment and expression still to be evaluated, if the
    /// thunk has not been forced.
    pub fn pending(&self) -> Option<(&Env, &Rc<Exp>)> {
        if self.0.value.get().is_some() {
            None
        } else {
            self.0.deferred.as_ref().map(|(env, exp)| (env, exp))
        }
    }

    /// As [`Thunk::pending`], but taking the silence of the environment
    /// that reads the thunk rather than the one that defined it.
    pub fn pending_in(&self, caller: &Env) -> Option<(Env, &Rc<Exp>)> {
        self.pending().map(|(env, exp)| (env.with_silent(caller.is_silent()), exp))
    }

    pub fn set(&self, v: Value) {
        let _ = self.0.value.set(v);
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "<thunk>"),
        }
    }
}

type Map<V> = HashMap<String, V, ahash::RandomState>;

/// The interpreter environment. Extending an environment never
/// affects copies of it that were taken earlier, so closures and
/// deferred bindings can hold onto snapshots freely.
#[derive(Clone, Default)]
pub struct Env {
    vals: Rc<Map<Thunk>>,
    enums: Rc<Map<Rc<Vec<String>>>>,
    tags: Rc<Map<String>>,
    silent: bool,
}

impl Env {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Thunk> {
        self.vals.get(name)
    }

    pub fn bind<S: Into<String>>(&mut self, name: S, v: Value) {
        self.bind_thunk(name, Thunk::forced(v))
    }

    pub fn bind_thunk<S: Into<String>>(&mut self, name: S, thunk: Thunk) {
        Rc::make_mut(&mut self.vals).insert(name.into(), thunk);
    }

    pub fn bind_lazy<S: Into<String>>(&mut self, name: S, env: Env, exp: Rc<Exp>) {
        self.bind_thunk(name, Thunk::deferred(env, exp))
    }

    pub fn add_enum<S: Into<String>>(&mut self, name: S, tags: Vec<String>) {
        let name = name.into();
        let tag_map = Rc::make_mut(&mut self.tags);
        for tag in &tags {
            tag_map.insert(tag.clone(), name.clone());
        }
        Rc::make_mut(&mut self.enums).insert(name, Rc::new(tags));
    }

    /// The tags of an enum type, in declaration order.
    pub fn enum_tags(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(|tags| tags.as_slice())
    }

    /// The enum type a tag belongs to.
    pub fn tag_enum(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn with_silent(&self, silent: bool) -> Self {
        let mut env = self.clone();
        env.silent = silent;
        env
    }

    /// A copy of the environment holding only the given variables,
    /// plus all the enum declarations. Names that are not bound are
    /// ignored.
    pub fn restrict<'a, I>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut vals = Map::default();
        for name in names {
            if let Some(thunk) = self.vals.get(name) {
                vals.insert(name.clone(), thunk.clone());
            }
        }
        Env { vals: Rc::new(vals), enums: self.enums.clone(), tags: self.tags.clone(), silent: self.silent }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&String> = self.vals.keys().collect();
        names.sort();
        f.debug_struct("Env").field("vals", &names).field("silent", &self.silent).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::var;
    use crate::events::{Event, Relation};

    fn po() -> Value {
        Value::rel(Relation::singleton(Event::new(1), Event::new(2)))
    }

    #[test]
    fn test_extension_is_copy_on_write() {
        let mut env1 = Env::new();
        env1.bind("po", po());
        let mut env2 = env1.clone();
        env2.bind("po", Value::Empty);
        env2.bind("rf", Value::Empty);
        assert_eq!(env1.lookup("po").and_then(Thunk::get), Some(&po()));
        assert!(env1.lookup("rf").is_none());
        assert_eq!(env2.lookup("po").and_then(Thunk::get), Some(&Value::Empty))
    }

    #[test]
    fn test_thunk_memoizes() {
        let thunk = Thunk::deferred(Env::new(), Rc::new(var("po")));
        assert!(thunk.pending().is_some());
        thunk.set(po());
        assert!(thunk.pending().is_none());
        thunk.set(Value::Empty);
        assert_eq!(thunk.get(), Some(&po()))
    }

    #[test]
    fn test_thunk_forced_with_reader_silence() {
        let thunk = Thunk::deferred(Env::new(), Rc::new(var("po")));
        let (env, _) = thunk.pending_in(&Env::new().with_silent(true)).unwrap();
        assert!(env.is_silent());
        let (env, _) = thunk.pending_in(&Env::new()).unwrap();
        assert!(!env.is_silent());
        thunk.set(po());
        assert!(thunk.pending_in(&Env::new()).is_none())
    }

    #[test]
    fn test_enums() {
        let mut env = Env::new();
        env.add_enum("scope", vec!["wi".to_string(), "wg".to_string()]);
        assert_eq!(env.tag_enum("wg"), Some("scope"));
        assert_eq!(env.enum_tags("scope"), Some(&["wi".to_string(), "wg".to_string()][..]));
        let restricted = env.restrict(&[]);
        assert_eq!(restricted.tag_enum("wi"), Some("scope"))
    }

    #[test]
    fn test_restrict() {
        let mut env = Env::new();
        env.bind("po", po());
        env.bind("rf", Value::Empty);
        let env = env.restrict(&["po".to_string(), "co".to_string()]);
        assert!(env.lookup("po").is_some());
        assert!(env.lookup("rf").is_none());
        assert!(env.lookup("co").is_none())
    }
}
