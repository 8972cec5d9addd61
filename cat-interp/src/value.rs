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

//! The runtime values of the cat language.
//!
//! Values are cheap to clone: the potentially large collections
//! (relations, event sets, and sets of values) are reference counted,
//! and are never mutated once they have been built.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::ast::{FunDef, Ins, Pat};
use crate::context::ExecutionContext;
use crate::env::Env;
use crate::error::{CompError, PrimError};
use crate::events::{Event, EventSet, Relation};

/// The types of values. `Empty` and `Universe` are the types of the
/// polymorphic constants before context has determined their type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ty {
    Empty,
    Universe,
    Event,
    Pair,
    Rel,
    Set,
    Tag(String),
    ValSet(Box<Ty>),
    Tuple(Vec<Ty>),
    Clo,
    Proc,
    Prim,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Ty::*;
        match self {
            Empty => write!(f, "empty"),
            Universe => write!(f, "universe"),
            Event => write!(f, "event"),
            Pair => write!(f, "pair"),
            Rel => write!(f, "relation"),
            Set => write!(f, "set"),
            Tag(name) => write!(f, "{}", name),
            ValSet(ty) => write!(f, "{} set", ty),
            Tuple(tys) => {
                write!(f, "(")?;
                for (i, ty) in tys.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?
                    }
                    write!(f, "{}", ty)?
                }
                write!(f, ")")
            }
            Clo => write!(f, "closure"),
            Proc => write!(f, "procedure"),
            Prim => write!(f, "primitive"),
        }
    }
}

/// A function value. The captured environment contains only the free
/// variables of the body.
#[derive(Debug)]
pub struct Closure {
    pub def: Rc<FunDef>,
    pub env: Env,
    pub group: Option<Rc<RecGroup>>,
}

/// A group of mutually recursive functions defined by one `let rec`.
/// Rather than tying the knot with reference cycles, each call of a
/// member rebuilds its siblings from the shared definitions and the
/// environment captured for the whole group.
#[derive(Debug)]
pub struct RecGroup {
    pub defs: Vec<(String, Rc<FunDef>)>,
    pub env: Env,
}

impl RecGroup {
    pub fn closures(self: &Rc<Self>) -> Vec<(String, Value)> {
        self.defs
            .iter()
            .map(|(name, def)| {
                let clo = Closure { def: def.clone(), env: self.env.clone(), group: Some(self.clone()) };
                (name.clone(), Value::Clo(Rc::new(clo)))
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct Procedure {
    pub name: String,
    pub params: Pat,
    pub body: Rc<Vec<Ins>>,
    pub env: Env,
    pub is_rec: bool,
}

pub type PrimFn = fn(&ExecutionContext, Value) -> Result<Value, PrimError>;

#[derive(Copy, Clone)]
pub struct Primitive {
    pub name: &'static str,
    pub f: PrimFn,
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<primitive {}>", self.name)
    }
}

/// A finite set of values of one element type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValSet {
    ty: Ty,
    elems: BTreeSet<Value>,
}

impl ValSet {
    pub fn new(ty: Ty) -> Self {
        ValSet { ty, elems: BTreeSet::new() }
    }

    /// Build a set from values, checking they all have the same type
    /// as `ty`. An `Empty` element is taken to be the empty value of
    /// the element type.
    pub fn from_values<I>(ty: Ty, values: I) -> Result<Self, CompError>
    where
        I: IntoIterator<Item = Value>,
    {
        match ty {
            Ty::Universe => return Err(CompError::Universe),
            Ty::Clo | Ty::Proc | Ty::Prim => return Err(CompError::Incomparable(ty)),
            _ => (),
        }
        let mut set = ValSet::new(ty);
        for v in values {
            set.insert(v)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, v: Value) -> Result<bool, CompError> {
        let v = match v.ty() {
            Ty::Universe => return Err(CompError::Universe),
            Ty::Empty if self.ty != Ty::Empty => {
                Value::empty_of(&self.ty).ok_or_else(|| CompError::Heterogeneous(Ty::Empty, self.ty.clone()))?
            }
            ty if ty == self.ty => v,
            ty => return Err(CompError::Heterogeneous(self.ty.clone(), ty)),
        };
        Ok(self.elems.insert(v))
    }

    pub fn elem_ty(&self) -> &Ty {
        &self.ty
    }

    pub fn contains(&self, v: &Value) -> bool {
        self.elems.contains(v)
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elems.iter()
    }

    /// Split the set into its first element and the remainder.
    pub fn split_first(&self) -> Option<(Value, ValSet)> {
        let first = self.elems.iter().next()?.clone();
        let mut rest = self.clone();
        rest.elems.remove(&first);
        Some((first, rest))
    }

    fn check_same(&self, other: &ValSet) -> Result<(), CompError> {
        if self.ty == other.ty || self.is_empty() || other.is_empty() {
            Ok(())
        } else {
            Err(CompError::Heterogeneous(self.ty.clone(), other.ty.clone()))
        }
    }

    fn with_elems(&self, other: &ValSet, elems: BTreeSet<Value>) -> ValSet {
        let ty = if self.is_empty() { other.ty.clone() } else { self.ty.clone() };
        ValSet { ty, elems }
    }

    pub fn union(&self, other: &ValSet) -> Result<ValSet, CompError> {
        self.check_same(other)?;
        Ok(self.with_elems(other, self.elems.union(&other.elems).cloned().collect()))
    }

    pub fn inter(&self, other: &ValSet) -> Result<ValSet, CompError> {
        self.check_same(other)?;
        Ok(self.with_elems(other, self.elems.intersection(&other.elems).cloned().collect()))
    }

    pub fn diff(&self, other: &ValSet) -> Result<ValSet, CompError> {
        self.check_same(other)?;
        let elems = self.elems.difference(&other.elems).cloned().collect();
        Ok(ValSet { ty: self.ty.clone(), elems })
    }

    pub fn is_subset(&self, other: &ValSet) -> Result<bool, CompError> {
        self.check_same(other)?;
        Ok(self.elems.is_subset(&other.elems))
    }
}

impl fmt::Display for ValSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.elems.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?
            }
            write!(f, "{}", v)?
        }
        write!(f, "}}")
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Empty,
    Universe,
    Rel(Rc<Relation>),
    Set(Rc<EventSet>),
    ValSet(Rc<ValSet>),
    /// A tag, with the name of its enum type first
    Tag(String, String),
    Event(Event),
    Pair(Event, Event),
    Tuple(Vec<Value>),
    Clo(Rc<Closure>),
    Proc(Rc<Procedure>),
    Prim(Primitive),
}

impl Value {
    pub fn rel(r: Relation) -> Self {
        Value::Rel(Rc::new(r))
    }

    pub fn set(s: EventSet) -> Self {
        Value::Set(Rc::new(s))
    }

    pub fn valset(s: ValSet) -> Self {
        Value::ValSet(Rc::new(s))
    }

    pub fn tag<S: Into<String>, T: Into<String>>(ty: S, name: T) -> Self {
        Value::Tag(ty.into(), name.into())
    }

    pub fn ty(&self) -> Ty {
        use Value::*;
        match self {
            Empty => Ty::Empty,
            Universe => Ty::Universe,
            Rel(_) => Ty::Rel,
            Set(_) => Ty::Set,
            ValSet(s) => Ty::ValSet(Box::new(s.ty.clone())),
            Tag(ty, _) => Ty::Tag(ty.clone()),
            Event(_) => Ty::Event,
            Pair(_, _) => Ty::Pair,
            Tuple(vs) => Ty::Tuple(vs.iter().map(Value::ty).collect()),
            Clo(_) => Ty::Clo,
            Proc(_) => Ty::Proc,
            Prim(_) => Ty::Prim,
        }
    }

    /// The empty value of a collection type.
    pub fn empty_of(ty: &Ty) -> Option<Value> {
        match ty {
            Ty::Rel => Some(Value::rel(Relation::new())),
            Ty::Set => Some(Value::set(EventSet::new())),
            Ty::ValSet(elem) => Some(Value::valset(ValSet::new((**elem).clone()))),
            _ => None,
        }
    }

    pub fn is_fun(&self) -> bool {
        matches!(self, Value::Clo(_) | Value::Prim(_))
    }

    /// Compare two values the way set construction does. `Empty` is
    /// equal to any empty collection, and the universe cannot be
    /// compared with anything.
    pub fn compare(&self, other: &Value) -> Result<Ordering, CompError> {
        use Value::*;
        match (self, other) {
            (Universe, _) | (_, Universe) => Err(CompError::Universe),
            (Empty, Empty) => Ok(Ordering::Equal),
            (Empty, v) => match v.collection_is_empty() {
                Some(true) => Ok(Ordering::Equal),
                Some(false) => Ok(Ordering::Less),
                None => Err(CompError::Heterogeneous(Ty::Empty, v.ty())),
            },
            (v, Empty) => Empty.compare(v).map(Ordering::reverse),
            (Rel(r1), Rel(r2)) => Ok(r1.cmp(r2)),
            (Set(s1), Set(s2)) => Ok(s1.cmp(s2)),
            (ValSet(s1), ValSet(s2)) => {
                s1.check_same(s2)?;
                Ok(s1.elems.cmp(&s2.elems))
            }
            (Tag(_, t1), Tag(_, t2)) => Ok(t1.cmp(t2)),
            (Event(ev1), Event(ev2)) => Ok(ev1.cmp(ev2)),
            (Pair(a1, b1), Pair(a2, b2)) => Ok((a1, b1).cmp(&(a2, b2))),
            (Tuple(vs1), Tuple(vs2)) if vs1.len() == vs2.len() => {
                for (v1, v2) in vs1.iter().zip(vs2.iter()) {
                    match v1.compare(v2)? {
                        Ordering::Equal => (),
                        ord => return Ok(ord),
                    }
                }
                Ok(Ordering::Equal)
            }
            (Clo(_), _) | (Proc(_), _) | (Prim(_), _) => Err(CompError::Incomparable(self.ty())),
            (_, Clo(_)) | (_, Proc(_)) | (_, Prim(_)) => Err(CompError::Incomparable(other.ty())),
            _ => Err(CompError::Heterogeneous(self.ty(), other.ty())),
        }
    }

    fn collection_is_empty(&self) -> Option<bool> {
        match self {
            Value::Rel(r) => Some(r.is_empty()),
            Value::Set(s) => Some(s.is_empty()),
            Value::ValSet(s) => Some(s.is_empty()),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        use Value::*;
        match self {
            Empty => 0,
            Universe => 1,
            Rel(_) => 2,
            Set(_) => 3,
            ValSet(_) => 4,
            Tag(_, _) => 5,
            Event(_) => 6,
            Pair(_, _) => 7,
            Tuple(_) => 8,
            Clo(_) => 9,
            Proc(_) => 10,
            Prim(_) => 11,
        }
    }
}

// The total order used inside ValSet. Sets only ever hold values of a
// single type with no Empty or Universe members, where this agrees
// with `Value::compare`.
impl Ord for Value {
    fn cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Rel(r1), Rel(r2)) => r1.cmp(r2),
            (Set(s1), Set(s2)) => s1.cmp(s2),
            (ValSet(s1), ValSet(s2)) => s1.elems.cmp(&s2.elems),
            (Tag(_, t1), Tag(_, t2)) => t1.cmp(t2),
            (Event(ev1), Event(ev2)) => ev1.cmp(ev2),
            (Pair(a1, b1), Pair(a2, b2)) => (a1, b1).cmp(&(a2, b2)),
            (Tuple(vs1), Tuple(vs2)) => vs1.cmp(vs2),
            (Clo(c1), Clo(c2)) => Rc::as_ptr(c1).cmp(&Rc::as_ptr(c2)),
            (Proc(p1), Proc(p2)) => Rc::as_ptr(p1).cmp(&Rc::as_ptr(p2)),
            (Prim(p1), Prim(p2)) => p1.name.cmp(p2.name),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Value::*;
        match self {
            Empty => write!(f, "0"),
            Universe => write!(f, "_"),
            Rel(r) => write!(f, "{}", r),
            Set(s) => write!(f, "{}", s),
            ValSet(s) => write!(f, "{}", s),
            Tag(_, t) => write!(f, "'{}", t),
            Event(ev) => write!(f, "{}", ev),
            Pair(ev1, ev2) => write!(f, "({}, {})", ev1, ev2),
            Tuple(vs) => {
                write!(f, "(")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?
                    }
                    write!(f, "{}", v)?
                }
                write!(f, ")")
            }
            Clo(clo) => write!(f, "<fun {}>", clo.def.name),
            Proc(proc) => write!(f, "<procedure {}>", proc.name),
            Prim(prim) => write!(f, "<primitive {}>", prim.name),
        }
    }
}
