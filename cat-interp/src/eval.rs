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

//! The expression evaluator.
//!
//! Evaluation is a pure function of an environment and the execution
//! context. Operators are polymorphic over relations, event sets and
//! sets of values, and over the `Empty` and `Universe` constants whose
//! type is only known once they meet a concrete value.

use std::rc::Rc;

use crate::ast::{self, Binding, Cond, Exp, FunDef, Op, Op1, Pat};
use crate::bell::Mode;
use crate::config::InterpConfig;
use crate::context::ExecutionContext;
use crate::env::{Env, Thunk};
use crate::error::{CompError, Error};
use crate::events::{EventSet, Relation};
use crate::log;
use crate::source_loc::SourceLoc;
use crate::value::{Closure, Ty, ValSet, Value};

pub type EvalResult = Result<Value, Error>;

pub struct Eval<'a> {
    pub ctx: &'a ExecutionContext,
    pub config: &'a InterpConfig,
    pub mode: Mode,
}

impl<'a> Eval<'a> {
    pub fn new(ctx: &'a ExecutionContext, config: &'a InterpConfig, mode: Mode) -> Self {
        Eval { ctx, config, mode }
    }

    /// Fail silently. The failure is reported unless we are evaluating
    /// speculatively under a `try`.
    pub fn abort<A, S: Into<String>>(&self, env: &Env, loc: SourceLoc, msg: S) -> Result<A, Error> {
        let msg = msg.into();
        if !env.is_silent() {
            report!(format!("{}: {}", loc, msg))
        }
        Err(Error::abort(loc, msg))
    }

    pub fn user_error<A, S: Into<String>>(&self, loc: SourceLoc, msg: S) -> Result<A, Error> {
        let msg = msg.into();
        report!(format!("{}: {}", loc, msg));
        Err(Error::user(loc, msg))
    }

    /// Force a thunk. Deferred bindings are evaluated in the
    /// environment they were defined in, but take their silence from
    /// the environment reading them.
    pub fn force(&self, caller: &Env, thunk: &Thunk) -> EvalResult {
        if let Some(v) = thunk.get() {
            return Ok(v.clone());
        }
        match thunk.pending_in(caller) {
            Some((env, exp)) => {
                let v = self.eval(&env, exp)?;
                thunk.set(v.clone());
                Ok(v)
            }
            None => Ok(Value::Empty),
        }
    }

    pub fn lookup(&self, env: &Env, loc: SourceLoc, name: &str) -> EvalResult {
        match env.lookup(name) {
            Some(thunk) => self.force(env, thunk),
            None => self.user_error(loc, format!("unbound var: {}", name)),
        }
    }

    /// A closure captures only the free variables of its body.
    pub fn closure(&self, env: &Env, def: &Rc<FunDef>) -> Value {
        Value::Clo(Rc::new(Closure { def: def.clone(), env: env.restrict(&def.free), group: None }))
    }

    /// The set of all tags of an enum type.
    pub fn enum_universe(&self, env: &Env, loc: SourceLoc, ty: &Ty) -> Result<ValSet, Error> {
        match ty {
            Ty::Tag(name) => match env.enum_tags(name) {
                Some(tags) => ValSet::from_values(ty.clone(), tags.iter().map(|t| Value::tag(name.clone(), t.clone())))
                    .map_err(|e| Error::comp(loc, e)),
                None => self.user_error(loc, format!("undefined enum type {}", name)),
            },
            _ => self.abort(env, loc, format!("no universe for type {}", ty)),
        }
    }

    /// Event sets are what `Empty` and `Universe` become in a context
    /// that expects a set of events.
    pub fn event_set_of(&self, v: &Value) -> Option<Rc<EventSet>> {
        match v {
            Value::Set(s) => Some(s.clone()),
            Value::Empty => Some(Rc::new(EventSet::new())),
            Value::Universe => Some(Rc::new(self.ctx.events().clone())),
            _ => None,
        }
    }

    pub fn relation_of(&self, v: &Value) -> Option<Rc<Relation>> {
        match v {
            Value::Rel(r) => Some(r.clone()),
            Value::Empty => Some(Rc::new(Relation::new())),
            Value::Universe => Some(Rc::new(self.ctx.unv().clone())),
            _ => None,
        }
    }

    fn promote(&self, loc: SourceLoc, v: Value) -> EvalResult {
        match v {
            Value::Tag(ref ty, _) => {
                let ty = Ty::Tag(ty.clone());
                ValSet::from_values(ty, vec![v]).map(Value::valset).map_err(|e| Error::comp(loc, e))
            }
            v => Ok(v),
        }
    }

    fn mixing<A>(&self, env: &Env, loc: SourceLoc, v1: &Value, v2: &Value, op: &str) -> Result<A, Error> {
        use Value::*;
        match (v1, v2) {
            (Rel(_), Set(_)) | (Set(_), Rel(_)) | (Rel(_), ValSet(_)) | (ValSet(_), Rel(_)) => {
                self.user_error(loc, "mixing relations and sets")
            }
            (Set(_), ValSet(_)) | (ValSet(_), Set(_)) => self.user_error(loc, "mixing event sets and typed sets"),
            _ => self.abort(env, loc, format!("cannot {} values of type {} and {}", op, v1.ty(), v2.ty())),
        }
    }

    fn union2(&self, env: &Env, loc: SourceLoc, v1: Value, v2: Value) -> EvalResult {
        use Value::*;
        match (&v1, &v2) {
            (Rel(r1), Rel(r2)) => Ok(Value::rel(r1.union(r2))),
            (Set(s1), Set(s2)) => Ok(Value::set(s1.union(s2))),
            (ValSet(s1), ValSet(s2)) => s1.union(s2).map(Value::valset).map_err(|e| Error::comp(loc, e)),
            _ => self.mixing(env, loc, &v1, &v2, "union"),
        }
    }

    /// N-ary union. Any universe operand makes the result the
    /// universe, and empty operands are ignored.
    pub fn union(&self, env: &Env, loc: SourceLoc, vs: Vec<Value>) -> EvalResult {
        if vs.iter().any(|v| matches!(v, Value::Universe)) {
            return Ok(Value::Universe);
        }
        let mut acc: Option<Value> = None;
        for v in vs.into_iter().filter(|v| !matches!(v, Value::Empty)) {
            let v = self.promote(loc, v)?;
            acc = Some(match acc {
                None => match v {
                    Value::Rel(_) | Value::Set(_) | Value::ValSet(_) => v,
                    _ => return self.abort(env, loc, format!("cannot union values of type {}", v.ty())),
                },
                Some(acc) => self.union2(env, loc, acc, v)?,
            })
        }
        Ok(acc.unwrap_or(Value::Empty))
    }

    pub fn inter(&self, env: &Env, loc: SourceLoc, v1: Value, v2: Value) -> EvalResult {
        use Value::*;
        let v1 = self.promote(loc, v1)?;
        let v2 = self.promote(loc, v2)?;
        match (&v1, &v2) {
            (Empty, _) | (_, Empty) => Ok(Empty),
            (Universe, _) => Ok(v2),
            (_, Universe) => Ok(v1),
            (Rel(r1), Rel(r2)) => Ok(Value::rel(r1.inter(r2))),
            (Set(s1), Set(s2)) => Ok(Value::set(s1.inter(s2))),
            (ValSet(s1), ValSet(s2)) => s1.inter(s2).map(Value::valset).map_err(|e| Error::comp(loc, e)),
            _ => self.mixing(env, loc, &v1, &v2, "intersect"),
        }
    }

    pub fn diff(&self, env: &Env, loc: SourceLoc, v1: Value, v2: Value) -> EvalResult {
        use Value::*;
        let v1 = self.promote(loc, v1)?;
        let v2 = self.promote(loc, v2)?;
        match (&v1, &v2) {
            (Empty, _) => Ok(Empty),
            (_, Empty) => Ok(v1),
            (_, Universe) => Ok(Empty),
            (Universe, Rel(r)) => Ok(Value::rel(self.ctx.unv().diff(r))),
            (Universe, Set(s)) => Ok(Value::set(self.ctx.events().diff(s))),
            (Universe, ValSet(s)) => {
                let unv = self.enum_universe(env, loc, s.elem_ty())?;
                unv.diff(s).map(Value::valset).map_err(|e| Error::comp(loc, e))
            }
            (Rel(r1), Rel(r2)) => Ok(Value::rel(r1.diff(r2))),
            (Set(s1), Set(s2)) => Ok(Value::set(s1.diff(s2))),
            (ValSet(s1), ValSet(s2)) => s1.diff(s2).map(Value::valset).map_err(|e| Error::comp(loc, e)),
            _ => self.mixing(env, loc, &v1, &v2, "take the difference of"),
        }
    }

    /// Relational composition. Any empty operand makes the whole
    /// sequence empty.
    pub fn seq(&self, env: &Env, loc: SourceLoc, vs: Vec<Value>) -> EvalResult {
        if vs.is_empty() || vs.iter().any(|v| matches!(v, Value::Empty)) {
            return Ok(Value::Empty);
        }
        let mut acc: Option<Rc<Relation>> = None;
        for v in &vs {
            let r = match self.relation_of(v) {
                Some(r) => r,
                None => return self.abort(env, loc, format!("sequence of non-relation of type {}", v.ty())),
            };
            acc = Some(match acc {
                None => r,
                Some(acc) => Rc::new(acc.seq(&r)),
            })
        }
        Ok(acc.map(Value::Rel).unwrap_or(Value::Empty))
    }

    pub fn cartesian(&self, env: &Env, loc: SourceLoc, v1: Value, v2: Value) -> EvalResult {
        match (self.event_set_of(&v1), self.event_set_of(&v2)) {
            (Some(xs), Some(ys)) => Ok(Value::rel(Relation::cartesian(&xs, &ys))),
            _ => self.abort(env, loc, format!("cartesian product of types {} and {}", v1.ty(), v2.ty())),
        }
    }

    /// Set insertion `x ++ s`.
    pub fn add(&self, env: &Env, loc: SourceLoc, x: Value, s: Value) -> EvalResult {
        use Value::*;
        let s = self.promote(loc, s)?;
        match (x, s) {
            (_, Universe) => Ok(Universe),
            (Universe, _) => self.abort(env, loc, "universe in set ++"),
            (Event(ev), Empty) => Ok(Value::set(EventSet::singleton(ev))),
            (Event(ev), Set(s)) => {
                let mut s = (*s).clone();
                s.insert(ev);
                Ok(Value::set(s))
            }
            (Pair(ev1, ev2), Empty) => Ok(Value::rel(Relation::singleton(ev1, ev2))),
            (Pair(ev1, ev2), Rel(r)) => {
                let mut r = (*r).clone();
                r.insert(ev1, ev2);
                Ok(Value::rel(r))
            }
            (x, Empty) => crate::value::ValSet::from_values(x.ty(), vec![x])
                .map(Value::valset)
                .map_err(|e| Error::comp(loc, e)),
            (x, ValSet(s)) => {
                let mut s = (*s).clone();
                s.insert(x).map_err(|e| Error::comp(loc, e))?;
                Ok(Value::valset(s))
            }
            (x, s) => self.abort(env, loc, format!("cannot add value of type {} to type {}", x.ty(), s.ty())),
        }
    }

    pub fn eval_op1(&self, env: &Env, loc: SourceLoc, op: Op1, v: Value) -> EvalResult {
        use Value::*;
        match (op, v) {
            (Op1::Plus, Empty) => Ok(Empty),
            (Op1::Star, Empty) | (Op1::Opt, Empty) => Ok(Value::rel(self.ctx.id().clone())),
            (Op1::Plus, Universe) | (Op1::Star, Universe) | (Op1::Opt, Universe) => Ok(Universe),
            (Op1::Plus, Rel(r)) => Ok(Value::rel(r.transitive_closure())),
            (Op1::Star, Rel(r)) => Ok(Value::rel(r.reflexive_transitive_closure(self.ctx.events()))),
            (Op1::Opt, Rel(r)) => Ok(Value::rel(r.union(self.ctx.id()))),

            (Op1::Comp, Empty) => Ok(Universe),
            (Op1::Comp, Universe) => Ok(Empty),
            (Op1::Comp, Rel(r)) => Ok(Value::rel(self.ctx.unv().diff(&r))),
            (Op1::Comp, Set(s)) => Ok(Value::set(self.ctx.events().diff(&s))),
            (Op1::Comp, v @ Tag(_, _)) => {
                let v = self.promote(loc, v)?;
                self.eval_op1(env, loc, op, v)
            }
            (Op1::Comp, ValSet(s)) => {
                let unv = self.enum_universe(env, loc, s.elem_ty())?;
                unv.diff(&s).map(Value::valset).map_err(|e| Error::comp(loc, e))
            }

            (Op1::Inv, Empty) => Ok(Empty),
            (Op1::Inv, Universe) => Ok(Universe),
            (Op1::Inv, Rel(r)) => Ok(Value::rel(r.inverse())),

            (Op1::ToId, Empty) => Ok(Empty),
            (Op1::ToId, Universe) => Ok(Value::rel(self.ctx.id().clone())),
            (Op1::ToId, Set(s)) => Ok(Value::rel(Relation::identity(&s))),

            (op, v) => self.abort(env, loc, format!("operator {:?} cannot be applied to type {}", op, v.ty())),
        }
    }

    fn binary(&self, env: &Env, loc: SourceLoc, vs: Vec<Value>) -> Result<(Value, Value), Error> {
        let mut vs = vs.into_iter();
        match (vs.next(), vs.next(), vs.next()) {
            (Some(v1), Some(v2), None) => Ok((v1, v2)),
            _ => self.abort(env, loc, "binary operator applied to wrong number of arguments"),
        }
    }

    pub fn eval_op(&self, env: &Env, loc: SourceLoc, op: Op, vs: Vec<Value>) -> EvalResult {
        match op {
            Op::Union => self.union(env, loc, vs),
            Op::Seq => self.seq(env, loc, vs),
            Op::Tuple => Ok(Value::Tuple(vs)),
            Op::Inter | Op::Diff if vs.len() > 2 => {
                let mut vs = vs.into_iter();
                let mut acc = vs.next().unwrap_or(Value::Empty);
                for v in vs {
                    acc = if op == Op::Inter { self.inter(env, loc, acc, v)? } else { self.diff(env, loc, acc, v)? }
                }
                Ok(acc)
            }
            Op::Inter => {
                let (v1, v2) = self.binary(env, loc, vs)?;
                self.inter(env, loc, v1, v2)
            }
            Op::Diff => {
                let (v1, v2) = self.binary(env, loc, vs)?;
                self.diff(env, loc, v1, v2)
            }
            Op::Cartesian => {
                let (v1, v2) = self.binary(env, loc, vs)?;
                self.cartesian(env, loc, v1, v2)
            }
            Op::Add => {
                let (v1, v2) = self.binary(env, loc, vs)?;
                self.add(env, loc, v1, v2)
            }
        }
    }

    fn eval_list(&self, env: &Env, exps: &[Exp]) -> Result<Vec<Value>, Error> {
        exps.iter().map(|exp| self.eval(env, exp)).collect()
    }

    /// `r & (xs * ys)` only keeps the pairs of `r` with their ends in
    /// `xs` and `ys`, so there is no need to build the product.
    fn eval_inter(&self, env: &Env, loc: SourceLoc, exps: &[Exp]) -> EvalResult {
        let v1 = self.eval(env, &exps[0])?;
        if let (Value::Rel(r), Exp::Op(_, Op::Cartesian, factors)) = (&v1, &exps[1]) {
            if factors.len() == 2 {
                let xs = self.eval(env, &factors[0])?;
                let ys = self.eval(env, &factors[1])?;
                if let (Some(xs), Some(ys)) = (self.event_set_of(&xs), self.event_set_of(&ys)) {
                    return Ok(Value::rel(r.restrict(&xs, &ys)));
                }
                let v2 = self.cartesian(env, loc, xs, ys)?;
                return self.inter(env, loc, v1, v2);
            }
        }
        let v2 = self.eval(env, &exps[1])?;
        self.inter(env, loc, v1, v2)
    }

    fn explicit_set(&self, env: &Env, loc: SourceLoc, vs: Vec<Value>) -> EvalResult {
        if vs.is_empty() {
            return Ok(Value::Empty);
        }
        if vs.iter().any(|v| matches!(v, Value::Universe)) {
            return self.abort(env, loc, "universe in explicit set");
        }
        let ty = vs.iter().map(Value::ty).find(|ty| *ty != Ty::Empty).unwrap_or(Ty::Empty);
        match ty {
            Ty::Event => {
                let mut events = EventSet::new();
                for v in vs {
                    match v {
                        Value::Event(ev) => {
                            events.insert(ev);
                        }
                        v => return Err(Error::comp(loc, CompError::Heterogeneous(Ty::Event, v.ty()))),
                    }
                }
                Ok(Value::set(events))
            }
            Ty::Pair => {
                let mut pairs = Relation::new();
                for v in vs {
                    match v {
                        Value::Pair(ev1, ev2) => {
                            pairs.insert(ev1, ev2);
                        }
                        v => return Err(Error::comp(loc, CompError::Heterogeneous(Ty::Pair, v.ty()))),
                    }
                }
                Ok(Value::rel(pairs))
            }
            ty => ValSet::from_values(ty, vs).map(Value::valset).map_err(|e| Error::comp(loc, e)),
        }
    }

    pub fn bind_pat(&self, env: &mut Env, loc: SourceLoc, pat: &Pat, v: Value) -> Result<(), Error> {
        match pat {
            Pat::Var(x) => {
                env.bind(x.clone(), v);
                Ok(())
            }
            Pat::Tuple(xs) if xs.len() == 1 => {
                env.bind(xs[0].clone(), v);
                Ok(())
            }
            Pat::Tuple(xs) => match v {
                Value::Tuple(vs) if vs.len() == xs.len() => {
                    for (x, v) in xs.iter().zip(vs.into_iter()) {
                        env.bind(x.clone(), v)
                    }
                    Ok(())
                }
                v => self.abort(env, loc, format!("argument mismatch: expected a {}-tuple, got {}", xs.len(), v.ty())),
            },
        }
    }

    /// Non-recursive simultaneous bindings. Right hand sides are
    /// evaluated in `env` on demand.
    pub fn bind_bindings(&self, env: &Env, bindings: &[Binding]) -> Result<Env, Error> {
        let mut new_env = env.clone();
        for binding in bindings {
            match (&binding.pat, &*binding.exp) {
                (Pat::Var(x), Exp::Fun(def)) => new_env.bind(x.clone(), self.closure(env, def)),
                (Pat::Var(x), _) => new_env.bind_lazy(x.clone(), env.clone(), binding.exp.clone()),
                (pat, _) => {
                    let v = self.eval(env, &binding.exp)?;
                    self.bind_pat(&mut new_env, binding.loc, pat, v)?
                }
            }
        }
        Ok(new_env)
    }

    pub fn apply(&self, env: &Env, loc: SourceLoc, f: Value, arg: Value) -> EvalResult {
        match f {
            Value::Clo(clo) => {
                let mut call_env = clo.env.with_silent(env.is_silent());
                if let Some(group) = &clo.group {
                    for (name, v) in group.closures() {
                        call_env.bind(name, v)
                    }
                }
                self.bind_pat(&mut call_env, loc, &clo.def.params, arg)?;
                match self.eval(&call_env, &clo.def.body) {
                    Err(err) if err.is_abort() && !env.is_silent() => {
                        report!(format!("{}: calling {} failed", loc, clo.def.name));
                        Err(err)
                    }
                    result => result,
                }
            }
            Value::Prim(prim) => (prim.f)(self.ctx, arg).or_else(|e| {
                let err = Error::prim(loc, prim.name, e);
                if !env.is_silent() {
                    report!(err)
                }
                Err(err)
            }),
            f => self.abort(env, loc, format!("cannot apply value of type {}", f.ty())),
        }
    }

    pub fn subset(&self, env: &Env, loc: SourceLoc, v1: &Value, v2: &Value) -> Result<bool, Error> {
        use Value::*;
        match (v1, v2) {
            (Empty, _) | (_, Universe) => Ok(true),
            (Universe, v) => {
                let unv = match v {
                    Rel(_) => Value::rel(self.ctx.unv().clone()),
                    Set(_) => Value::set(self.ctx.events().clone()),
                    ValSet(s) => Value::valset(self.enum_universe(env, loc, s.elem_ty())?),
                    Empty => return Ok(false),
                    v => return self.abort(env, loc, format!("cannot compare the universe with type {}", v.ty())),
                };
                self.subset(env, loc, &unv, v)
            }
            (Rel(r1), Rel(r2)) => Ok(r1.is_subset(r2)),
            (Set(s1), Set(s2)) => Ok(s1.is_subset(s2)),
            (ValSet(s1), ValSet(s2)) => s1.is_subset(s2).map_err(|e| Error::comp(loc, e)),
            (Rel(r), Empty) => Ok(r.is_empty()),
            (Set(s), Empty) => Ok(s.is_empty()),
            (ValSet(s), Empty) => Ok(s.is_empty()),
            _ => self.mixing(env, loc, v1, v2, "compare"),
        }
    }

    fn member(&self, env: &Env, loc: SourceLoc, x: &Value, s: &Value) -> Result<bool, Error> {
        use Value::*;
        match (x, s) {
            (_, Empty) => Ok(false),
            (_, Universe) => Ok(true),
            (Event(ev), Set(s)) => Ok(s.contains(*ev)),
            (Pair(ev1, ev2), Rel(r)) => Ok(r.contains(*ev1, *ev2)),
            (x, ValSet(s)) => {
                if !s.is_empty() && x.ty() != *s.elem_ty() {
                    return Err(Error::comp(loc, CompError::Heterogeneous(x.ty(), s.elem_ty().clone())));
                }
                Ok(s.contains(x))
            }
            (x, Tag(_, _)) => {
                let s = self.promote(loc, s.clone())?;
                self.member(env, loc, x, &s)
            }
            (x, s) => self.abort(env, loc, format!("membership of type {} in type {}", x.ty(), s.ty())),
        }
    }

    pub fn eval_cond(&self, env: &Env, loc: SourceLoc, cond: &Cond) -> Result<bool, Error> {
        match cond {
            Cond::Variant(name) => Ok(self.config.variant(name)),
            Cond::Eq(exp1, exp2) => {
                let v1 = self.eval(env, exp1)?;
                let v2 = self.eval(env, exp2)?;
                match v1.compare(&v2) {
                    Ok(ord) => Ok(ord == std::cmp::Ordering::Equal),
                    Err(CompError::Universe) => self.subset(env, loc, &v1, &v2).and_then(|sub| {
                        if sub {
                            self.subset(env, loc, &v2, &v1)
                        } else {
                            Ok(false)
                        }
                    }),
                    Err(e) => Err(Error::comp(loc, e)),
                }
            }
            Cond::Subset(exp1, exp2) => {
                let v1 = self.eval(env, exp1)?;
                let v2 = self.eval(env, exp2)?;
                self.subset(env, loc, &v1, &v2)
            }
            Cond::In(exp1, exp2) => {
                let v1 = self.eval(env, exp1)?;
                let v2 = self.eval(env, exp2)?;
                self.member(env, loc, &v1, &v2)
            }
        }
    }

    fn match_set(&self, env: &Env, loc: SourceLoc, v: Value, empty: &Exp, x: &str, xs: &str, body: &Exp) -> EvalResult {
        let split = match self.promote(loc, v)? {
            Value::Empty => None,
            Value::Universe => return self.abort(env, loc, "cannot match the universe"),
            Value::ValSet(s) => s.split_first().map(|(y, ys)| (y, Value::valset(ys))),
            Value::Set(s) => s.first().map(|ev| {
                let mut rest = (*s).clone();
                rest.remove(ev);
                (Value::Event(ev), Value::set(rest))
            }),
            Value::Rel(r) => r.first().map(|(ev1, ev2)| {
                let mut rest = (*r).clone();
                rest.remove(ev1, ev2);
                (Value::Pair(ev1, ev2), Value::rel(rest))
            }),
            v => return self.abort(env, loc, format!("set matching on value of type {}", v.ty())),
        };
        match split {
            None => self.eval(env, empty),
            Some((y, ys)) => {
                let mut env = env.clone();
                env.bind(x, y);
                env.bind(xs, ys);
                self.eval(&env, body)
            }
        }
    }

    pub fn eval(&self, env: &Env, exp: &Exp) -> EvalResult {
        use Exp::*;
        match exp {
            Konst(_, ast::Konst::Empty) => Ok(Value::Empty),
            Konst(_, ast::Konst::Universe) => Ok(Value::Universe),

            Tag(loc, t) => match env.tag_enum(t) {
                Some(ty) => Ok(Value::tag(ty, t.clone())),
                None => self.user_error(*loc, format!("tag '{} is undefined", t)),
            },

            Var(loc, x) => self.lookup(env, *loc, x),

            Op1(loc, op, exp) => {
                let v = self.eval(env, exp)?;
                self.eval_op1(env, *loc, *op, v)
            }

            Op(loc, ast::Op::Inter, exps) if exps.len() == 2 => self.eval_inter(env, *loc, exps),

            Op(loc, op, exps) => {
                let vs = self.eval_list(env, exps)?;
                self.eval_op(env, *loc, *op, vs)
            }

            App(loc, f, arg) => {
                let f = self.eval(env, f)?;
                let arg = self.eval(env, arg)?;
                self.apply(env, *loc, f, arg)
            }

            Bind(_, bindings, body) => {
                let env = self.bind_bindings(env, bindings)?;
                self.eval(&env, body)
            }

            BindRec(loc, bindings, body) => {
                let env = self.env_rec(env, *loc, bindings)?;
                self.eval(&env, body)
            }

            Fun(def) => Ok(self.closure(env, def)),

            ExplicitSet(loc, exps) => {
                let vs = self.eval_list(env, exps)?;
                self.explicit_set(env, *loc, vs)
            }

            Match(loc, exp, cases, default) => match self.eval(env, exp)? {
                Value::Tag(_, t) => match cases.iter().find(|(case, _)| *case == t) {
                    Some((_, body)) => self.eval(env, body),
                    None => match default {
                        Some(body) => self.eval(env, body),
                        None => self.abort(env, *loc, format!("pattern matching failed on '{}", t)),
                    },
                },
                v => self.abort(env, *loc, format!("match on non-tag value of type {}", v.ty())),
            },

            MatchSet(loc, exp, empty, x, xs, body) => {
                let v = self.eval(env, exp)?;
                self.match_set(env, *loc, v, empty, x, xs, body)
            }

            Try(_, exp1, exp2) => match self.eval(&env.with_silent(true), exp1) {
                Err(err) if err.is_abort() => {
                    log!(log::VERBOSE, format!("try failed: {}", err));
                    self.eval(env, exp2)
                }
                result => result,
            },

            If(loc, cond, exp1, exp2) => {
                if self.eval_cond(env, *loc, cond)? {
                    self.eval(env, exp1)
                } else {
                    self.eval(env, exp2)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::events::Event;
    use crate::primitives::initial_env;

    fn ev(n: u32) -> Event {
        Event::new(n)
    }

    fn rel(pairs: &[(u32, u32)]) -> Value {
        Value::rel(pairs.iter().map(|(x, y)| (ev(*x), ev(*y))).collect())
    }

    fn evset(evs: &[u32]) -> Value {
        Value::set(evs.iter().map(|x| ev(*x)).collect())
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new((1..=3).map(ev).collect())
    }

    fn test_env(ctx: &ExecutionContext) -> Env {
        let mut env =
            initial_env(ctx, vec![("po", rel(&[(1, 2), (2, 3)])), ("rf", rel(&[(1, 3)])), ("W", evset(&[1, 3]))]);
        env.add_enum("scope", vec!["wi".to_string(), "wg".to_string(), "dev".to_string()]);
        env.with_silent(true)
    }

    fn run(exp: Exp) -> EvalResult {
        let ctx = context();
        let config = InterpConfig::default();
        let eval = Eval::new(&ctx, &config, Mode::Model);
        eval.eval(&test_env(&ctx), &exp)
    }

    fn scope_set(tags: &[&str]) -> Value {
        let ty = Ty::Tag("scope".to_string());
        Value::valset(ValSet::from_values(ty, tags.iter().map(|t| Value::tag("scope", *t))).unwrap())
    }

    #[test]
    fn test_concrete_scenario() {
        assert_eq!(run(seq(vec![var("po"), var("po")])).unwrap(), rel(&[(1, 3)]));
        assert_eq!(run(inter(var("po"), var("rf"))).unwrap(), rel(&[]));
        assert_eq!(run(call("domain", var("po"))).unwrap(), evset(&[1, 2]));
        assert_eq!(run(call("range", var("po"))).unwrap(), evset(&[2, 3]))
    }

    #[test]
    fn test_closures() {
        assert_eq!(run(op1(Op1::Plus, var("po"))).unwrap(), rel(&[(1, 2), (2, 3), (1, 3)]));
        assert_eq!(run(op1(Op1::Star, empty())).unwrap(), rel(&[(1, 1), (2, 2), (3, 3)]));
        assert_eq!(run(op1(Op1::Opt, var("rf"))).unwrap(), rel(&[(1, 1), (2, 2), (3, 3), (1, 3)]));
        assert!(matches!(run(op1(Op1::Star, universe())), Ok(Value::Universe)));
        assert!(run(op1(Op1::Plus, var("W"))).unwrap_err().is_abort())
    }

    #[test]
    fn test_complement() {
        assert_eq!(run(op1(Op1::Comp, var("W"))).unwrap(), evset(&[2]));
        assert!(matches!(run(op1(Op1::Comp, empty())), Ok(Value::Universe)));
        assert_eq!(run(op1(Op1::Comp, tag("wg"))).unwrap(), scope_set(&["wi", "dev"]));
        let exp = op1(Op1::Comp, op1(Op1::Comp, set(vec![tag("wi"), tag("dev")])));
        assert_eq!(run(exp).unwrap(), scope_set(&["wi", "dev"]))
    }

    #[test]
    fn test_union() {
        assert!(matches!(run(union(vec![var("po"), universe()])), Ok(Value::Universe)));
        assert_eq!(run(union(vec![empty(), var("po"), var("rf")])).unwrap(), rel(&[(1, 2), (2, 3), (1, 3)]));
        assert_eq!(run(union(vec![tag("wi"), tag("wg")])).unwrap(), scope_set(&["wi", "wg"]));
        assert!(matches!(run(union(vec![empty(), empty()])), Ok(Value::Empty)));
        let err = run(union(vec![var("po"), var("W")])).unwrap_err();
        assert_eq!(err.kind(), &crate::error::ErrorKind::User("mixing relations and sets".to_string()))
    }

    #[test]
    fn test_seq_empty_absorbs() {
        assert!(matches!(run(seq(vec![var("po"), empty(), var("W")])), Ok(Value::Empty)));
        assert_eq!(run(seq(vec![var("rf"), universe()])).unwrap(), rel(&[(1, 1), (1, 2), (1, 3)]));
        assert!(run(seq(vec![var("po"), var("W")])).unwrap_err().is_abort())
    }

    #[test]
    fn test_inter_cartesian_fast_path() {
        let r = run(inter(var("po"), cartesian(var("W"), universe()))).unwrap();
        assert_eq!(r, rel(&[(1, 2)]));
        let r = run(inter(var("po"), cartesian(universe(), var("W")))).unwrap();
        assert_eq!(r, rel(&[(2, 3)]))
    }

    #[test]
    fn test_diff() {
        assert_eq!(run(diff(universe(), var("W"))).unwrap(), evset(&[2]));
        assert_eq!(run(diff(var("po"), var("rf"))).unwrap(), rel(&[(1, 2), (2, 3)]));
        assert!(matches!(run(diff(var("po"), universe())), Ok(Value::Empty)));
        let err = run(diff(var("W"), set(vec![tag("wi")]))).unwrap_err();
        assert_eq!(err.kind(), &crate::error::ErrorKind::User("mixing event sets and typed sets".to_string()))
    }

    #[test]
    fn test_explicit_set() {
        assert!(matches!(run(set(vec![])), Ok(Value::Empty)));
        assert!(run(set(vec![universe()])).unwrap_err().is_abort());
        let err = run(set(vec![var("po"), var("W")])).unwrap_err();
        assert_eq!(err.kind(), &crate::error::ErrorKind::Comp(CompError::Heterogeneous(Ty::Rel, Ty::Set)));
        let v = run(set(vec![var("po"), empty()])).unwrap();
        match v {
            Value::ValSet(s) => assert_eq!(s.len(), 2),
            _ => panic!("expected a set of relations"),
        }
    }

    #[test]
    fn test_add() {
        assert!(matches!(run(add(tag("wi"), universe())), Ok(Value::Universe)));
        assert!(run(add(universe(), empty())).unwrap_err().is_abort());
        assert_eq!(run(add(tag("wi"), add(tag("dev"), empty()))).unwrap(), scope_set(&["wi", "dev"]))
    }

    #[test]
    fn test_match() {
        let m = |t: &str| match_tag(tag(t), vec![("wi", var("po")), ("wg", var("rf"))], None);
        assert_eq!(run(m("wg")).unwrap(), rel(&[(1, 3)]));
        assert!(run(m("dev")).unwrap_err().is_abort());
        let m = match_tag(tag("dev"), vec![("wi", var("po"))], Some(empty()));
        assert!(matches!(run(m), Ok(Value::Empty)));
        assert!(run(match_tag(var("po"), vec![], None)).unwrap_err().is_abort())
    }

    #[test]
    fn test_match_set_counts_elements() {
        // let rec size s = match s with {} -> 0 || x ++ xs -> x | size(xs)
        // collects the events of a set one at a time
        let step = union(vec![add(var("x"), empty()), call("collect", var("xs"))]);
        let body = match_set(var("s"), empty(), "x", "xs", step);
        let f = fun("collect", Pat::Var("s".to_string()), body);
        let exp = let_rec_in(vec![binding("collect", f)], call("collect", var("W")));
        assert_eq!(run(exp).unwrap(), evset(&[1, 3]));
        assert!(run(match_set(universe(), empty(), "x", "xs", var("x"))).unwrap_err().is_abort())
    }

    #[test]
    fn test_try() {
        let exp = try_with(match_tag(tag("dev"), vec![], None), var("rf"));
        assert_eq!(run(exp).unwrap(), rel(&[(1, 3)]));
        // user errors are not caught
        let exp = try_with(var("unbound"), var("rf"));
        assert!(!run(exp).unwrap_err().is_abort())
    }

    #[test]
    fn test_try_forces_lazy_bindings() {
        let ctx = context();
        let config = InterpConfig::default();
        let eval = Eval::new(&ctx, &config, Mode::Model);
        let env = test_env(&ctx).with_silent(false);
        let failing = match_tag(tag("dev"), vec![("wi", empty())], None);
        let exp = let_in(vec![binding("x", failing)], try_with(var("x"), var("rf")));
        assert_eq!(eval.eval(&env, &exp).unwrap(), rel(&[(1, 3)]))
    }

    #[test]
    fn test_application() {
        let f = fun("f", Pat::Tuple(vec!["a".to_string(), "b".to_string()]), seq(vec![var("a"), var("b")]));
        let exp = let_in(vec![binding("f", f)], app(var("f"), tuple(vec![var("po"), var("po")])));
        assert_eq!(run(exp).unwrap(), rel(&[(1, 3)]));
        let err = run(call("domain", var("W"))).unwrap_err();
        assert!(err.is_abort());
        assert!(format!("{}", err).contains("primitive domain"))
    }

    #[test]
    fn test_closures_capture_definition_env() {
        // let x = po in let f = fun _ -> x in let x = rf in f(0)
        let exp = let_in(
            vec![binding("x", var("po"))],
            let_in(
                vec![binding("f", fun("f", Pat::Var("_".to_string()), var("x")))],
                let_in(vec![binding("x", var("rf"))], call("f", empty())),
            ),
        );
        assert_eq!(run(exp).unwrap(), rel(&[(1, 2), (2, 3)]))
    }

    #[test]
    fn test_if() {
        let exp = if_then_else(Cond::Subset(var("rf"), op1(Op1::Plus, var("po"))), var("po"), empty());
        assert_eq!(run(exp).unwrap(), rel(&[(1, 2), (2, 3)]));
        let exp = if_then_else(Cond::Eq(var("rf"), seq(vec![var("po"), var("po")])), var("W"), empty());
        assert_eq!(run(exp).unwrap(), evset(&[1, 3]));
        let exp = if_then_else(Cond::In(tag("wg"), set(vec![tag("wi")])), var("W"), empty());
        assert!(matches!(run(exp), Ok(Value::Empty)));
        let exp = if_then_else(Cond::Variant("mixed".to_string()), var("W"), empty());
        assert!(matches!(run(exp), Ok(Value::Empty)))
    }

    #[test]
    fn test_unbound_and_undefined_tag() {
        assert!(!run(var("nope")).unwrap_err().is_abort());
        assert!(!run(tag("nope")).unwrap_err().is_abort())
    }
}
