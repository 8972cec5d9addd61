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

//! The statement executor.
//!
//! A model is a list of instructions run from left to right, with the
//! interpreter state threaded through. Execution is written in
//! continuation passing style: `forall` and `with ... from` run the
//! rest of a model several times, and a failed `provides` test drops
//! the rest of the current branch by never calling its continuation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::{Binding, Check, Exp, Ins, Model, Test, TestType};
use crate::bell::{BellInfo, Mode};
use crate::config::InterpConfig;
use crate::context::ExecutionContext;
use crate::env::{Env, Thunk};
use crate::error::Error;
use crate::eval::Eval;
use crate::events::Relation;
use crate::include::ModelLoader;
use crate::log;
use crate::source_loc::SourceLoc;
use crate::value::{Procedure, Ty, ValSet, Value};

use std::rc::Rc;

/// The interpreter state for one run of a model over one candidate
/// execution.
#[derive(Clone, Debug)]
pub struct State {
    pub env: Env,
    show: BTreeMap<String, Thunk>,
    pub skipped: BTreeSet<String>,
    pub flags: BTreeSet<String>,
    /// Set when a `requires` check fails
    pub undefined: bool,
    pub bell: BellInfo,
    locs: Vec<SourceLoc>,
    included: BTreeSet<String>,
}

impl State {
    pub fn new(env: Env) -> Self {
        State {
            env,
            show: BTreeMap::new(),
            skipped: BTreeSet::new(),
            flags: BTreeSet::new(),
            undefined: false,
            bell: BellInfo::new(),
            locs: Vec::new(),
            included: BTreeSet::new(),
        }
    }

    /// The call sites of the procedures currently executing.
    pub fn locs(&self) -> &[SourceLoc] {
        &self.locs
    }
}

/// The result of one successful branch of a model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub show: BTreeMap<String, Relation>,
    pub flags: BTreeSet<String>,
    pub skipped: BTreeSet<String>,
    pub undefined: bool,
    pub bell: BellInfo,
}

pub struct Interp<'a> {
    eval: Eval<'a>,
    loader: &'a dyn ModelLoader,
}

impl<'a> Interp<'a> {
    pub fn new(ctx: &'a ExecutionContext, config: &'a InterpConfig, loader: &'a dyn ModelLoader) -> Self {
        let mode = if config.bell { Mode::Bell } else { Mode::Model };
        Interp { eval: Eval::new(ctx, config, mode), loader }
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Interp { eval: Eval::new(self.eval.ctx, self.eval.config, mode), loader: self.loader }
    }

    pub fn mode(&self) -> Mode {
        self.eval.mode
    }

    pub fn evaluator(&self) -> &Eval<'a> {
        &self.eval
    }

    /// Run a model. The continuation is called with the final state of
    /// each branch that reaches the end of the model, threading the
    /// accumulated result.
    pub fn interpret<A>(
        &self,
        st: State,
        model: &Model,
        kont: &mut dyn FnMut(State, A) -> Result<A, Error>,
        res: A,
    ) -> Result<A, Error> {
        self.run(st, &model.code, kont, res)
    }

    /// Run a model, collecting the outcome of every branch.
    pub fn run_model(&self, model: &Model, env: Env) -> Result<Vec<Outcome>, Error> {
        self.outcomes(State::new(env), model)
    }

    /// Run a bell file and then a model in the environment the bell
    /// file leaves behind, so the model can use the enums and
    /// definitions it declares. Each outcome carries the bell file's
    /// annotations.
    pub fn run_model_with_bell(&self, bell: &Model, model: &Model, env: Env) -> Result<Vec<Outcome>, Error> {
        let st = match self.bell_state(bell, env.clone())? {
            Some(st) => st,
            None => State::new(env),
        };
        let interp = Interp { eval: Eval::new(self.eval.ctx, self.eval.config, Mode::Model), loader: self.loader };
        interp.outcomes(st, model)
    }

    /// Run a bell file, returning the annotations it declares.
    pub fn run_bell(&self, model: &Model, env: Env) -> Result<BellInfo, Error> {
        Ok(self.bell_state(model, env)?.map(|st| st.bell).unwrap_or_default())
    }

    fn outcomes(&self, st: State, model: &Model) -> Result<Vec<Outcome>, Error> {
        self.interpret(
            st,
            model,
            &mut |st, mut outcomes: Vec<Outcome>| {
                outcomes.push(self.outcome(&st)?);
                Ok(outcomes)
            },
            Vec::new(),
        )
    }

    /// The final state of the first branch of a bell file.
    fn bell_state(&self, bell: &Model, env: Env) -> Result<Option<State>, Error> {
        let interp = Interp { eval: Eval::new(self.eval.ctx, self.eval.config, Mode::Bell), loader: self.loader };
        interp.interpret(
            State::new(env),
            bell,
            &mut |st, first: Option<State>| Ok(first.or(Some(st))),
            None,
        )
    }

    /// Force the relations registered for display. Sets are shown as
    /// the identity relation over their events. A shown binding that
    /// aborts is left out, any other error is fatal.
    pub fn outcome(&self, st: &State) -> Result<Outcome, Error> {
        let mut show = BTreeMap::new();
        for (name, thunk) in &st.show {
            let r = match self.eval.force(&st.env, thunk) {
                Ok(Value::Empty) => Relation::new(),
                Ok(Value::Universe) => self.eval.ctx.unv().clone(),
                Ok(Value::Rel(r)) => (*r).clone(),
                Ok(Value::Set(s)) => Relation::identity(&s),
                Ok(v) => {
                    log!(log::SHOW, format!("not showing {} of type {}", name, v.ty()));
                    continue;
                }
                Err(err) if err.is_abort() => {
                    log!(log::SHOW, format!("not showing {}: {}", name, err));
                    continue;
                }
                Err(err) => return Err(err.with_calls(&st.locs)),
            };
            show.insert(name.clone(), r);
        }
        Ok(Outcome {
            show,
            flags: st.flags.clone(),
            skipped: st.skipped.clone(),
            undefined: st.undefined,
            bell: st.bell.clone(),
        })
    }

    fn run<A>(
        &self,
        mut st: State,
        code: &[Ins],
        kont: &mut dyn FnMut(State, A) -> Result<A, Error>,
        res: A,
    ) -> Result<A, Error> {
        for (i, ins) in code.iter().enumerate() {
            let rest = &code[i + 1..];
            match ins {
                Ins::Forall(loc, x, exp, body) => {
                    let elems = self.elements(&st.env, *loc, exp).map_err(|e| e.with_calls(&st.locs))?;
                    let env0 = st.env.clone();
                    return self.run_forall(st, &env0, x, &elems, body, rest, kont, res);
                }

                Ins::WithFrom(loc, x, exp) => {
                    let elems = self.elements(&st.env, *loc, exp).map_err(|e| e.with_calls(&st.locs))?;
                    let mut res = res;
                    for v in elems {
                        let mut st = st.clone();
                        st.env.bind(x.clone(), v);
                        res = self.run(st, rest, kont, res)?
                    }
                    return Ok(res);
                }

                Ins::Include(loc, name) => {
                    if st.included.contains(name) {
                        log!(log::VERBOSE, format!("{} already included", name));
                        continue;
                    }
                    let model = self.loader.load(name).map_err(|msg| {
                        let err = Error::include(*loc, msg).with_calls(&st.locs);
                        report!(err);
                        err
                    })?;
                    log!(log::VERBOSE, format!("including {}", name));
                    st.included.insert(name.clone());
                    return self.run(st, &model.code, &mut |st: State, res: A| self.run(st, rest, kont, res), res);
                }

                Ins::Call(loc, name, arg, check) => {
                    if let Some(check) = check {
                        if self.eval.config.skips(check) {
                            log!(log::VERBOSE, format!("skipping call {}", check));
                            st.skipped.insert(check.clone());
                            continue;
                        }
                    }
                    let (proc, arg) = self.call_target(&st.env, *loc, name, arg).map_err(|e| e.with_calls(&st.locs))?;
                    let env0 = st.env.clone();
                    st.env = self.bind_proc_args(&proc, &env0, *loc, arg).map_err(|e| e.with_calls(&st.locs))?;
                    st.locs.push(*loc);
                    log!(log::CALLS, format!("{}: calling {}", loc, name));
                    return self.run(
                        st,
                        &proc.body,
                        &mut |mut st: State, res: A| {
                            st.env = env0.clone();
                            st.locs.pop();
                            self.run(st, rest, kont, res)
                        },
                        res,
                    );
                }

                Ins::IfVariant(_, variant, then_code, else_code) => {
                    let branch = if self.eval.config.variant(variant) { then_code } else { else_code };
                    return self.run(st, branch, &mut |st: State, res: A| self.run(st, rest, kont, res), res);
                }

                Ins::Test(test) if self.eval.mode == Mode::Model => {
                    if !self.test(&mut st, test).map_err(|e| e.with_calls(&st.locs))? {
                        return Ok(res);
                    }
                }

                ins => self.exec(&mut st, ins).map_err(|e| e.with_calls(&st.locs))?,
            }
        }
        kont(st, res)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_forall<A>(
        &self,
        mut st: State,
        env0: &Env,
        x: &str,
        elems: &[Value],
        body: &[Ins],
        rest: &[Ins],
        kont: &mut dyn FnMut(State, A) -> Result<A, Error>,
        res: A,
    ) -> Result<A, Error> {
        st.env = env0.clone();
        match elems.split_first() {
            None => self.run(st, rest, kont, res),
            Some((v, elems)) => {
                st.env.bind(x, v.clone());
                self.run(
                    st,
                    body,
                    &mut |st: State, res: A| self.run_forall(st, env0, x, elems, body, rest, kont, res),
                    res,
                )
            }
        }
    }

    /// The values `forall` and `with ... from` iterate over.
    fn elements(&self, env: &Env, loc: SourceLoc, exp: &Exp) -> Result<Vec<Value>, Error> {
        match self.eval.eval(env, exp)? {
            Value::Empty => Ok(Vec::new()),
            Value::ValSet(s) => Ok(s.iter().cloned().collect()),
            v @ Value::Tag(_, _) => Ok(vec![v]),
            Value::Set(s) => Ok(s.iter().map(Value::Event).collect()),
            Value::Rel(r) => Ok(r.iter().map(|(ev1, ev2)| Value::Pair(ev1, ev2)).collect()),
            Value::Universe => self.eval.abort(env, loc, "cannot iterate over the universe"),
            v => self.eval.abort(env, loc, format!("cannot iterate over value of type {}", v.ty())),
        }
    }

    fn call_target(
        &self,
        env: &Env,
        loc: SourceLoc,
        name: &str,
        arg: &Exp,
    ) -> Result<(Rc<Procedure>, Value), Error> {
        let proc = match env.lookup(name) {
            None => return self.eval.user_error(loc, format!("unbound procedure: {}", name)),
            Some(thunk) => match self.eval.force(env, thunk)? {
                Value::Proc(proc) => proc,
                v => return self.eval.user_error(loc, format!("{} is not a procedure, it has type {}", name, v.ty())),
            },
        };
        let arg = self.eval.eval(env, arg)?;
        Ok((proc, arg))
    }

    fn bind_proc_args(&self, proc: &Rc<Procedure>, caller: &Env, loc: SourceLoc, arg: Value) -> Result<Env, Error> {
        let mut env = proc.env.with_silent(caller.is_silent());
        if proc.is_rec {
            env.bind(proc.name.clone(), Value::Proc(proc.clone()))
        }
        self.eval.bind_pat(&mut env, loc, &proc.params, arg)?;
        Ok(env)
    }

    fn register_shows(&self, st: &mut State, bindings: &[Binding]) {
        if self.eval.mode != Mode::Model {
            return;
        }
        for binding in bindings {
            for name in binding.pat.names() {
                if self.eval.config.should_show(name) {
                    if let Some(thunk) = st.env.lookup(name) {
                        log!(log::SHOW, format!("showing {}", name));
                        st.show.insert(name.to_string(), thunk.clone());
                    }
                }
            }
        }
    }

    fn tag_names(&self, env: &Env, loc: SourceLoc, exp: &Exp) -> Result<BTreeSet<String>, Error> {
        match self.eval.eval(env, exp)? {
            Value::Empty => Ok(BTreeSet::new()),
            Value::Tag(_, t) => Ok(std::iter::once(t).collect()),
            Value::ValSet(s) if matches!(s.elem_ty(), Ty::Tag(_)) => Ok(s
                .iter()
                .filter_map(|v| match v {
                    Value::Tag(_, t) => Some(t.clone()),
                    _ => None,
                })
                .collect()),
            v => self.eval.user_error(loc, format!("expected a set of tags, got a value of type {}", v.ty())),
        }
    }

    fn tag_pairs(&self, loc: SourceLoc, v: Value) -> Result<BTreeSet<(String, String)>, Error> {
        let mut pairs = BTreeSet::new();
        let elems: Vec<Value> = match v {
            Value::Empty => Vec::new(),
            Value::ValSet(s) => s.iter().cloned().collect(),
            v @ Value::Tuple(_) => vec![v],
            v => return self.eval.user_error(loc, format!("expected a set of tag pairs, got {}", v.ty())),
        };
        for elem in elems {
            match elem {
                Value::Tuple(vs) => match vs.as_slice() {
                    [Value::Tag(_, t1), Value::Tag(_, t2)] => {
                        pairs.insert((t1.clone(), t2.clone()));
                    }
                    _ => return self.eval.user_error(loc, "order declarations must relate pairs of tags"),
                },
                _ => return self.eval.user_error(loc, "order declarations must relate pairs of tags"),
            }
        }
        Ok(pairs)
    }

    fn check(&self, env: &Env, loc: SourceLoc, check: Check, v: &Value) -> Result<bool, Error> {
        use Check::*;
        let holds = match check {
            Acyclic | NonAcyclic => match self.eval.relation_of(v) {
                Some(r) => {
                    let acyclic = r.is_acyclic();
                    if !acyclic {
                        if_logging!(log::CHECKS, {
                            if let Some(cycle) = r.find_cycle() {
                                let cycle = self.eval.ctx.candidate().describe_cycle(&cycle);
                                log!(log::CHECKS, format!("cycle: {}", cycle))
                            }
                        })
                    }
                    acyclic
                }
                None => return self.eval.abort(env, loc, format!("acyclic check on value of type {}", v.ty())),
            },
            Irreflexive | NonIrreflexive => match self.eval.relation_of(v) {
                Some(r) => r.is_irreflexive(),
                None => return self.eval.abort(env, loc, format!("irreflexive check on value of type {}", v.ty())),
            },
            Empty | NonEmpty => match v {
                Value::Empty => true,
                Value::Universe => self.eval.ctx.unv().is_empty(),
                Value::Rel(r) => r.is_empty(),
                Value::Set(s) => s.is_empty(),
                Value::ValSet(s) => s.is_empty(),
                v => return self.eval.abort(env, loc, format!("empty check on value of type {}", v.ty())),
            },
        };
        Ok(match check {
            Acyclic | Irreflexive | Empty => holds,
            NonAcyclic | NonIrreflexive | NonEmpty => !holds,
        })
    }

    /// Returns false when the test prunes the current branch.
    fn test(&self, st: &mut State, test: &Test) -> Result<bool, Error> {
        let name = test.name.as_deref().unwrap_or("<unnamed>");
        if test.name.is_some() && self.eval.config.skips(name) {
            log!(log::VERBOSE, format!("skipping check {}", name));
            st.skipped.insert(name.to_string());
            return Ok(true);
        }

        let v = self.eval.eval(&st.env, &test.exp)?;
        let holds = self.check(&st.env, test.loc, test.check, &v)?;
        log!(log::CHECKS, format!("{:?} {}: {}", test.check, name, if holds { "ok" } else { "failed" }));

        match test.ty {
            TestType::Provides => Ok(holds),
            TestType::Requires => {
                if !holds {
                    st.undefined = true
                }
                Ok(true)
            }
            TestType::Flagged => {
                if holds {
                    st.flags.insert(name.to_string());
                }
                Ok(true)
            }
        }
    }

    /// Execute an instruction that neither branches nor needs the rest
    /// of the model.
    fn exec(&self, st: &mut State, ins: &Ins) -> Result<(), Error> {
        let bell = self.eval.mode == Mode::Bell;
        if (bell && ins.is_model_only()) || (!bell && ins.is_bell_only()) {
            return Ok(());
        }
        match ins {
            Ins::Let(_, bindings) => {
                st.env = self.eval.bind_bindings(&st.env, bindings)?;
                self.register_shows(st, bindings);
                Ok(())
            }

            Ins::Rec(loc, bindings) => {
                st.env = self.eval.env_rec(&st.env, *loc, bindings)?;
                self.register_shows(st, bindings);
                Ok(())
            }

            Ins::Procedure(_, name, params, body, is_rec) => {
                let mut bound: Vec<String> = params.names().iter().map(|x| x.to_string()).collect();
                if *is_rec {
                    bound.push(name.clone())
                }
                let mut free = BTreeSet::new();
                let env = if Ins::free_vars(body, &mut bound, &mut free) {
                    st.env.restrict(&free)
                } else {
                    st.env.clone()
                };
                let proc =
                    Procedure { name: name.clone(), params: params.clone(), body: body.clone(), env, is_rec: *is_rec };
                st.env.bind(name.clone(), Value::Proc(Rc::new(proc)));
                Ok(())
            }

            Ins::Enum(loc, name, tags) => {
                st.env.add_enum(name.clone(), tags.clone());
                let tag_values = tags.iter().map(|t| Value::tag(name.clone(), t.clone()));
                let all = ValSet::from_values(Ty::Tag(name.clone()), tag_values)
                    .map_err(|e| Error::comp(*loc, e))?;
                st.env.bind(name.clone(), Value::valset(all));
                Ok(())
            }

            Ins::Show(loc, names) => {
                for name in names {
                    match st.env.lookup(name) {
                        Some(thunk) => {
                            st.show.insert(name.clone(), thunk.clone());
                        }
                        None => return self.eval.user_error(*loc, format!("unbound var: {}", name)),
                    }
                }
                Ok(())
            }

            Ins::ShowAs(_, exp, name) => {
                st.show.insert(name.clone(), Thunk::deferred(st.env.clone(), exp.clone()));
                Ok(())
            }

            Ins::UnShow(_, names) => {
                for name in names {
                    st.show.remove(name);
                }
                Ok(())
            }

            Ins::Debug(loc, exp) => {
                let v = self.eval.eval(&st.env, exp)?;
                log!(log::VERBOSE | log::SHOW, format!("{}: {}", loc, v));
                Ok(())
            }

            Ins::Latex(_) => Ok(()),

            Ins::EventDec(loc, name, exps) => {
                let annots = exps.iter().map(|exp| self.tag_names(&st.env, *loc, exp)).collect::<Result<_, _>>()?;
                st.bell.add_events(name.clone(), annots);
                Ok(())
            }

            Ins::RelationDec(loc, name, exps) => {
                let annots = exps.iter().map(|exp| self.tag_names(&st.env, *loc, exp)).collect::<Result<_, _>>()?;
                st.bell.add_relations(name.clone(), annots);
                Ok(())
            }

            Ins::OrderDec(loc, name, exp) => {
                let v = self.eval.eval(&st.env, exp)?;
                let order = self.tag_pairs(*loc, v)?;
                st.bell.add_order(name.clone(), order);
                Ok(())
            }

            // Instructions that need the rest of the model are run by `run`
            Ins::Test(_)
            | Ins::Forall(_, _, _, _)
            | Ins::WithFrom(_, _, _)
            | Ins::Include(_, _)
            | Ins::Call(_, _, _, _)
            | Ins::IfVariant(_, _, _, _) => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Forbidden,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verdict::Allowed => write!(f, "Allowed"),
            Verdict::Forbidden => write!(f, "Forbidden"),
        }
    }
}

/// Counts candidate executions by whether the model accepts them.
#[derive(Clone, Debug, Default)]
pub struct Tally {
    positive: usize,
    negative: usize,
    undefined: usize,
    flags: BTreeSet<String>,
}

impl Tally {
    pub fn new() -> Self {
        Default::default()
    }

    /// Record the outcomes of running the model on one candidate. A
    /// candidate is accepted if any branch reached the end of the
    /// model, and undefined if every such branch was undefined.
    pub fn add(&mut self, outcomes: &[Outcome]) {
        if outcomes.is_empty() {
            self.negative += 1
        } else if outcomes.iter().all(|o| o.undefined) {
            self.undefined += 1
        } else {
            self.positive += 1
        }
        for outcome in outcomes {
            self.flags.extend(outcome.flags.iter().cloned())
        }
    }

    pub fn positive(&self) -> usize {
        self.positive
    }

    pub fn negative(&self) -> usize {
        self.negative
    }

    pub fn undefined(&self) -> usize {
        self.undefined
    }

    pub fn verdict(&self) -> Verdict {
        if self.positive > 0 {
            Verdict::Allowed
        } else {
            Verdict::Forbidden
        }
    }

    pub fn summary<S: Into<String>>(&self, test: S) -> Summary {
        Summary {
            test: test.into(),
            verdict: self.verdict(),
            positive: self.positive,
            negative: self.negative,
            undefined: self.undefined,
            flags: self.flags.iter().cloned().collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub test: String,
    pub verdict: Verdict,
    pub positive: usize,
    pub negative: usize,
    pub undefined: usize,
    pub flags: Vec<String>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Test {} {}\nPositive: {} Negative: {}", self.test, self.verdict, self.positive, self.negative)?;
        if self.undefined > 0 {
            write!(f, " Undefined: {}", self.undefined)?
        }
        for flag in &self.flags {
            write!(f, "\nFlag {}", flag)?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::events::Event;
    use crate::include::NoIncludes;
    use crate::primitives::initial_env;

    fn ev(n: u32) -> Event {
        Event::new(n)
    }

    fn cyclic() -> Value {
        Value::rel(vec![(ev(1), ev(2)), (ev(2), ev(1))].into_iter().collect())
    }

    fn run_with(config: &InterpConfig, code: Vec<Ins>) -> Result<Vec<Outcome>, Error> {
        let ctx = ExecutionContext::new((1..=2).map(ev).collect());
        let interp = Interp::new(&ctx, config, &NoIncludes);
        let env = initial_env(&ctx, vec![("cyc", cyclic())]).with_silent(true);
        interp.run_model(&Model::new("test", code), env)
    }

    fn run(code: Vec<Ins>) -> Result<Vec<Outcome>, Error> {
        run_with(&InterpConfig::default(), code)
    }

    #[test]
    fn test_provides_prunes() {
        let outcomes = run(vec![test(Check::Acyclic, var("cyc"), Some("sc"), TestType::Provides)]).unwrap();
        assert!(outcomes.is_empty())
    }

    #[test]
    fn test_requires_marks_undefined() {
        let outcomes = run(vec![test(Check::Acyclic, var("cyc"), Some("sc"), TestType::Requires)]).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].undefined)
    }

    #[test]
    fn test_negated_and_flagged() {
        let outcomes = run(vec![
            test(Check::NonAcyclic, var("cyc"), None, TestType::Provides),
            test(Check::NonEmpty, var("cyc"), Some("racy"), TestType::Flagged),
            test(Check::Empty, var("cyc"), Some("quiet"), TestType::Flagged),
        ])
        .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].flags.iter().collect::<Vec<_>>(), vec!["racy"])
    }

    #[test]
    fn test_skip() {
        let config = InterpConfig::parse("[checks]\nskip = [\"sc\"]\n").unwrap();
        let sc = || vec![test(Check::Acyclic, var("cyc"), Some("sc"), TestType::Provides)];
        let outcomes = run_with(&config, sc()).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].skipped.contains("sc"));

        let config = InterpConfig::parse("[checks]\nskip = [\"sc\"]\nstrict_skip = true\n").unwrap();
        let outcomes = run_with(&config, sc()).unwrap();
        assert!(outcomes.is_empty())
    }

    #[test]
    fn test_with_from() {
        let outcomes = run(vec![
            enum_ins("scope", &["wi", "wg", "dev"]),
            with_from("s", var("scope")),
            show_as(call("tag2scope", var("s")), "scoped"),
        ])
        .unwrap();
        assert_eq!(outcomes.len(), 3)
    }

    #[test]
    fn test_show() {
        let config = InterpConfig::parse("[show]\nnames = [\"r\"]\n").unwrap();
        let outcomes = run_with(
            &config,
            vec![
                let_ins(vec![binding("r", op1(crate::ast::Op1::Inv, var("cyc")))]),
                let_ins(vec![binding("s", call("domain", var("cyc")))]),
                show(&["s"]),
                show_as(var("cyc"), "c"),
                unshow(&["c"]),
            ],
        )
        .unwrap();
        let show = &outcomes[0].show;
        assert_eq!(show.keys().collect::<Vec<_>>(), vec!["r", "s"]);
        assert_eq!(show["s"], Relation::identity(&vec![ev(1), ev(2)].into_iter().collect()))
    }

    #[test]
    fn test_bell_only_ignored_in_model_mode() {
        let outcomes = run(vec![enum_ins("scope", &["wi"]), event_dec("R", vec![var("scope")])]).unwrap();
        assert!(outcomes[0].bell.is_empty())
    }

    #[test]
    fn test_tally() {
        let outcome = |undefined| Outcome {
            show: BTreeMap::new(),
            flags: BTreeSet::new(),
            skipped: BTreeSet::new(),
            undefined,
            bell: BellInfo::new(),
        };
        let mut tally = Tally::new();
        tally.add(&[]);
        tally.add(&[outcome(true)]);
        assert_eq!(tally.verdict(), Verdict::Forbidden);
        tally.add(&[outcome(true), outcome(false)]);
        assert_eq!(tally.verdict(), Verdict::Allowed);
        let summary = tally.summary("MP");
        assert_eq!((summary.positive, summary.negative, summary.undefined), (1, 1, 1));
        assert_eq!(format!("{}", summary), "Test MP Allowed\nPositive: 1 Negative: 1 Undefined: 1")
    }
}
