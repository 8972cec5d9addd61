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

//! The abstract syntax of cat models. Parsing is done elsewhere; this
//! module only defines the tree the interpreter consumes, plus a set
//! of builder functions for constructing it programmatically.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::source_loc::SourceLoc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Konst {
    /// `0`, the polymorphic empty set or relation
    Empty,
    /// `_`, the polymorphic universe
    Universe,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op1 {
    /// Transitive closure R+
    Plus,
    /// Reflexive-transitive closure R*
    Star,
    /// Reflexive closure R?
    Opt,
    /// Complement ~R
    Comp,
    /// Inverse R^-1
    Inv,
    /// \[S\] Lift a set to the identity relation over its elements
    ToId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Set or relation union R | S
    Union,
    /// Set or relation intersection R & S
    Inter,
    /// Set or relation difference R \ S
    Diff,
    /// Relation composition R; S
    Seq,
    /// Cartesian product of sets S * T
    Cartesian,
    /// Set insertion x ++ S
    Add,
    Tuple,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pat {
    Var(String),
    Tuple(Vec<String>),
}

impl Pat {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Pat::Var(x) => vec![x],
            Pat::Tuple(xs) => xs.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Binding {
    pub loc: SourceLoc,
    pub pat: Pat,
    pub exp: Rc<Exp>,
}

/// A function literal. The free variables are computed once when the
/// definition is built, so that closures can capture just those.
#[derive(Debug)]
pub struct FunDef {
    pub loc: SourceLoc,
    pub name: String,
    pub params: Pat,
    pub body: Rc<Exp>,
    pub free: Vec<String>,
}

impl FunDef {
    pub fn new<S: Into<String>>(loc: SourceLoc, name: S, params: Pat, body: Exp) -> Self {
        let mut bound: Vec<String> = params.names().iter().map(|x| x.to_string()).collect();
        let mut free = BTreeSet::new();
        body.free_vars(&mut bound, &mut free);
        FunDef { loc, name: name.into(), params, body: Rc::new(body), free: free.into_iter().collect() }
    }
}

#[derive(Debug)]
pub enum Cond {
    Variant(String),
    Eq(Exp, Exp),
    Subset(Exp, Exp),
    In(Exp, Exp),
}

#[derive(Debug)]
pub enum Exp {
    Konst(SourceLoc, Konst),
    Tag(SourceLoc, String),
    Var(SourceLoc, String),
    Op1(SourceLoc, Op1, Box<Exp>),
    Op(SourceLoc, Op, Vec<Exp>),
    App(SourceLoc, Box<Exp>, Box<Exp>),
    Bind(SourceLoc, Vec<Binding>, Box<Exp>),
    BindRec(SourceLoc, Vec<Binding>, Box<Exp>),
    Fun(Rc<FunDef>),
    ExplicitSet(SourceLoc, Vec<Exp>),
    /// match e with 'a -> e1 || 'b -> e2 || _ -> e3
    Match(SourceLoc, Box<Exp>, Vec<(String, Exp)>, Option<Box<Exp>>),
    /// match e with {} -> e1 || x ++ xs -> e2
    MatchSet(SourceLoc, Box<Exp>, Box<Exp>, String, String, Box<Exp>),
    /// try e1 with e2
    Try(SourceLoc, Box<Exp>, Box<Exp>),
    If(SourceLoc, Box<Cond>, Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn loc(&self) -> SourceLoc {
        use Exp::*;
        match self {
            Konst(loc, _)
            | Tag(loc, _)
            | Var(loc, _)
            | Op1(loc, _, _)
            | Op(loc, _, _)
            | App(loc, _, _)
            | Bind(loc, _, _)
            | BindRec(loc, _, _)
            | ExplicitSet(loc, _)
            | Match(loc, _, _, _)
            | MatchSet(loc, _, _, _, _, _)
            | Try(loc, _, _)
            | If(loc, _, _, _) => *loc,
            Fun(def) => def.loc,
        }
    }

    pub fn is_fun(&self) -> bool {
        matches!(self, Exp::Fun(_))
    }

    /// Collect the variables of an expression that are not bound by
    /// an enclosing binder. `bound` acts as a stack of binders in
    /// scope.
    pub fn free_vars(&self, bound: &mut Vec<String>, free: &mut BTreeSet<String>) {
        use Exp::*;
        match self {
            Konst(_, _) | Tag(_, _) => (),
            Var(_, x) => {
                if !bound.iter().any(|b| b == x) {
                    free.insert(x.clone());
                }
            }
            Op1(_, _, exp) => exp.free_vars(bound, free),
            Op(_, _, exps) | ExplicitSet(_, exps) => exps.iter().for_each(|exp| exp.free_vars(bound, free)),
            App(_, f, arg) => {
                f.free_vars(bound, free);
                arg.free_vars(bound, free)
            }
            Bind(_, bindings, body) => {
                for binding in bindings {
                    binding.exp.free_vars(bound, free)
                }
                let n = bound.len();
                bindings.iter().for_each(|b| bound.extend(b.pat.names().iter().map(|x| x.to_string())));
                body.free_vars(bound, free);
                bound.truncate(n)
            }
            BindRec(_, bindings, body) => {
                let n = bound.len();
                bindings.iter().for_each(|b| bound.extend(b.pat.names().iter().map(|x| x.to_string())));
                for binding in bindings {
                    binding.exp.free_vars(bound, free)
                }
                body.free_vars(bound, free);
                bound.truncate(n)
            }
            Fun(def) => {
                for x in &def.free {
                    if !bound.iter().any(|b| b == x) {
                        free.insert(x.clone());
                    }
                }
            }
            Match(_, exp, cases, default) => {
                exp.free_vars(bound, free);
                cases.iter().for_each(|(_, case)| case.free_vars(bound, free));
                if let Some(default) = default {
                    default.free_vars(bound, free)
                }
            }
            MatchSet(_, exp, empty, x, xs, body) => {
                exp.free_vars(bound, free);
                empty.free_vars(bound, free);
                bound.push(x.clone());
                bound.push(xs.clone());
                body.free_vars(bound, free);
                bound.truncate(bound.len() - 2)
            }
            Try(_, exp1, exp2) => {
                exp1.free_vars(bound, free);
                exp2.free_vars(bound, free)
            }
            If(_, cond, exp1, exp2) => {
                match &**cond {
                    Cond::Variant(_) => (),
                    Cond::Eq(x, y) | Cond::Subset(x, y) | Cond::In(x, y) => {
                        x.free_vars(bound, free);
                        y.free_vars(bound, free)
                    }
                }
                exp1.free_vars(bound, free);
                exp2.free_vars(bound, free)
            }
        }
    }
}

/// The checks that can be applied to a relation. As in herd, each
/// check can be negated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Check {
    Acyclic,
    Irreflexive,
    Empty,
    NonAcyclic,
    NonIrreflexive,
    NonEmpty,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TestType {
    /// A failing check removes the candidate from the model
    Provides,
    /// A failing check makes the candidate undefined
    Requires,
    /// A holding check raises a flag on the candidate
    Flagged,
}

#[derive(Debug)]
pub struct Test {
    pub loc: SourceLoc,
    pub check: Check,
    pub exp: Exp,
    pub name: Option<String>,
    pub ty: TestType,
}

#[derive(Debug)]
pub enum Ins {
    Let(SourceLoc, Vec<Binding>),
    Rec(SourceLoc, Vec<Binding>),
    Test(Test),
    Forall(SourceLoc, String, Exp, Vec<Ins>),
    WithFrom(SourceLoc, String, Exp),
    Procedure(SourceLoc, String, Pat, Rc<Vec<Ins>>, bool),
    Call(SourceLoc, String, Exp, Option<String>),
    Include(SourceLoc, String),
    Enum(SourceLoc, String, Vec<String>),
    Show(SourceLoc, Vec<String>),
    ShowAs(SourceLoc, Rc<Exp>, String),
    UnShow(SourceLoc, Vec<String>),
    Debug(SourceLoc, Exp),
    Latex(SourceLoc),
    IfVariant(SourceLoc, String, Vec<Ins>, Vec<Ins>),
    /// Bell only: events K[{'a, 'b}, {'c}]
    EventDec(SourceLoc, String, Vec<Exp>),
    /// Bell only: relations K[{'a, 'b}]
    RelationDec(SourceLoc, String, Vec<Exp>),
    /// Bell only: an order over the tags of an enum
    OrderDec(SourceLoc, String, Exp),
}

impl Ins {
    /// Instructions that only make sense when checking a model, and
    /// are skipped when interpreting a bell file.
    pub fn is_model_only(&self) -> bool {
        use Ins::*;
        matches!(self, Test(_) | Show(_, _) | ShowAs(_, _, _) | UnShow(_, _) | Latex(_))
    }

    /// Instructions that only make sense in a bell file.
    pub fn is_bell_only(&self) -> bool {
        use Ins::*;
        matches!(self, EventDec(_, _, _) | RelationDec(_, _, _) | OrderDec(_, _, _))
    }

    /// Collect the free variables of a sequence of instructions, as
    /// for [`Exp::free_vars`]. Returns false if the code includes other
    /// files, as their free variables are not known until they are
    /// loaded.
    pub fn free_vars(code: &[Ins], bound: &mut Vec<String>, free: &mut BTreeSet<String>) -> bool {
        fn var(x: &str, bound: &[String], free: &mut BTreeSet<String>) {
            if !bound.iter().any(|b| b == x) {
                free.insert(x.to_string());
            }
        }

        let n = bound.len();
        let mut known = true;
        for ins in code {
            use Ins::*;
            match ins {
                Let(_, bindings) => {
                    bindings.iter().for_each(|b| b.exp.free_vars(bound, free));
                    bindings.iter().for_each(|b| bound.extend(b.pat.names().iter().map(|x| x.to_string())))
                }
                Rec(_, bindings) => {
                    bindings.iter().for_each(|b| bound.extend(b.pat.names().iter().map(|x| x.to_string())));
                    bindings.iter().for_each(|b| b.exp.free_vars(bound, free))
                }
                Test(test) => test.exp.free_vars(bound, free),
                Forall(_, x, exp, body) => {
                    exp.free_vars(bound, free);
                    bound.push(x.clone());
                    known &= Ins::free_vars(body, bound, free);
                    bound.pop();
                }
                WithFrom(_, x, exp) => {
                    exp.free_vars(bound, free);
                    bound.push(x.clone())
                }
                Procedure(_, name, params, body, is_rec) => {
                    let m = bound.len();
                    if *is_rec {
                        bound.push(name.clone())
                    }
                    bound.extend(params.names().iter().map(|x| x.to_string()));
                    known &= Ins::free_vars(body, bound, free);
                    bound.truncate(m);
                    bound.push(name.clone())
                }
                Call(_, name, arg, _) => {
                    var(name, bound, free);
                    arg.free_vars(bound, free)
                }
                Include(_, _) => known = false,
                Enum(_, name, _) => bound.push(name.clone()),
                Show(_, names) => names.iter().for_each(|x| var(x, bound, free)),
                ShowAs(_, exp, _) => exp.free_vars(bound, free),
                Debug(_, exp) | OrderDec(_, _, exp) => exp.free_vars(bound, free),
                UnShow(_, _) | Latex(_) => (),
                IfVariant(_, _, then_code, else_code) => {
                    // Bindings made in a branch are not tracked past it
                    known &= Ins::free_vars(then_code, bound, free);
                    known &= Ins::free_vars(else_code, bound, free);
                }
                EventDec(_, _, exps) | RelationDec(_, _, exps) => {
                    exps.iter().for_each(|exp| exp.free_vars(bound, free))
                }
            }
        }
        bound.truncate(n);
        known
    }
}

/// A `Model` represents a single parsed cat (or bell) file.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub code: Vec<Ins>,
}

impl Model {
    pub fn new<S: Into<String>>(name: S, code: Vec<Ins>) -> Self {
        Model { name: name.into(), code }
    }

    /// The names of every show instruction in the model, in order.
    pub fn shows(&self) -> Vec<String> {
        let mut shows = Vec::new();
        for ins in &self.code {
            match ins {
                Ins::Show(_, ids) => shows.extend(ids.iter().cloned()),
                Ins::ShowAs(_, _, id) => shows.push(id.clone()),
                _ => (),
            }
        }
        shows
    }
}

/// Functions for building models without a parser, with unknown
/// source locations. Mostly used by tests and by embedders that
/// generate models.
pub mod build {
    use super::*;

    fn unknown() -> SourceLoc {
        SourceLoc::unknown()
    }

    pub fn empty() -> Exp {
        Exp::Konst(unknown(), Konst::Empty)
    }

    pub fn universe() -> Exp {
        Exp::Konst(unknown(), Konst::Universe)
    }

    pub fn var(x: &str) -> Exp {
        Exp::Var(unknown(), x.to_string())
    }

    pub fn tag(t: &str) -> Exp {
        Exp::Tag(unknown(), t.to_string())
    }

    pub fn op1(op: Op1, exp: Exp) -> Exp {
        Exp::Op1(unknown(), op, Box::new(exp))
    }

    pub fn op(op: Op, exps: Vec<Exp>) -> Exp {
        Exp::Op(unknown(), op, exps)
    }

    pub fn union(exps: Vec<Exp>) -> Exp {
        op(Op::Union, exps)
    }

    pub fn inter(x: Exp, y: Exp) -> Exp {
        op(Op::Inter, vec![x, y])
    }

    pub fn diff(x: Exp, y: Exp) -> Exp {
        op(Op::Diff, vec![x, y])
    }

    pub fn seq(exps: Vec<Exp>) -> Exp {
        op(Op::Seq, exps)
    }

    pub fn cartesian(x: Exp, y: Exp) -> Exp {
        op(Op::Cartesian, vec![x, y])
    }

    pub fn add(x: Exp, set: Exp) -> Exp {
        op(Op::Add, vec![x, set])
    }

    pub fn tuple(exps: Vec<Exp>) -> Exp {
        op(Op::Tuple, exps)
    }

    pub fn app(f: Exp, arg: Exp) -> Exp {
        Exp::App(unknown(), Box::new(f), Box::new(arg))
    }

    pub fn call(f: &str, arg: Exp) -> Exp {
        app(var(f), arg)
    }

    pub fn set(exps: Vec<Exp>) -> Exp {
        Exp::ExplicitSet(unknown(), exps)
    }

    pub fn fun(name: &str, params: Pat, body: Exp) -> Exp {
        Exp::Fun(Rc::new(FunDef::new(unknown(), name, params, body)))
    }

    pub fn binding(x: &str, exp: Exp) -> Binding {
        Binding { loc: unknown(), pat: Pat::Var(x.to_string()), exp: Rc::new(exp) }
    }

    pub fn let_in(bindings: Vec<Binding>, body: Exp) -> Exp {
        Exp::Bind(unknown(), bindings, Box::new(body))
    }

    pub fn let_rec_in(bindings: Vec<Binding>, body: Exp) -> Exp {
        Exp::BindRec(unknown(), bindings, Box::new(body))
    }

    pub fn match_tag(exp: Exp, cases: Vec<(&str, Exp)>, default: Option<Exp>) -> Exp {
        Exp::Match(
            unknown(),
            Box::new(exp),
            cases.into_iter().map(|(t, e)| (t.to_string(), e)).collect(),
            default.map(Box::new),
        )
    }

    pub fn match_set(exp: Exp, empty: Exp, x: &str, xs: &str, body: Exp) -> Exp {
        Exp::MatchSet(unknown(), Box::new(exp), Box::new(empty), x.to_string(), xs.to_string(), Box::new(body))
    }

    pub fn try_with(exp1: Exp, exp2: Exp) -> Exp {
        Exp::Try(unknown(), Box::new(exp1), Box::new(exp2))
    }

    pub fn if_then_else(cond: Cond, exp1: Exp, exp2: Exp) -> Exp {
        Exp::If(unknown(), Box::new(cond), Box::new(exp1), Box::new(exp2))
    }

    pub fn let_ins(bindings: Vec<Binding>) -> Ins {
        Ins::Let(unknown(), bindings)
    }

    pub fn rec_ins(bindings: Vec<Binding>) -> Ins {
        Ins::Rec(unknown(), bindings)
    }

    pub fn test(check: Check, exp: Exp, name: Option<&str>, ty: TestType) -> Ins {
        Ins::Test(Test { loc: unknown(), check, exp, name: name.map(str::to_string), ty })
    }

    pub fn forall(x: &str, exp: Exp, body: Vec<Ins>) -> Ins {
        Ins::Forall(unknown(), x.to_string(), exp, body)
    }

    pub fn with_from(x: &str, exp: Exp) -> Ins {
        Ins::WithFrom(unknown(), x.to_string(), exp)
    }

    pub fn procedure(name: &str, params: Pat, body: Vec<Ins>, is_rec: bool) -> Ins {
        Ins::Procedure(unknown(), name.to_string(), params, Rc::new(body), is_rec)
    }

    pub fn call_ins(name: &str, arg: Exp, check_name: Option<&str>) -> Ins {
        Ins::Call(unknown(), name.to_string(), arg, check_name.map(str::to_string))
    }

    pub fn include(file: &str) -> Ins {
        Ins::Include(unknown(), file.to_string())
    }

    pub fn enum_ins(name: &str, tags: &[&str]) -> Ins {
        Ins::Enum(unknown(), name.to_string(), tags.iter().map(|t| t.to_string()).collect())
    }

    pub fn show(names: &[&str]) -> Ins {
        Ins::Show(unknown(), names.iter().map(|t| t.to_string()).collect())
    }

    pub fn show_as(exp: Exp, name: &str) -> Ins {
        Ins::ShowAs(unknown(), Rc::new(exp), name.to_string())
    }

    pub fn unshow(names: &[&str]) -> Ins {
        Ins::UnShow(unknown(), names.iter().map(|t| t.to_string()).collect())
    }

    pub fn event_dec(name: &str, exps: Vec<Exp>) -> Ins {
        Ins::EventDec(unknown(), name.to_string(), exps)
    }

    pub fn relation_dec(name: &str, exps: Vec<Exp>) -> Ins {
        Ins::RelationDec(unknown(), name.to_string(), exps)
    }

    pub fn order_dec(name: &str, exp: Exp) -> Ins {
        Ins::OrderDec(unknown(), name.to_string(), exp)
    }
}
