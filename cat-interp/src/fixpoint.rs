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

//! Recursive bindings.
//!
//! `let rec` definitions are not unfolded syntactically. Function
//! bindings become a group of closures that can see each other, and
//! all other bindings are computed by iterating from `Empty` until the
//! values stop growing.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::ast::{Binding, Exp, FunDef, Pat};
use crate::bell::Mode;
use crate::env::Env;
use crate::error::Error;
use crate::eval::Eval;
use crate::log;
use crate::source_loc::SourceLoc;
use crate::value::{RecGroup, Value};

impl<'a> Eval<'a> {
    /// Bind a group of mutually recursive functions in `env`.
    pub fn bind_funs(&self, env: &Env, defs: &[(String, Rc<FunDef>)]) -> Env {
        let mut env = env.clone();
        if defs.is_empty() {
            return env;
        }
        let free: BTreeSet<&String> = defs.iter().flat_map(|(_, def)| def.free.iter()).collect();
        let group = Rc::new(RecGroup { defs: defs.to_vec(), env: env.restrict(free) });
        for (name, v) in group.closures() {
            env.bind(name, v)
        }
        env
    }

    /// Is the new value `w` of a recursive binding contained in its
    /// previous value `v`?
    fn stabilised(&self, env: &Env, loc: SourceLoc, name: &str, v: &Value, w: &Value) -> Result<bool, Error> {
        use Value::*;
        match (v, w) {
            (_, Empty) => Ok(true),
            (Universe, Universe) => Ok(true),
            (Empty, Universe) => Ok(false),
            (Universe, Rel(w)) => Ok(self.ctx.unv().is_subset(w)),
            (Universe, Set(w)) => Ok(self.ctx.events().is_subset(w)),
            (Universe, ValSet(w)) => {
                let unv = self.enum_universe(env, loc, w.elem_ty())?;
                unv.is_subset(w).map_err(|e| Error::comp(loc, e))
            }
            (Rel(v), Rel(w)) => Ok(w.is_subset(v)),
            (Set(v), Set(w)) => Ok(w.is_subset(v)),
            (ValSet(v), ValSet(w)) => w.is_subset(v).map_err(|e| Error::comp(loc, e)),
            (Empty, Rel(w)) => Ok(w.is_empty()),
            (Empty, Set(w)) => Ok(w.is_empty()),
            (Empty, ValSet(w)) => Ok(w.is_empty()),
            (Rel(v), Universe) => Ok(self.ctx.unv().is_subset(v)),
            (Set(v), Universe) => Ok(self.ctx.events().is_subset(v)),
            _ => {
                let ty = match v {
                    Empty | Universe => w.ty(),
                    _ => v.ty(),
                };
                let err = Error::illegal_recursion(loc, name, ty);
                report!(err);
                Err(err)
            }
        }
    }

    /// Evaluate each binding in turn, each one seeing the values just
    /// computed for those before it.
    fn fix_step(&self, env: &Env, vals: &[(&String, &Rc<Exp>)]) -> Result<(Env, Vec<Value>), Error> {
        let mut env = env.clone();
        let mut ws = Vec::with_capacity(vals.len());
        for (name, exp) in vals {
            let w = self.eval(&env, exp)?;
            env.bind(*name, w.clone());
            ws.push(w)
        }
        Ok((env, ws))
    }

    pub fn env_rec(&self, env: &Env, loc: SourceLoc, bindings: &[Binding]) -> Result<Env, Error> {
        let mut funs: Vec<(String, Rc<FunDef>)> = Vec::new();
        let mut vals: Vec<(&String, &Rc<Exp>)> = Vec::new();
        for binding in bindings {
            match (&binding.pat, &*binding.exp) {
                (Pat::Var(name), Exp::Fun(def)) => funs.push((name.clone(), def.clone())),
                (Pat::Var(name), _) => vals.push((name, &binding.exp)),
                (Pat::Tuple(_), _) => return self.user_error(binding.loc, "tuple pattern in recursive binding"),
            }
        }

        if vals.is_empty() {
            return Ok(self.bind_funs(env, &funs));
        }

        let mut vs: Vec<Value> = vec![Value::Empty; vals.len()];
        let mut cur = env.clone();
        for (name, _) in &vals {
            cur.bind(*name, Value::Empty)
        }

        if self.mode == Mode::Bell {
            return Ok(self.bind_funs(&cur, &funs));
        }

        let mut iteration = 0;
        loop {
            iteration += 1;
            let with_funs = self.bind_funs(&cur, &funs);
            let (next, ws) = self.fix_step(&with_funs, &vals)?;

            if_logging!(log::FIXPOINT, {
                for ((name, _), w) in vals.iter().zip(ws.iter()) {
                    log!(log::FIXPOINT, format!("iteration {}: {} = {}", iteration, name, w))
                }
            });

            let mut stable = true;
            for (((name, _), v), w) in vals.iter().zip(vs.iter()).zip(ws.iter()) {
                if !self.stabilised(env, loc, name, v, w)? {
                    stable = false;
                    break;
                }
            }

            if stable {
                log!(log::FIXPOINT, format!("fixpoint reached after {} iterations", iteration));
                return Ok(with_funs);
            }

            cur = next;
            vs = ws;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::Op1;
    use crate::config::InterpConfig;
    use crate::context::ExecutionContext;
    use crate::error::ErrorKind;
    use crate::events::{Event, Relation};
    use crate::primitives::initial_env;
    use crate::value::Ty;

    fn chain(n: u32) -> Relation {
        (1..n).map(|i| (Event::new(i), Event::new(i + 1))).collect()
    }

    fn eval_in(exp: Exp, mode: Mode) -> Result<Value, Error> {
        let ctx = ExecutionContext::new((1..=4).map(Event::new).collect());
        let config = InterpConfig::default();
        let eval = Eval::new(&ctx, &config, mode);
        let env = initial_env(&ctx, vec![("po", Value::rel(chain(4)))]);
        eval.eval(&env, &exp)
    }

    #[test]
    fn test_recursive_closure() {
        // let rec r = po | (po; r) in r
        let exp = let_rec_in(vec![binding("r", union(vec![var("po"), seq(vec![var("po"), var("r")])]))], var("r"));
        let r = eval_in(exp, Mode::Model).unwrap();
        assert_eq!(r, Value::rel(chain(4).transitive_closure()))
    }

    #[test]
    fn test_mutual_recursion() {
        // let rec a = po | (b; po) and b = a
        let exp = let_rec_in(
            vec![binding("a", union(vec![var("po"), seq(vec![var("b"), var("po")])])), binding("b", var("a"))],
            var("b"),
        );
        let r = eval_in(exp, Mode::Model).unwrap();
        assert_eq!(r, Value::rel(chain(4).transitive_closure()))
    }

    #[test]
    fn test_recursion_through_function() {
        // let rec f x = x | (po; r) and r = f(po) in r
        let f = fun("f", Pat::Var("x".to_string()), union(vec![var("x"), seq(vec![var("po"), var("r")])]));
        let exp = let_rec_in(vec![binding("f", f), binding("r", call("f", var("po")))], var("r"));
        let r = eval_in(exp, Mode::Model).unwrap();
        assert_eq!(r, Value::rel(chain(4).transitive_closure()))
    }

    #[test]
    fn test_complement_stabilises() {
        let exp = let_rec_in(vec![binding("r", op1(Op1::Comp, var("r")))], var("r"));
        assert!(matches!(eval_in(exp, Mode::Model), Ok(Value::Universe)))
    }

    #[test]
    fn test_illegal_recursion() {
        // r starts as a relation and then becomes a set
        let exp = let_rec_in(
            vec![binding("r", match_set(call("domain", var("r")), var("po"), "x", "xs", call("domain", var("po"))))],
            var("r"),
        );
        let err = eval_in(exp, Mode::Model).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IllegalRecursion { ty: Ty::Rel, .. }))
    }

    #[test]
    fn test_bell_mode_does_not_iterate() {
        let exp = let_rec_in(vec![binding("r", union(vec![var("po"), seq(vec![var("po"), var("r")])]))], var("r"));
        assert!(matches!(eval_in(exp, Mode::Bell), Ok(Value::Empty)))
    }
}
