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

//! Built-in functions, and the environment models start from.

use crate::context::ExecutionContext;
use crate::env::Env;
use crate::error::PrimError;
use crate::events::{Event, EventSet, Relation};
use crate::value::{Primitive, Ty, ValSet, Value};

fn args(v: Value, n: usize) -> Result<Vec<Value>, PrimError> {
    match v {
        Value::Tuple(vs) if vs.len() == n => Ok(vs),
        Value::Tuple(vs) if n != 1 => Err(PrimError::Arity { expected: n, got: vs.len() }),
        v if n == 1 => Ok(vec![v]),
        _ => Err(PrimError::Arity { expected: n, got: 1 }),
    }
}

fn expect_set(ctx: &ExecutionContext, v: &Value) -> Result<EventSet, PrimError> {
    match v {
        Value::Empty => Ok(EventSet::new()),
        Value::Universe => Ok(ctx.events().clone()),
        Value::Set(s) => Ok((**s).clone()),
        v => Err(PrimError::Arg { expected: "set", got: v.ty() }),
    }
}

fn expect_rel(ctx: &ExecutionContext, v: &Value) -> Result<Relation, PrimError> {
    match v {
        Value::Empty => Ok(Relation::new()),
        Value::Universe => Ok(ctx.unv().clone()),
        Value::Rel(r) => Ok((**r).clone()),
        v => Err(PrimError::Arg { expected: "relation", got: v.ty() }),
    }
}

fn expect_tag(v: &Value) -> Result<&str, PrimError> {
    match v {
        Value::Tag(_, t) => Ok(t),
        v => Err(PrimError::Arg { expected: "tag", got: v.ty() }),
    }
}

fn domain(ctx: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    match args(v, 1)?.pop() {
        Some(Value::Empty) => Ok(Value::Empty),
        Some(v) => Ok(Value::set(expect_rel(ctx, &v)?.domain())),
        None => Err(PrimError::Arity { expected: 1, got: 0 }),
    }
}

fn range(ctx: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    match args(v, 1)?.pop() {
        Some(Value::Empty) => Ok(Value::Empty),
        Some(v) => Ok(Value::set(expect_rel(ctx, &v)?.range())),
        None => Err(PrimError::Arity { expected: 1, got: 0 }),
    }
}

fn singletons<I>(ty: Ty, elems: I) -> Result<Value, PrimError>
where
    I: IntoIterator<Item = Value>,
{
    let set_ty = Ty::ValSet(Box::new(ty.clone()));
    let mut parts = ValSet::new(set_ty);
    for elem in elems {
        let part = ValSet::from_values(ty.clone(), vec![elem]).map_err(|e| PrimError::Failed(e.to_string()))?;
        parts.insert(Value::valset(part)).map_err(|e| PrimError::Failed(e.to_string()))?;
    }
    Ok(Value::valset(parts))
}

/// Split a set into the set of its singletons.
fn partition(_: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    match v {
        Value::Empty => Ok(Value::Empty),
        Value::ValSet(s) => singletons(s.elem_ty().clone(), s.iter().cloned()),
        Value::Set(s) => {
            let mut parts = ValSet::new(Ty::Set);
            for ev in s.iter() {
                parts.insert(Value::set(EventSet::singleton(ev))).map_err(|e| PrimError::Failed(e.to_string()))?;
            }
            Ok(Value::valset(parts))
        }
        v => Err(PrimError::Arg { expected: "set", got: v.ty() }),
    }
}

fn linear_extensions(
    order: &Relation,
    remaining: &mut Vec<Event>,
    prefix: &mut Vec<Event>,
    acc: &mut Vec<Relation>,
) {
    if remaining.is_empty() {
        let mut lin = Relation::new();
        for (i, x) in prefix.iter().enumerate() {
            for y in &prefix[i + 1..] {
                lin.insert(*x, *y);
            }
        }
        acc.push(lin);
        return;
    }
    for i in 0..remaining.len() {
        let ev = remaining[i];
        if remaining.iter().any(|pred| order.contains(*pred, ev)) {
            continue;
        }
        remaining.remove(i);
        prefix.push(ev);
        linear_extensions(order, remaining, prefix, acc);
        prefix.pop();
        remaining.insert(i, ev)
    }
}

/// All the strict total orders on a set of events that contain a
/// given relation restricted to those events.
fn linearisations(ctx: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    let vs = args(v, 2)?;
    let events = expect_set(ctx, &vs[0])?;
    let order = expect_rel(ctx, &vs[1])?.restrict(&events, &events);

    let mut remaining: Vec<Event> = events.iter().collect();
    let mut acc = Vec::new();
    linear_extensions(&order, &mut remaining, &mut Vec::new(), &mut acc);

    ValSet::from_values(Ty::Rel, acc.into_iter().map(Value::rel))
        .map(Value::valset)
        .map_err(|e| PrimError::Failed(e.to_string()))
}

fn tag2events(ctx: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    let vs = args(v, 1)?;
    match ctx.tag_events(expect_tag(&vs[0])?) {
        Some(events) => Ok(Value::set(events.clone())),
        None => Ok(Value::Empty),
    }
}

fn tag2scope(ctx: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    let vs = args(v, 1)?;
    match ctx.tag_scope(expect_tag(&vs[0])?) {
        Some(scope) => Ok(Value::rel(scope.clone())),
        None => Ok(Value::Empty),
    }
}

fn fail(_: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    Err(PrimError::Failed(format!("fail called on {}", v)))
}

pub static PRIMITIVES: &[Primitive] = &[
    Primitive { name: "domain", f: domain },
    Primitive { name: "range", f: range },
    Primitive { name: "partition", f: partition },
    Primitive { name: "linearisations", f: linearisations },
    Primitive { name: "tag2events", f: tag2events },
    Primitive { name: "tag2scope", f: tag2scope },
    Primitive { name: "fail", f: fail },
];

/// The environment a model starts in: the primitives, the identity
/// relation `id`, and any relations and sets supplied by the caller.
pub fn initial_env<I, S>(ctx: &ExecutionContext, values: I) -> Env
where
    I: IntoIterator<Item = (S, Value)>,
    S: Into<String>,
{
    let mut env = Env::new();
    for prim in PRIMITIVES {
        env.bind(prim.name, Value::Prim(*prim))
    }
    env.bind("id", Value::rel(ctx.id().clone()));
    for (name, v) in values {
        env.bind(name, v)
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(n: u32) -> Event {
        Event::new(n)
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new((1..=3).map(ev).collect())
    }

    #[test]
    fn test_linearisations() {
        let ctx = context();
        let order = Relation::singleton(ev(1), ev(2));
        let lins = linearisations(&ctx, Value::Tuple(vec![Value::Universe, Value::rel(order)])).unwrap();
        match lins {
            // 3 of the 6 orders on three events put e1 before e2
            Value::ValSet(s) => {
                assert_eq!(s.len(), 3);
                assert!(s.iter().all(|lin| match lin {
                    Value::Rel(r) => r.contains(ev(1), ev(2)) && r.len() == 3 && r.is_acyclic(),
                    _ => false,
                }))
            }
            _ => panic!("expected a set of relations"),
        }
    }

    #[test]
    fn test_linearisations_cyclic() {
        let ctx = context();
        let order: Relation = vec![(ev(1), ev(2)), (ev(2), ev(1))].into_iter().collect();
        let lins = linearisations(&ctx, Value::Tuple(vec![Value::Universe, Value::rel(order)])).unwrap();
        assert!(matches!(lins, Value::ValSet(s) if s.is_empty()))
    }

    #[test]
    fn test_partition() {
        let ctx = context();
        let parts = partition(&ctx, Value::set(ctx.events().clone())).unwrap();
        match parts {
            Value::ValSet(s) => {
                assert_eq!(s.len(), 3);
                assert!(s.contains(&Value::set(EventSet::singleton(ev(2)))))
            }
            _ => panic!("expected a set of sets"),
        }
    }

    #[test]
    fn test_arity() {
        let ctx = context();
        assert_eq!(linearisations(&ctx, Value::Empty), Err(PrimError::Arity { expected: 2, got: 1 }));
        // a unary primitive takes a tuple as its single argument
        assert_eq!(
            domain(&ctx, Value::Tuple(vec![Value::Empty, Value::Empty])),
            Err(PrimError::Arg { expected: "relation", got: Ty::Tuple(vec![Ty::Empty, Ty::Empty]) })
        )
    }

    #[test]
    fn test_tag_lookups() {
        let ctx = context().with_tag_events("wg", EventSet::singleton(ev(1)));
        assert_eq!(tag2events(&ctx, Value::tag("scope", "wg")).unwrap(), Value::set(EventSet::singleton(ev(1))));
        assert!(matches!(tag2scope(&ctx, Value::tag("scope", "wg")), Ok(Value::Empty)));
        assert!(tag2events(&ctx, Value::Empty).is_err())
    }
}
