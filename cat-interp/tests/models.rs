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

use std::collections::BTreeSet;
use std::sync::Mutex;

use cat_interp::ast::build::*;
use cat_interp::ast::{Check, Ins, Model, Pat, TestType};
use cat_interp::bell::Mode;
use cat_interp::context::NamedEvents;
use cat_interp::error::{ErrorKind, PrimError};
use cat_interp::events::{Event, EventSet, Relation};
use cat_interp::include::{MemoryLoader, ModelLoader, NoIncludes};
use cat_interp::primitives::initial_env;
use cat_interp::source_loc::SourceLoc;
use cat_interp::value::{Primitive, Value};
use cat_interp::*;

fn ev(n: u32) -> Event {
    Event::new(n)
}

fn events(n: u32) -> EventSet {
    (1..=n).map(ev).collect()
}

fn rel(pairs: &[(u32, u32)]) -> Relation {
    pairs.iter().map(|(x, y)| (ev(*x), ev(*y))).collect()
}

fn show_all() -> InterpConfig {
    InterpConfig::parse("[show]\nall = true\n").unwrap()
}

fn run(
    ctx: &ExecutionContext,
    config: &InterpConfig,
    loader: &dyn ModelLoader,
    code: Vec<Ins>,
    values: Vec<(&str, Value)>,
) -> Result<Vec<Outcome>, Error> {
    let interp = Interp::new(ctx, config, loader);
    interp.run_model(&Model::new("test", code), initial_env(ctx, values))
}

#[test]
fn concrete_relations() {
    let ctx = ExecutionContext::new(events(3));
    let outcomes = run(
        &ctx,
        &show_all(),
        &NoIncludes,
        vec![let_ins(vec![
            binding("popo", seq(vec![var("po"), var("po")])),
            binding("porf", inter(var("po"), var("rf"))),
            binding("dpo", call("domain", var("po"))),
            binding("rpo", call("range", var("po"))),
        ])],
        vec![("po", Value::rel(rel(&[(1, 2), (2, 3)]))), ("rf", Value::rel(rel(&[(1, 3)])))],
    )
    .unwrap();

    assert_eq!(outcomes.len(), 1);
    let show = &outcomes[0].show;
    assert_eq!(show["popo"], rel(&[(1, 3)]));
    assert!(show["porf"].is_empty());
    assert_eq!(show["dpo"], rel(&[(1, 1), (2, 2)]));
    assert_eq!(show["rpo"], rel(&[(2, 2), (3, 3)]))
}

#[test]
fn recursive_definition_on_chain() {
    let ctx = ExecutionContext::new(events(4));
    let po = rel(&[(1, 2), (2, 3), (3, 4)]);
    let outcomes = run(
        &ctx,
        &show_all(),
        &NoIncludes,
        vec![rec_ins(vec![binding("r", union(vec![var("po"), seq(vec![var("po"), var("r")])]))])],
        vec![("po", Value::rel(po.clone()))],
    )
    .unwrap();
    assert_eq!(outcomes[0].show["r"], po.transitive_closure());
    assert_eq!(outcomes[0].show["r"].len(), 6)
}

fn cyclic_model(ty: TestType) -> Vec<Ins> {
    vec![
        let_ins(vec![binding("com", union(vec![var("rf"), var("fr")]))]),
        test(Check::Acyclic, union(vec![var("po"), var("com")]), Some("sc"), ty),
    ]
}

fn sb_values() -> Vec<(&'static str, Value)> {
    vec![
        ("po", Value::rel(rel(&[(1, 2), (3, 4)]))),
        ("rf", Value::Empty),
        ("fr", Value::rel(rel(&[(2, 3), (4, 1)]))),
    ]
}

#[test]
fn provides_and_requires() {
    let ctx = ExecutionContext::new(events(4));
    let config = InterpConfig::default();

    let outcomes = run(&ctx, &config, &NoIncludes, cyclic_model(TestType::Provides), sb_values()).unwrap();
    assert!(outcomes.is_empty());

    let outcomes = run(&ctx, &config, &NoIncludes, cyclic_model(TestType::Requires), sb_values()).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].undefined);

    let mut tally = Tally::new();
    tally.add(&outcomes);
    assert_eq!(tally.verdict(), Verdict::Forbidden);
    assert_eq!(tally.undefined(), 1)
}

#[test]
fn skipped_check() {
    let ctx = ExecutionContext::new(events(4));
    let config = InterpConfig::parse("[checks]\nskip = [\"sc\"]\n").unwrap();
    let outcomes = run(&ctx, &config, &NoIncludes, cyclic_model(TestType::Provides), sb_values()).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].undefined);
    assert!(outcomes[0].skipped.contains("sc"))
}

static SEEN: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn record(_: &ExecutionContext, v: Value) -> Result<Value, PrimError> {
    match v {
        Value::Tag(_, t) => {
            SEEN.lock().unwrap().push(t);
            Ok(Value::Empty)
        }
        v => Err(PrimError::Arg { expected: "tag", got: v.ty() }),
    }
}

#[test]
fn forall_visits_every_tag() {
    let ctx = ExecutionContext::new(events(2));
    let outcomes = run(
        &ctx,
        &InterpConfig::default(),
        &NoIncludes,
        vec![
            enum_ins("scope", &["wi", "wg", "dev"]),
            forall("s", var("scope"), vec![test(Check::Empty, call("record", var("s")), None, TestType::Provides)]),
        ],
        vec![("record", Value::Prim(Primitive { name: "record", f: record }))],
    )
    .unwrap();
    assert_eq!(outcomes.len(), 1);

    let seen: BTreeSet<String> = SEEN.lock().unwrap().iter().cloned().collect();
    assert_eq!(SEEN.lock().unwrap().len(), 3);
    assert_eq!(seen, ["dev", "wg", "wi"].iter().map(|s| s.to_string()).collect())
}

#[test]
fn forall_fails_if_any_element_fails() {
    let ctx = ExecutionContext::new(events(2)).with_tag_scope("wg", rel(&[(1, 2)]));
    let code = vec![
        enum_ins("scope", &["wi", "wg", "dev"]),
        forall("s", var("scope"), vec![test(Check::Empty, call("tag2scope", var("s")), None, TestType::Provides)]),
    ];
    let outcomes = run(&ctx, &InterpConfig::default(), &NoIncludes, code, vec![]).unwrap();
    assert!(outcomes.is_empty())
}

#[test]
fn with_from_branches() {
    let ctx = ExecutionContext::new(events(2)).with_tag_scope("wg", rel(&[(1, 2)]));
    let code = vec![
        enum_ins("scope", &["wi", "wg", "dev"]),
        with_from("s", var("scope")),
        let_ins(vec![binding("scoped", call("tag2scope", var("s")))]),
        show(&["scoped"]),
    ];
    let outcomes = run(&ctx, &InterpConfig::default(), &NoIncludes, code, vec![]).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes.iter().filter(|o| !o.show["scoped"].is_empty()).count(), 1)
}

#[test]
fn include_from_memory() {
    let ctx = ExecutionContext::new(events(4));
    let loader = MemoryLoader::new().with(
        "cos.cat",
        Model::new("cos.cat", vec![let_ins(vec![binding("com", union(vec![var("rf"), var("fr")]))])]),
    );
    let code = vec![
        include("cos.cat"),
        include("cos.cat"),
        test(Check::Acyclic, union(vec![var("po"), var("com")]), Some("sc"), TestType::Provides),
    ];
    let outcomes = run(&ctx, &InterpConfig::default(), &loader, code, sb_values()).unwrap();
    assert!(outcomes.is_empty());

    let err = run(&ctx, &InterpConfig::default(), &loader, vec![include("missing.cat")], vec![]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Include(_)))
}

#[test]
fn procedures() {
    let ctx = ExecutionContext::new(events(4));
    let code = |check: Option<&str>| {
        vec![
            procedure(
                "consistent",
                Pat::Tuple(vec!["a".to_string(), "b".to_string()]),
                vec![test(Check::Acyclic, union(vec![var("a"), var("b")]), None, TestType::Provides)],
                false,
            ),
            call_ins("consistent", tuple(vec![var("po"), var("fr")]), check),
        ]
    };

    let outcomes = run(&ctx, &InterpConfig::default(), &NoIncludes, code(None), sb_values()).unwrap();
    assert!(outcomes.is_empty());

    let config = InterpConfig::parse("[checks]\nskip = [\"sc\"]\n").unwrap();
    let outcomes = run(&ctx, &config, &NoIncludes, code(Some("sc")), sb_values()).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].skipped.contains("sc"))
}

#[test]
fn procedures_keep_their_definition_environment() {
    let ctx = ExecutionContext::new(events(4));
    let code = vec![
        let_ins(vec![binding("r", union(vec![var("po"), var("fr")]))]),
        procedure(
            "consistent",
            Pat::Var("unused".to_string()),
            vec![test(Check::Acyclic, var("r"), None, TestType::Provides)],
            false,
        ),
        let_ins(vec![binding("r", empty())]),
        call_ins("consistent", empty(), None),
    ];
    let outcomes = run(&ctx, &InterpConfig::default(), &NoIncludes, code, sb_values()).unwrap();
    assert!(outcomes.is_empty())
}

#[test]
fn procedure_errors_carry_call_sites() {
    let ctx = ExecutionContext::new(events(1));
    let call_site = SourceLoc::new(0, 7, 1, 7, 20);
    let code = vec![
        procedure(
            "check",
            Pat::Var("r".to_string()),
            vec![test(Check::Empty, var("nope"), None, TestType::Provides)],
            false,
        ),
        Ins::Call(call_site, "check".to_string(), empty(), None),
    ];
    let err = run(&ctx, &InterpConfig::default(), &NoIncludes, code, vec![]).unwrap_err();
    assert!(!err.is_abort());
    assert_eq!(err.calls(), &[call_site])
}

#[test]
fn variants() {
    let ctx = ExecutionContext::new(events(2));
    let code = || {
        vec![Ins::IfVariant(
            SourceLoc::unknown(),
            "mixed".to_string(),
            vec![let_ins(vec![binding("r", var("po"))])],
            vec![let_ins(vec![binding("r", empty())])],
        )]
    };
    let values = || vec![("po", Value::rel(rel(&[(1, 2)])))];

    let outcomes = run(&ctx, &show_all(), &NoIncludes, code(), values()).unwrap();
    assert!(outcomes[0].show["r"].is_empty());

    let config = InterpConfig::parse("[show]\nall = true\n[model]\nvariants = [\"mixed\"]\n").unwrap();
    let outcomes = run(&ctx, &config, &NoIncludes, code(), values()).unwrap();
    assert_eq!(outcomes[0].show["r"], rel(&[(1, 2)]))
}

#[test]
fn shown_bindings_must_evaluate() {
    let ctx = ExecutionContext::new(events(2));
    let config = InterpConfig::default();

    let code = vec![let_ins(vec![binding("s", var("nope"))]), show(&["s"])];
    let err = run(&ctx, &config, &NoIncludes, code, vec![]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::User(_)));

    let code = vec![
        let_ins(vec![binding("f", call("fail", empty())), binding("r", var("po"))]),
        show(&["f", "r"]),
    ];
    let outcomes = run(&ctx, &config, &NoIncludes, code, vec![("po", Value::rel(rel(&[(1, 2)])))]).unwrap();
    assert_eq!(outcomes[0].show.keys().collect::<Vec<_>>(), vec!["r"])
}

#[test]
fn model_runs_after_bell() {
    let ctx = ExecutionContext::new(events(2));
    let config = InterpConfig::default();
    let interp = Interp::new(&ctx, &config, &NoIncludes);
    let bell = Model::new("scopes.bell", vec![enum_ins("Scope", &["wi", "wg"]), event_dec("R", vec![var("Scope")])]);
    let model = Model::new(
        "scopes.cat",
        vec![
            let_ins(vec![binding("s", var("Scope"))]),
            test(Check::NonEmpty, var("s"), Some("scoped"), TestType::Flagged),
        ],
    );
    let env = || initial_env(&ctx, Vec::<(&str, Value)>::new());

    let outcomes = interp.run_model_with_bell(&bell, &model, env()).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].flags.contains("scoped"));
    assert!(outcomes[0].bell.allows_event("R", &["wg"]));

    let err = interp.run_model(&model, env()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::User(_)))
}

#[test]
fn bell_declarations() {
    let ctx = ExecutionContext::new(events(2));
    let config = InterpConfig::default();
    let interp = Interp::new(&ctx, &config, &NoIncludes);
    let model = Model::new(
        "test.bell",
        vec![
            enum_ins("Scope", &["wi", "wg"]),
            enum_ins("Mem", &["sc", "rlx"]),
            event_dec("R", vec![var("Mem"), var("Scope")]),
            relation_dec("rmw", vec![tag("rlx")]),
            order_dec("Scope-order", set(vec![tuple(vec![tag("wi"), tag("wg")])])),
            test(Check::Acyclic, universe(), None, TestType::Provides),
        ],
    );
    let bell = interp.run_bell(&model, initial_env(&ctx, Vec::<(&str, Value)>::new())).unwrap();

    assert!(bell.allows_event("R", &["rlx", "wg"]));
    assert!(!bell.allows_event("R", &["dev"]));
    assert_eq!(bell.relations("rmw").map(|r| r.len()), Some(1));
    assert!(bell.order("Scope-order").unwrap().contains(&("wi".to_string(), "wg".to_string())));

    let interp = Interp::new(&ctx, &config, &NoIncludes).with_mode(Mode::Bell);
    assert_eq!(interp.mode(), Mode::Bell)
}

#[test]
fn tally_over_candidates() {
    let config = InterpConfig::default();
    let mut tally = Tally::new();
    for fr in [rel(&[(2, 3), (4, 1)]), rel(&[(2, 3)])] {
        let ctx = ExecutionContext::new(events(4))
            .with_candidate(Box::new(NamedEvents::new(vec![(ev(1), "a"), (ev(2), "b"), (ev(3), "c"), (ev(4), "d")])));
        let values = vec![("po", Value::rel(rel(&[(1, 2), (3, 4)]))), ("rf", Value::Empty), ("fr", Value::rel(fr))];
        tally.add(&run(&ctx, &config, &NoIncludes, cyclic_model(TestType::Provides), values).unwrap());
    }
    let summary = tally.summary("SB");
    assert_eq!(summary.verdict, Verdict::Allowed);
    assert_eq!((summary.positive, summary.negative), (1, 1));
    assert_eq!(format!("{}", summary), "Test SB Allowed\nPositive: 1 Negative: 1")
}
