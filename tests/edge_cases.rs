use mimicry::{
    action_fn, BuildError, CapturedResponse, Condition, ConditionBuilder, DispatcherBuilder,
    RequestConditionBuilder, Responder, SimpleRequest,
};

fn get(path: &str) -> SimpleRequest {
    SimpleRequest::new("GET", path)
}

#[test]
fn method_and_grouped_paths_scenario() {
    // method == "GET" AND (path starts with "/a" OR path starts with "/b")
    let condition = RequestConditionBuilder::new()
        .method().equals("GET")
        .and()
        .open_group()
            .path().starts_with("/a")
            .or()
            .path().starts_with("/b")
        .close_group()
        .build()
        .unwrap();

    assert!(condition.check(&SimpleRequest::new("GET", "/abc")));
    assert!(condition.check(&SimpleRequest::new("GET", "/b/x")));
    assert!(!condition.check(&SimpleRequest::new("POST", "/abc")));
    assert!(!condition.check(&SimpleRequest::new("GET", "/zzz")));
}

#[test]
fn grouping_changes_semantics() {
    // (L1 OR L2) AND L3 across the interesting rows.
    let build = |l1: bool, l2: bool, l3: bool| {
        ConditionBuilder::new()
            .open_group()
            .add(Condition::<()>::always(l1))
            .or()
            .add(Condition::always(l2))
            .close_group()
            .and()
            .add(Condition::always(l3))
            .build()
            .unwrap()
    };

    assert!(build(false, true, true).check(&()));
    assert!(!build(false, true, false).check(&()));
    assert!(!build(true, true, false).check(&()));
    assert!(!build(false, false, true).check(&()));
}

#[test]
fn ungrouped_chain_is_left_to_right() {
    // L1 OR L2 AND L3 submitted infix without brackets reduces left to
    // right: (L1 OR L2) AND L3, not L1 OR (L2 AND L3).
    let condition = ConditionBuilder::new()
        .add(Condition::<()>::always(true))
        .or()
        .add(Condition::always(false))
        .and()
        .add(Condition::always(false))
        .build()
        .unwrap();

    assert!(!condition.check(&()));
}

#[test]
fn string_operation_examples() {
    let starts = RequestConditionBuilder::new()
        .path().starts_with("/foo")
        .build()
        .unwrap();
    assert!(starts.check(&get("/foobar")));
    assert!(!starts.check(&get("/bar")));

    let eqic = RequestConditionBuilder::new()
        .method().equals_ignore_case("GET")
        .build()
        .unwrap();
    assert!(eqic.check(&SimpleRequest::new("get", "/")));

    let digits = RequestConditionBuilder::new()
        .param("id").regexp("[0-9]+")
        .build()
        .unwrap();
    assert!(digits.check(&get("/").with_param("id", "123")));
    assert!(!digits.check(&get("/").with_param("id", "abc")));
    assert!(!digits.check(&get("/")));
}

#[test]
fn not_of_missing_header() {
    // Absent header -> exists() is false -> NOT makes the rule match.
    let condition = RequestConditionBuilder::new()
        .not()
        .header("x-internal").exists()
        .build()
        .unwrap();

    assert!(condition.check(&get("/")));
    assert!(!condition.check(&get("/").with_header("x-internal", "1")));
}

#[test]
fn deep_operator_chain() {
    let mut builder = ConditionBuilder::new().add(Condition::<()>::always(true));
    for _ in 0..50 {
        builder = builder.and().add(Condition::always(true));
    }
    let condition = builder.build().unwrap();
    assert!(condition.check(&()));
}

#[test]
fn builder_reports_position_of_error() {
    let result = RequestConditionBuilder::<SimpleRequest>::new()
        .method().equals("GET")
        .and()
        .and()
        .path().equals("/x")
        .build();

    match result {
        Err(BuildError::MissingOperand { trace }) => {
            assert_eq!(trace, " method->eq(GET) and and");
        }
        other => panic!("expected MissingOperand, got {other:?}"),
    }
}

#[test]
fn dispatcher_end_to_end() {
    let dispatcher = DispatcherBuilder::<SimpleRequest, CapturedResponse>::new()
        .case(|c| {
            c.when(|w| w.method().equals("GET").and().path().matches("/users/*"))
                .respond(
                    Responder::builder()
                        .status(200)
                        .content_type("application/json")
                        .text(r#"{"name":"alice"}"#)
                        .build(),
                )
        })
        .case(|c| {
            c.when(|w| w.method().equals("POST").and().json_content(&["kind"]).equals("ping"))
                .respond(
                    Responder::builder()
                        .status(202)
                        .text("pong")
                        .build(),
                )
        })
        .case(|c| {
            c.when(|w| w.any()).respond(
                Responder::builder().status(403).name("deny").build(),
            )
        })
        .build()
        .unwrap();

    let mut sink = CapturedResponse::new();
    assert!(dispatcher
        .dispatch(&SimpleRequest::new("GET", "/users/42"), &mut sink)
        .unwrap());
    assert_eq!(sink.status(), 200);
    assert_eq!(sink.content_type(), Some("application/json"));
    assert_eq!(sink.body_text(), r#"{"name":"alice"}"#);

    let mut sink = CapturedResponse::new();
    let req = SimpleRequest::new("POST", "/events").with_body(r#"{"kind":"ping"}"#);
    assert!(dispatcher.dispatch(&req, &mut sink).unwrap());
    assert_eq!(sink.status(), 202);
    assert_eq!(sink.body_text(), "pong");

    // The catch-all case answers anything else.
    let mut sink = CapturedResponse::new();
    assert!(dispatcher
        .dispatch(&SimpleRequest::new("DELETE", "/users/42"), &mut sink)
        .unwrap());
    assert_eq!(sink.status(), 403);
}

#[test]
fn handle_falls_back_to_not_found() {
    let dispatcher = DispatcherBuilder::<SimpleRequest, CapturedResponse>::new()
        .case(|c| {
            c.when(|w| w.path().equals("/known"))
                .respond(Responder::builder().text("known").build())
        })
        .build()
        .unwrap();

    let mut sink = CapturedResponse::new();
    let handled = dispatcher.handle(&get("/unknown"), &mut sink).unwrap();

    assert!(!handled);
    assert_eq!(sink.status(), 404);
    assert!(sink.body_text().contains("/unknown"));
}

#[test]
fn declining_action_keeps_trying() {
    let dispatcher = DispatcherBuilder::<SimpleRequest, CapturedResponse>::new()
        .case(|c| {
            c.when(|w| w.any())
                .respond(action_fn(|_: &SimpleRequest, _: &mut CapturedResponse| {
                    Ok(false)
                }))
        })
        .case(|c| {
            c.when(|w| w.path().equals("/x"))
                .respond(Responder::builder().status(200).text("second").build())
        })
        .build()
        .unwrap();

    let mut sink = CapturedResponse::new();
    assert!(dispatcher.dispatch(&get("/x"), &mut sink).unwrap());
    assert_eq!(sink.body_text(), "second");
}

#[test]
fn condition_display_roundtrip_of_structure() {
    let condition = RequestConditionBuilder::<SimpleRequest>::new()
        .method().equals("GET")
        .and()
        .open_group()
            .path().starts_with("/a")
            .or()
            .path().starts_with("/b")
        .close_group()
        .build()
        .unwrap();

    assert_eq!(
        condition.to_string(),
        "( method->eq(GET) AND ( path->starts(/a) OR path->starts(/b) ) )"
    );
}
