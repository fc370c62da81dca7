use std::sync::Arc;
use std::thread;

use mimicry::{CapturedResponse, DispatcherBuilder, Responder, SimpleRequest};

#[test]
fn dispatch_across_threads() {
    let dispatcher = Arc::new(
        DispatcherBuilder::<SimpleRequest, CapturedResponse>::new()
            .case(|c| {
                c.when(|w| w.method().equals("GET").and().path().starts_with("/health"))
                    .respond(Responder::builder().status(200).text("ok").build())
            })
            .case(|c| {
                c.when(|w| w.path().regexp("/users/[0-9]+"))
                    .respond(
                        Responder::builder()
                            .status(200)
                            .content_type("application/json")
                            .text(r#"{"id":1}"#)
                            .build(),
                    )
            })
            .case(|c| {
                c.when(|w| w.any())
                    .respond(Responder::builder().status(403).text("denied").build())
            })
            .build()
            .unwrap(),
    );

    let mut handles = vec![];

    // Thread 1: health check -> first case
    let d = Arc::clone(&dispatcher);
    handles.push(thread::spawn(move || {
        let mut sink = CapturedResponse::new();
        d.dispatch(&SimpleRequest::new("GET", "/health"), &mut sink)
            .unwrap();
        sink
    }));

    // Thread 2: user lookup -> second case (pattern leaf exercises the
    // precompiled regex concurrently)
    let d = Arc::clone(&dispatcher);
    handles.push(thread::spawn(move || {
        let mut sink = CapturedResponse::new();
        d.dispatch(&SimpleRequest::new("GET", "/users/7"), &mut sink)
            .unwrap();
        sink
    }));

    // Thread 3: anything else -> catch-all
    let d = Arc::clone(&dispatcher);
    handles.push(thread::spawn(move || {
        let mut sink = CapturedResponse::new();
        d.dispatch(&SimpleRequest::new("PUT", "/admin"), &mut sink)
            .unwrap();
        sink
    }));

    // Thread 4: repeated dispatches against the same shared rules
    let d = Arc::clone(&dispatcher);
    handles.push(thread::spawn(move || {
        let mut last = CapturedResponse::new();
        for _ in 0..100 {
            let mut sink = CapturedResponse::new();
            d.dispatch(&SimpleRequest::new("GET", "/users/99"), &mut sink)
                .unwrap();
            last = sink;
        }
        last
    }));

    let results: Vec<CapturedResponse> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results[0].body_text(), "ok");
    assert_eq!(results[1].body_text(), r#"{"id":1}"#);
    assert_eq!(results[2].status(), 403);
    assert_eq!(results[3].body_text(), r#"{"id":1}"#);
}
