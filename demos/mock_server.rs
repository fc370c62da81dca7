use mimicry::{CapturedResponse, DispatcherBuilder, Responder, RequestView, SimpleRequest};

fn main() {
    // A small mock service: a health endpoint, a JSON user lookup, and a
    // JSON-body-driven echo
    let dispatcher = DispatcherBuilder::<SimpleRequest, CapturedResponse>::new()
        .case(|c| {
            c.when(|w| w.method().equals("GET").and().path().equals("/health"))
                .respond(
                    Responder::builder()
                        .name("health")
                        .status(200)
                        .content_type("text/plain")
                        .text("ok")
                        .build(),
                )
        })
        .case(|c| {
            c.when(|w| w.method().equals("GET").and().path().matches("/users/*"))
                .respond(
                    Responder::builder()
                        .name("user lookup")
                        .status(200)
                        .content_type("application/json")
                        .text(r#"{"id":42,"name":"alice"}"#)
                        .build(),
                )
        })
        .case(|c| {
            c.when(|w| {
                w.method().equals("POST")
                    .and()
                    .json_content(&["kind"]).equals("ping")
            })
            .respond(
                Responder::builder()
                    .name("ping")
                    .status(202)
                    .text("pong")
                    .build(),
            )
        })
        .build()
        .expect("failed to build dispatcher");

    println!("{}", dispatcher.configuration_info());

    let requests = [
        SimpleRequest::new("GET", "/health"),
        SimpleRequest::new("GET", "/users/42"),
        SimpleRequest::new("POST", "/events").with_body(r#"{"kind":"ping"}"#),
        SimpleRequest::new("GET", "/missing"),
    ];

    for request in requests {
        let mut sink = CapturedResponse::new();
        let handled = dispatcher
            .handle(&request, &mut sink)
            .expect("dispatch failed");
        println!(
            "{} -> handled={handled} status={} body={:?}",
            request.path().as_deref().unwrap_or(""),
            sink.status(),
            sink.body_text(),
        );
    }
}
