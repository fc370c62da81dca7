use mimicry::{RequestConditionBuilder, SimpleRequest};

fn main() {
    // Build a condition over requests, written the way it reads
    let condition = RequestConditionBuilder::new()
        .method().equals("GET")
        .and()
        .open_group()
            .path().starts_with("/a")
            .or()
            .path().starts_with("/b")
        .close_group()
        .build()
        .expect("failed to build condition");

    println!("condition: {condition}");

    // Evaluate against a few requests
    for (method, path) in [("GET", "/abc"), ("POST", "/abc"), ("GET", "/zzz")] {
        let request = SimpleRequest::new(method, path);
        println!("{method} {path} -> {}", condition.check(&request));
    }
}
