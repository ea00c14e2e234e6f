//! 🏎️ How long does one update take to become a record, and that record a JSON line?

use std::hint::black_box;

use botlytics::{BotIdentity, FieldFilter, IncomingUpdate, Normalizer};
use criterion::{Criterion, criterion_group, criterion_main};

const TEXT_MESSAGE: &str = r#"{"update_id":1,"message":{"message_id":11,"date":1700000000,"from":{"id":9,"is_bot":false,"first_name":"Ann","last_name":"Lee","username":"ann","language_code":"en"},"chat":{"id":-100123,"type":"supergroup","title":"Club","is_forum":true},"message_thread_id":4,"is_topic_message":true,"text":"hello there","forward_origin":{"type":"channel","date":1699999999,"chat":{"id":-100999,"type":"channel","title":"News"},"message_id":77,"author_signature":"Ed"}}}"#;

const CHAT_MEMBER: &str = r#"{"update_id":2,"chat_member":{"chat":{"id":-200,"type":"group","title":"G"},"from":{"id":1,"first_name":"Admin"},"date":3,"old_chat_member":{"status":"member","user":{"id":55,"first_name":"Bob"}},"new_chat_member":{"status":"kicked","user":{"id":55,"first_name":"Bob"}}}}"#;

fn me() -> BotIdentity {
    BotIdentity {
        id: 4242,
        first_name: "Counter".into(),
        last_name: None,
        username: "counter_bot".into(),
    }
}

fn parse_bench(c: &mut Criterion) {
    c.bench_function("parse_text_message", |b| {
        b.iter(|| {
            let incoming = IncomingUpdate::from_json(black_box(TEXT_MESSAGE)).expect("bench fixture parses");
            black_box(incoming);
        });
    });
}

fn normalize_bench(c: &mut Criterion) {
    let normalizer = Normalizer::new(me()).expect("bench bot id is non-zero");
    let text = IncomingUpdate::from_json(TEXT_MESSAGE).expect("bench fixture parses");
    let member = IncomingUpdate::from_json(CHAT_MEMBER).expect("bench fixture parses");

    c.bench_function("normalize_text_message", |b| {
        b.iter(|| black_box(normalizer.normalize(black_box(&text))));
    });
    c.bench_function("normalize_chat_member", |b| {
        b.iter(|| black_box(normalizer.normalize(black_box(&member))));
    });
}

fn render_bench(c: &mut Criterion) {
    let normalizer = Normalizer::new(me()).expect("bench bot id is non-zero");
    let text = IncomingUpdate::from_json(TEXT_MESSAGE).expect("bench fixture parses");
    let record = normalizer.normalize(&text).expect("bench fixture normalizes");
    let everything = FieldFilter::All;
    let without_payload = FieldFilter::Exclude(["payload".to_string()].into_iter().collect());

    c.bench_function("render_all_fields", |b| {
        b.iter(|| black_box(everything.render(black_box(&record))));
    });
    c.bench_function("render_excluding_payload", |b| {
        b.iter(|| black_box(without_payload.render(black_box(&record))));
    });
}

criterion_group!(benches, parse_bench, normalize_bench, render_bench);
criterion_main!(benches);
