use catalog_core::tokenizer::tokenize;
use catalog_core::{Catalog, RawRecord};
use criterion::{criterion_group, criterion_main, Criterion};

const DESCRIPTION: &str = "Defend the galaxy in this epic space shooter. Upgrade your ships, \
    battle waves of alien raiders and climb the global leaderboards. Play offline, \
    unlock dozens of weapons and challenge your friends in real-time multiplayer battles.";

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_description", |b| b.iter(|| tokenize(DESCRIPTION)));
}

fn bench_search(c: &mut Criterion) {
    let catalog = Catalog::temporary().expect("temporary catalog");
    for i in 0..200 {
        let record = RawRecord {
            title: Some(format!("Space Raiders {i}")),
            description: Some(DESCRIPTION.to_string()),
            categories: vec!["Action".into(), "Arcade".into()],
            rating: Some("4.4".into()),
            icon_url: None,
        };
        let url = format!("https://play.google.com/store/apps/details?id=com.example.game{i}");
        catalog.ingest(&url, record).expect("ingest");
    }
    c.bench_function("search_two_terms", |b| b.iter(|| catalog.search("space shooter").expect("search")));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
