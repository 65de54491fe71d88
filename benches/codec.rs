use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use step_passage::{
    ExtraVersions, InterlinearMode, PassageResolver, PassageState, SearchUrlState, VersionCatalog,
    build_search_url, normalize_bookmark_key, parse_query_into_state,
};

fn bench_bookmark_keys(c: &mut Criterion) {
    const CASES: &[(&str, &str)] = &[
        ("short", "q=hello|version=NIV|version=ESV"),
        (
            "mixed",
            "text=love|reference=John.3|version=KJV|strong=G0026|version=ESV|version=NIV|meanings=agape",
        ),
    ];
    for &(label, args) in CASES {
        c.bench_with_input(BenchmarkId::new("bookmark_key", label), &args, |b, &args| {
            b.iter(|| black_box(normalize_bookmark_key(args)));
        });
    }
}

fn bench_url_round_trip(c: &mut Criterion) {
    let state = SearchUrlState {
        query: "version=ESV|reference=Rom.8".to_string(),
        options: "HVNG".to_string(),
        display: "COLUMN_COMPARE".to_string(),
        page: "2".to_string(),
        context: 1,
        filter: "G0026".to_string(),
        sort: "VOCABULARY".to_string(),
        position: 1,
    };
    c.bench_function("url::build_then_parse", |b| {
        b.iter(|| {
            let url = build_search_url(&state, false);
            black_box(parse_query_into_state(&url));
        });
    });
}

fn bench_effective_mode(c: &mut Criterion) {
    let catalog = VersionCatalog::builtin();
    let resolver = PassageResolver::new(catalog);
    const EXTRAS: &[&str] = &["ESV", "ESV,SBLG,OSMHB", "ESV,NIV,LXX,WLC"];
    for &extra in EXTRAS {
        let state = PassageState {
            detail_level: 2,
            extra_versions: ExtraVersions::parse(extra),
            interlinear_mode: InterlinearMode::Interlinear,
            ..PassageState::new(0)
        };
        c.bench_with_input(
            BenchmarkId::new("effective_interlinear_mode", extra),
            &state,
            |b, state| {
                b.iter(|| black_box(resolver.effective_interlinear_mode(state)));
            },
        );
    }
}

criterion_group!(
    benches,
    bench_bookmark_keys,
    bench_url_round_trip,
    bench_effective_mode
);
criterion_main!(benches);
