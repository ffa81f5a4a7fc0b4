use criterion::{black_box, criterion_group, criterion_main, Criterion};
use labyrinth_core::{
    parse_board, CancelToken, Location, SearchLimits, SearchRequest, TokenId, CLASSIC_POSITION,
    SELF_DISPLACEMENT_POSITION,
};
use labyrinth_engine::{AlphaBetaSearcher, ExhaustiveSearcher};

fn search_benchmarks(c: &mut Criterion) {
    let classic = parse_board(CLASSIC_POSITION).expect("parse");
    let walled = parse_board(SELF_DISPLACEMENT_POSITION)
        .expect("parse")
        .with_previous_shift(Some(Location::new(1, 0)));

    let mut group = c.benchmark_group("search");
    group.sample_size(100);

    group.bench_function("exhaustive_two_plies", |b| {
        let mut searcher = ExhaustiveSearcher::default();
        b.iter(|| {
            searcher.search_path(
                black_box(&walled),
                SearchRequest::new(TokenId(0)),
                &CancelToken::new(),
            )
        })
    });

    group.sample_size(10);
    for depth in 1..=2u8 {
        group.bench_function(format!("alphabeta_classic_depth_{depth}"), |b| {
            let mut searcher = AlphaBetaSearcher::default();
            let request = SearchRequest::new(TokenId(0)).with_limits(SearchLimits {
                depth: Some(depth),
                time_ms: Some(10_000),
                ..Default::default()
            });
            b.iter(|| searcher.search_with_info(black_box(&classic), request, &CancelToken::new()))
        });
    }

    group.finish();
}

criterion_group!(benches, search_benchmarks);
criterion_main!(benches);
