use combstruct::registry::NodeRegistry;
use combstruct::{lexer::Lexer, parse, parser::Parser};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ============================================================================
// Test Data: Varying Complexity and Size
// ============================================================================

const TINY_GRAMMAR: &str = "{ A = Atom }";

const SMALL_GRAMMAR: &str = r#"{
    B = Union(Leaf, Node),
    Leaf = Epsilon,
    Node = Prod(Z, B, B)
}"#;

const MEDIUM_GRAMMAR: &str = r#"
# Cographs and their labelled variants
{
    C = Union(S, P, Z),
    S = Set(Union(P, Z), card >= 2),
    P = Set(Union(S, Z), card >= 2),
    N = Cycle(Bead, card <= 5),
    Bead = Sequence(Atom, card >= 1),
    F = PowerSet(Prod(Z, Sequence(Z)), card = 3)
}"#;

const LARGE_GRAMMAR: &str = r#"
# Series-parallel networks, forests and a few restricted constructions
{
    G = Union(Z, Ser, Par),
    Ser = Sequence(Union(Z, Par), card >= 2),
    Par = Set(Union(Z, Ser), card >= 2),
    T = Prod(Z, Set(T)),
    F = Set(T),
    U = Prod(Z, Sequence(U)),
    Perm = Set(Cycle(Z)),
    Inv = Set(Cycle(Z, card <= 2)),
    Der = Set(Cycle(Z, card >= 2)),
    Comp = Sequence(Sequence(Z, card >= 1)),
    Part = Set(Set(Z, card >= 1)),
    Word = Sequence(Union(Atom, Epsilon, Z)),
    Sub = Subst(Set(Z, card >= 1), Cycle(Z)),
    Pow = PowerSet(Prod(Z, Z, Z), card = 4),
}"#;

// Generate a long chain of statements for stress testing
fn generate_xlarge_grammar(statement_count: usize) -> String {
    let mut grammar = String::from("{\n");
    for i in 0..statement_count {
        grammar.push_str(&format!(
            "    S{} = Union(Prod(Z, S{}), Set(Atom, card <= {}), Epsilon),\n",
            i,
            i + 1,
            i % 7
        ));
    }
    grammar.push_str(&format!("    S{statement_count} = Z\n}}"));
    grammar
}

const SIZED: [(&str, &str); 4] = [
    ("tiny", TINY_GRAMMAR),
    ("small", SMALL_GRAMMAR),
    ("medium", MEDIUM_GRAMMAR),
    ("large", LARGE_GRAMMAR),
];

// ============================================================================
// Lexer Benchmarks
// ============================================================================

fn bench_lexer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_by_size");

    for (name, source) in SIZED {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| {
                let mut lexer = Lexer::new(black_box(src));
                lexer.lex()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parser_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_by_size");

    for (name, source) in SIZED {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| {
                let mut registry = NodeRegistry::new();
                let mut parser = Parser::new(black_box(src));
                parser.parse_grammar(&mut registry);
                registry
            })
        });
    }

    group.finish();
}

fn bench_parser_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_statement_scaling");

    for size in [10, 50, 100, 500, 1000] {
        let source = generate_xlarge_grammar(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| {
                let mut registry = NodeRegistry::new();
                let mut parser = Parser::new(black_box(src));
                parser.parse_grammar(&mut registry);
                registry
            })
        });
    }

    group.finish();
}

fn bench_parser_failure(c: &mut Criterion) {
    // The failure lands at the very end, so the whole partial tree is drained.
    let mut source = generate_xlarge_grammar(500);
    source.push_str(" }");

    c.bench_function("parser_failure_after_500_statements", |b| {
        b.iter(|| parse(black_box(&source), "failure.mpl"))
    });
}

// ============================================================================
// Rendering Benchmarks
// ============================================================================

fn bench_render_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_text_scaling");

    for size in [10, 100, 1000] {
        let parsed = parse(&generate_xlarge_grammar(size), "bench.mpl");
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &parsed, |b, parsed| {
            b.iter(|| black_box(parsed).to_text())
        });
    }

    group.finish();
}

fn bench_render_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_json_scaling");

    for size in [10, 100, 1000] {
        let parsed = parse(&generate_xlarge_grammar(size), "bench.mpl");
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &parsed, |b, parsed| {
            b.iter(|| black_box(parsed).to_json())
        });
    }

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_e2e(c: &mut Criterion) {
    let mut group = c.benchmark_group("e2e_parse_and_json");

    for (name, source) in SIZED {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| parse(black_box(src), "bench.mpl").to_json())
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(lexer_benches, bench_lexer_sizes);

criterion_group!(
    parser_benches,
    bench_parser_sizes,
    bench_parser_scaling,
    bench_parser_failure
);

criterion_group!(render_benches, bench_render_text, bench_render_json);

criterion_group!(e2e_benches, bench_e2e);

criterion_main!(lexer_benches, parser_benches, render_benches, e2e_benches);
