//! Front-end throughput: lexing, directive resolution and program synthesis.

use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use sgtt_template::{
    IncludeLookup, MemorySource, ProgramOptions, ResolveOptions, SourceFile, lex, resolve,
    synthesize,
};

const ROWS: usize = 500;

fn template() -> String {
    let mut text = String::from("<#@ include file=\"header.ttinc\" once=\"true\" #>\n");
    text.push_str("namespace Generated {\n");
    for i in 0..ROWS {
        text.push_str(&format!(
            "    public const int Value{i} = <#= {i} * 2 #>; // \"quoted\" \\<# literal #>\n"
        ));
    }
    text.push_str("<# for i = 1, 10 do #>    // row <#= i #>\n<# end #>}\n");
    text
}

fn includes() -> IncludeLookup {
    [Arc::new(MemorySource::new(
        "/bench/header.ttinc",
        "// <#= \"header\" #>\n",
    )) as Arc<dyn SourceFile>]
    .into_iter()
    .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let text = template();
    let includes = includes();
    let path = Path::new("/bench/main.sgtt");
    let resolve_options = ResolveOptions::default();
    let program_options = ProgramOptions::new(path);

    c.bench_function("lex", |b| b.iter(|| lex(black_box(&text)).count()));

    c.bench_function("resolve", |b| {
        b.iter(|| resolve(path, black_box(&text), &includes, &resolve_options))
    });

    let resolution = resolve(path, &text, &includes, &resolve_options);
    c.bench_function("synthesize", |b| {
        b.iter(|| synthesize(black_box(&resolution), &program_options))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
