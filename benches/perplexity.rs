use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ngramlm::{perplexity, Interpolation, NgramModel, Sentence};

fn build_corpus() -> Vec<Sentence> {
    // Cycle a small vocabulary into varied sentences.
    let words = [
        "the", "cat", "dog", "sat", "ran", "on", "to", "mat", "rug", "a",
    ];
    let mut corpus = Vec::with_capacity(2048);
    for i in 0..2048_usize {
        let mut sentence: Sentence = vec!["<s>".to_owned()];
        for j in 0..12_usize {
            sentence.push(words[(i * 7 + j * 3) % words.len()].to_owned());
        }
        sentence.push("</s>".to_owned());
        corpus.push(sentence);
    }
    corpus
}

fn bench_perplexity(c: &mut Criterion) {
    let corpus = build_corpus();
    let total_tokens: usize = corpus.iter().map(|sentence| sentence.len()).sum();
    let models: Vec<NgramModel> = (1..=4)
        .map(|n| {
            let mut model = NgramModel::new(n).expect("valid order");
            model.train(&corpus);
            model
        })
        .collect();
    let interp =
        Interpolation::new(&models, vec![0.1, 0.2, 0.3, 0.4]).expect("valid composition");

    let mut group = c.benchmark_group("perplexity");
    group.throughput(Throughput::Elements(total_tokens as u64));
    group.bench_function(BenchmarkId::from_parameter("interpolated_4gram"), |b| {
        b.iter(|| {
            let pp = perplexity(&interp, &corpus);
            let _ = black_box(pp);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_perplexity);
criterion_main!(benches);
