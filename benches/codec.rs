use binlift::{codec, EdgeLabel, EdgeType, Ir, Module, Referent, SectionFlags};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

fn synthetic_ir(blocks: u64) -> Ir {
    let mut m = Module::builder("bench").with_derived_id().build();
    m.add_section(".text", 0x1000, blocks * 0x10, SectionFlags::code())
        .unwrap();
    let ext = m.add_proxy_block().unwrap();
    let mut prev = None;
    for i in 0..blocks {
        let b = m.add_code_block(0x1000 + i * 0x10, 0x10).unwrap();
        if let Some(p) = prev {
            m.add_edge(p, b, EdgeLabel::new(EdgeType::Fallthrough)).unwrap();
        }
        if i % 8 == 0 {
            m.add_edge(b, ext, EdgeLabel::new(EdgeType::Call)).unwrap();
            m.add_symbol(format!("fn_{}", i), Referent::Block(b)).unwrap();
        }
        prev = Some(b);
    }
    let mut ir = Ir::new();
    ir.add_module(m).unwrap();
    ir
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    for blocks in [1_000u64, 20_000] {
        let ir = synthetic_ir(blocks);
        let bytes = codec::encode(&ir).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(format!("encode/{}", blocks), |b| {
            b.iter(|| codec::encode(&ir).unwrap())
        });
        group.bench_function(format!("decode/{}", blocks), |b| {
            b.iter(|| codec::decode(&bytes).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
