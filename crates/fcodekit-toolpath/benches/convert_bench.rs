use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fcodekit_toolpath::{convert, FcodeV1Writer, FcodeV2Writer, GcodeParser, GcodeWriter};

fn sample_program(lines: usize) -> String {
    let mut program = String::from("G21\nG90\nM104 S200\nG28\n");
    for i in 0..lines {
        let x = (i % 200) as f32 * 0.5;
        let y = (i / 200) as f32 * 0.5;
        program.push_str(&format!("G1 F{} X{x} Y{y} E{}\n", 1200 + i % 600, i as f32 * 0.01));
    }
    program
}

fn bench_convert(c: &mut Criterion) {
    let program = sample_program(20_000);
    let mut group = c.benchmark_group("convert");
    group.throughput(Throughput::Bytes(program.len() as u64));

    group.bench_function("parse_only", |b| {
        b.iter(|| {
            let mut writer = GcodeWriter::new(std::io::sink());
            GcodeParser::new(&mut writer).parse_str(black_box(&program));
        })
    });

    group.bench_function("fcode_v1", |b| {
        b.iter(|| {
            let mut writer = FcodeV1Writer::new(Cursor::new(Vec::new()), "EXTRUDER").unwrap();
            convert(black_box(program.as_bytes()), &mut writer).unwrap();
            writer.into_inner()
        })
    });

    group.bench_function("fcode_v2", |b| {
        b.iter(|| {
            let mut writer = FcodeV2Writer::new(Cursor::new(Vec::new())).unwrap();
            convert(black_box(program.as_bytes()), &mut writer).unwrap();
            writer.into_inner()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
