use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tdms_stream::{TdmsFileReader, TdmsFileWriter};

const ELEMENTS_PER_WRITE: usize = 1_000_000;

fn write_single_segment(c: &mut Criterion) {
    let write_data = (0..ELEMENTS_PER_WRITE)
        .map(|i| i as f64)
        .collect::<Vec<_>>();

    let mut group = c.benchmark_group("Writer Single Channel Single Segment");
    group.throughput(criterion::Throughput::Bytes(
        ELEMENTS_PER_WRITE as u64 * std::mem::size_of::<f64>() as u64,
    ));
    group.bench_function("contiguous", |b| {
        b.iter_batched_ref(
            || tempfile::NamedTempFile::new().unwrap(),
            |file| {
                let mut writer = TdmsFileWriter::create(file.path()).unwrap();
                writer
                    .write_data("group", "channel", &write_data[..])
                    .unwrap();
                writer.close().unwrap();
            },
            criterion::BatchSize::PerIteration,
        );
    });
}

fn write_multi_segment(c: &mut Criterion) {
    let write_data = (0..ELEMENTS_PER_WRITE)
        .map(|i| i as f64)
        .collect::<Vec<_>>();

    let mut group = c.benchmark_group("Writer Multi Channel Multi Segment");
    group.throughput(criterion::Throughput::Bytes(
        ELEMENTS_PER_WRITE as u64 * std::mem::size_of::<f64>() as u64 * 4,
    ));
    group.bench_function("four segments", |b| {
        b.iter_batched_ref(
            || tempfile::NamedTempFile::new().unwrap(),
            |file| {
                let mut writer = TdmsFileWriter::create(file.path()).unwrap();
                for _ in 0..4 {
                    for channel in ["channel0", "channel1", "channel2", "channel3"] {
                        writer
                            .write_data("group", channel, &write_data[..])
                            .unwrap();
                    }
                    writer.flush().unwrap();
                }
                writer.close().unwrap();
            },
            criterion::BatchSize::PerIteration,
        );
    });
}

fn read_full_channel(c: &mut Criterion) {
    let write_data = (0..ELEMENTS_PER_WRITE)
        .map(|i| i as f64)
        .collect::<Vec<_>>();

    for segments in [1u32, 16] {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = TdmsFileWriter::create(file.path()).unwrap();
        for _ in 0..segments {
            writer
                .write_data("group", "channel", &write_data[..])
                .unwrap();
            writer.flush().unwrap();
        }
        writer.close().unwrap();

        let mut group = c.benchmark_group("Reader Full Channel");
        group.throughput(criterion::Throughput::Bytes(
            ELEMENTS_PER_WRITE as u64 * std::mem::size_of::<f64>() as u64 * segments as u64,
        ));
        group.bench_with_input(
            BenchmarkId::from_parameter(segments),
            &segments,
            |b, _segments| {
                b.iter(|| {
                    let mut reader = TdmsFileReader::open(file.path()).unwrap();
                    let data: Vec<f64> = reader.read_data("group", "channel").unwrap();
                    assert_eq!(data.len(), ELEMENTS_PER_WRITE * segments as usize);
                });
            },
        );
    }
}

criterion_group!(
    engine,
    write_single_segment,
    write_multi_segment,
    read_full_channel
);
criterion_main!(engine);
