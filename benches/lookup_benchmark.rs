//! Benchmarks for prefix index construction and queries.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ipowner::route::{
    parse_as_names, CarrierClassifier, Networks, RibReader, DEFAULT_REGISTRY_MARKER,
};
use ipowner::{NetworkRecord, PrefixIndex};
use std::net::IpAddr;

/// Generate nested IPv4 allocations: a /8 per first octet, a /16 inside
/// each, and /24s inside those.
fn generate_records(count: usize) -> Vec<NetworkRecord> {
    let mut records = Vec::with_capacity(count);
    let mut i = 0usize;

    while records.len() < count {
        let a = 1 + (i % 223) as u8;
        let b = ((i / 223) % 256) as u8;
        let c = ((i / (223 * 256)) % 256) as u8;
        let (cidr, isp) = match i % 3 {
            0 => (format!("{}.0.0.0/8", a), "电信"),
            1 => (format!("{}.{}.0.0/16", a, b), "联通"),
            _ => (format!("{}.{}.{}.0/24", a, b, c), ""),
        };
        records.push(NetworkRecord::new(
            (i % 65_000) as u32 + 1,
            format!("AS{}-NET, CN", i),
            cidr,
            isp,
        ));
        i += 1;
    }

    records
}

/// Generate query addresses - mix of hits and misses.
fn generate_queries(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            let addr = if i % 5 == 0 {
                format!("240.{}.{}.1", i % 256, (i / 256) % 256)
            } else {
                format!("{}.{}.0.7", 1 + i % 223, (i / 223) % 256)
            };
            addr.parse().unwrap()
        })
        .collect()
}

/// Benchmark containing-network queries.
fn bench_containing_networks(c: &mut Criterion) {
    let index = PrefixIndex::from_records(generate_records(100_000)).unwrap();
    let queries = generate_queries(1000);

    let mut group = c.benchmark_group("containing_networks");
    group.throughput(Throughput::Elements(queries.len() as u64));

    group.bench_function("mixed_ipv4", |b| {
        b.iter(|| {
            for addr in &queries {
                black_box(index.containing_networks(*addr));
            }
        })
    });

    let v6 = PrefixIndex::from_records(vec![
        NetworkRecord::new(4134, "CHINANET", "240e::/20", "电信"),
        NetworkRecord::new(4134, "CHINANET", "240e:100::/24", "电信"),
    ])
    .unwrap();
    let addr: IpAddr = "240e:1a0::1".parse().unwrap();
    group.bench_function("ipv6", |b| b.iter(|| black_box(v6.containing_networks(addr))));

    group.finish();
}

/// Benchmark index construction at different sizes.
fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");

    for size in [1_000, 10_000, 100_000].iter() {
        let records = generate_records(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("records", size), size, |b, _| {
            b.iter_batched(
                || records.clone(),
                |records| black_box(PrefixIndex::from_records(records).unwrap()),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Benchmark the join stage over an in-memory RIB dump.
fn bench_route_pipeline(c: &mut Criterion) {
    let registry: String = (1..=1000)
        .map(|asn| format!("AS{} CHINANET-{} Backbone, CN\n", asn, asn))
        .collect();
    let names = parse_as_names(registry.as_bytes(), DEFAULT_REGISTRY_MARKER).unwrap();
    let rib: String = (0..10_000)
        .map(|i| {
            format!(
                "TABLE_DUMP2|1517443200|B|202.97.0.1|4134|{}.{}.0.0/16|4134 {}|IGP|202.97.0.1|0|0||NAG||\n",
                1 + i % 223,
                i / 223,
                1 + i % 1500
            )
        })
        .collect();
    let classifier = CarrierClassifier::default();

    let mut group = c.benchmark_group("route_pipeline");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("join_10k_routes", |b| {
        b.iter(|| {
            let networks = Networks::new(RibReader::new(rib.as_bytes()), names.clone(), &classifier);
            black_box(networks.filter_map(Result::ok).count())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_containing_networks,
    bench_index_build,
    bench_route_pipeline,
);

criterion_main!(benches);
