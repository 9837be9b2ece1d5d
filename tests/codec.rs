use std::io::Write;

use flate2::write::GzEncoder;
use geocute::points::codec;
use geocute::{CodecError, PointStore, Quantization};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_store(seed: u64, n: usize) -> PointStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = PointStore::new();
    for _ in 0..n {
        let x = rng.random_range(5.9..15.0);
        let y = rng.random_range(47.3..55.0);
        let v = (rng.random_range(1..200) as f64) / 10.0;
        store.add(x, y, v).unwrap();
    }
    store
}

fn assert_within_quantization(original: &PointStore, decoded: &PointStore, q: &Quantization) {
    assert_eq!(decoded.len(), original.len());
    let mut a = original.iter().collect::<Vec<_>>();
    let mut b = decoded.iter().collect::<Vec<_>>();
    a.sort_by(|p, r| p.x.total_cmp(&r.x));
    b.sort_by(|p, r| p.x.total_cmp(&r.x));
    for (p, r) in a.iter().zip(&b) {
        assert!((p.x - r.x).abs() <= 1.0 / q.x_scale(), "{p:?} vs {r:?}");
        assert!((p.y - r.y).abs() <= 1.0 / q.y_scale(), "{p:?} vs {r:?}");
        assert!((p.v - r.v).abs() <= 0.5 / q.value_scale + 1e-9, "{p:?} vs {r:?}");
    }
}

#[test]
fn gzip_file_round_trip() {
    let q = Quantization::default();
    let store = random_store(1, 2_000);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.bin.gz");

    assert_eq!(store.save(&path, &q).unwrap(), store.len());
    let decoded = PointStore::load(&path, &q).unwrap();
    assert_within_quantization(&store, &decoded, &q);
}

#[test]
fn brotli_file_round_trip_with_16_bits() {
    let q = Quantization { bits: 16, ..Default::default() };
    let store = random_store(2, 500);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.bin.br");

    let written = store.save(&path, &q).unwrap();
    let decoded = PointStore::load(&path, &q).unwrap();
    assert_eq!(decoded.len(), written);
    assert!((decoded.total_weight() - store.total_weight()).abs() < 1e-6);
}

#[test]
fn duplicates_are_consolidated() {
    let q = Quantization::default();
    let mut store = random_store(3, 100);
    let copy = store.clone();
    store.extend_filtered(&copy, |_| true).unwrap();

    let (bytes, count) = codec::encode(&store, &q).unwrap();
    assert_eq!(count, 100);
    assert_eq!(bytes.len(), 100 * codec::BYTES_PER_POINT);

    let decoded = codec::decode(&bytes, &q).unwrap();
    assert!((decoded.total_weight() - store.total_weight()).abs() < 1e-6);
    let (again, again_count) = codec::encode(&decoded, &q).unwrap();
    assert_eq!(again_count, count);
    assert_eq!(again, bytes);
}

#[test]
fn truncated_file_is_a_format_error() {
    let q = Quantization::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.bin.gz");
    std::fs::write(&path, gzip(&[0u8; 19])).unwrap();

    let err = PointStore::load(&path, &q).unwrap_err();
    assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Format { .. })), "{err:?}");
}

#[test]
fn out_of_box_points_abort_encoding() {
    let q = Quantization::default();
    let mut store = random_store(4, 10);
    store.add(-3.7, 40.4, 5.0).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.bin.gz");

    let err = store.save(&path, &q).unwrap_err();
    assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Range { field: "x", .. })));
    assert!(!path.exists());
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
