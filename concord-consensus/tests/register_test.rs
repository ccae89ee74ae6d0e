mod support;

use std::time::Duration;

use concord_common::{Payload, Value};
use concord_consensus::ConsensusConfig;
use rand::Rng;
use support::{port_of, Cluster};

const WAIT: Duration = Duration::from_secs(5);

fn is_write_return(p: &Payload) -> bool {
    matches!(p, Payload::AppWriteReturn { .. })
}

fn read_value(p: &Payload) -> Option<Value> {
    match p {
        Payload::AppReadReturn { value, .. } => Some(*value),
        _ => None,
    }
}

#[tokio::test]
async fn test_write_then_read_returns_written_value() {
    let mut cluster = Cluster::start(3, ConsensusConfig::default());

    // 1. Write 42 through process 1
    cluster.write(1, "x", 42).await;
    let acks = cluster.collect(1, WAIT, is_write_return).await;
    assert_eq!(acks, vec![(port_of(1), Payload::AppWriteReturn { register: "x".into() })]);

    // 2. Read it back through process 2
    cluster.read(2, "x").await;
    let reads = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
    assert_eq!(
        reads,
        vec![(port_of(2), Payload::AppReadReturn { register: "x".into(), value: Value::defined(42) })]
    );

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_read_before_any_write_is_undefined() {
    let mut cluster = Cluster::start(3, ConsensusConfig::default());

    cluster.read(3, "empty").await;
    let reads = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
    assert_eq!(reads.len(), 1);
    assert_eq!(read_value(&reads[0].1), Some(Value::UNDEFINED));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_registers_are_independent() {
    let mut cluster = Cluster::start(3, ConsensusConfig::default());

    cluster.write(1, "a", 1).await;
    cluster.write(2, "b", 2).await;
    assert_eq!(cluster.collect(2, WAIT, is_write_return).await.len(), 2);

    cluster.read(3, "a").await;
    let a = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
    assert_eq!(a[0].1, Payload::AppReadReturn { register: "a".into(), value: Value::defined(1) });

    cluster.read(3, "b").await;
    let b = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
    assert_eq!(b[0].1, Payload::AppReadReturn { register: "b".into(), value: Value::defined(2) });

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_sequential_random_writes_read_latest() {
    let mut cluster = Cluster::start(3, ConsensusConfig::default());
    let mut rng = rand::thread_rng();

    let values: Vec<i64> = (0..10).map(|_| rng.gen_range(-1000..1000)).collect();
    for v in &values {
        let writer = rng.gen_range(1..=3);
        cluster.write(writer, "r", *v).await;
        assert_eq!(cluster.collect(1, WAIT, is_write_return).await.len(), 1);
    }

    let reader = rng.gen_range(1..=3);
    cluster.read(reader, "r").await;
    let reads = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
    assert_eq!(read_value(&reads[0].1), values.last().copied().map(Value::defined));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_writes_agree_on_one_value() {
    let mut cluster = Cluster::start(3, ConsensusConfig::default());

    futures::future::join_all((1..=3).map(|i| cluster.write(i, "c", i as i64 * 10))).await;
    assert_eq!(cluster.collect(3, WAIT, is_write_return).await.len(), 3);

    let mut seen = Vec::new();
    for i in 1..=3 {
        cluster.read(i, "c").await;
        let reads = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
        seen.push(read_value(&reads[0].1).and_then(|v| v.get()));
    }

    assert!(matches!(seen[0], Some(10) | Some(20) | Some(30)), "got {:?}", seen);
    assert!(seen.iter().all(|v| *v == seen[0]), "reads diverged: {:?}", seen);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_register_survives_minority_crash() {
    let mut cluster = Cluster::start(3, ConsensusConfig::default());
    cluster.crash(3);

    cluster.write(1, "x", 5).await;
    assert_eq!(cluster.collect(1, WAIT, is_write_return).await.len(), 1);

    cluster.read(2, "x").await;
    let reads = cluster.collect(1, WAIT, |p| read_value(p).is_some()).await;
    assert_eq!(read_value(&reads[0].1), Some(Value::defined(5)));

    cluster.shutdown().await;
}
