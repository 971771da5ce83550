use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use udpprobe::collector::{bind_receive_socket, Collector, Verdict};
use udpprobe::config::{CollectorConfig, EmitterConfig};
use udpprobe::emitter::{connect_send_socket, Emitter};
use udpprobe::sequence::SequenceNumber;

#[tokio::test]
async fn test_emitter_to_collector_over_loopback() {
    let receive_socket = bind_receive_socket(0).await.unwrap();
    let port = receive_socket.local_addr().unwrap().port();

    let received: Arc<Mutex<Vec<(SequenceNumber, Verdict)>>> = Default::default();
    let collector = Collector::new(Arc::new(receive_socket), &CollectorConfig::new(port)).unwrap();
    let collector_received = received.clone();
    let collector_task = tokio::spawn(async move {
        collector.run(|sequence_number, verdict| {
            collector_received.lock().unwrap().push((sequence_number, *verdict));
        }).await
    });

    let mut config = EmitterConfig::new("127.0.0.1", 100 * 100);
    config.port = port;
    config.datagram_len = 100;
    config.duration = Duration::from_secs(1);

    let send_socket = connect_send_socket(&config.peer_host, config.port).await.unwrap();
    let emitter = Emitter::new(Arc::new(send_socket), &config).unwrap();

    let mut reports = Vec::new();
    let num_sent = emitter.run(|r| reports.push(r.num_packets)).await.unwrap();

    // timer drift may cost a few ticks, but never adds any
    assert!(num_sent <= 100, "sent {}", num_sent);
    assert!(num_sent >= 90, "sent {}", num_sent);
    assert_eq!(reports.len(), 1);
    assert!(reports[0] <= num_sent);

    sleep(Duration::from_millis(200)).await;
    collector_task.abort();

    let received = received.lock().unwrap();
    assert_eq!(received.len() as u64, num_sent);
    assert!(received.iter().all(|(_, verdict)| *verdict == Verdict::InSequence));
    assert_eq!(received.last().map(|(n, _)| n.to_raw()), Some(num_sent));
}

#[tokio::test]
async fn test_connect_to_unresolvable_host_fails() {
    assert!(connect_send_socket("no-such-host.invalid", 5201).await.is_err());
}
