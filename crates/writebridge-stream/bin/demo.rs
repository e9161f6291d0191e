//! Demonstration of writebridge pipelines.
//!
//! Run with: `cargo run -p writebridge-stream --features demo --bin demo`
//! Set `RUST_LOG=writebridge=trace` to watch demand pacing.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use writebridge::{BridgeError, WriteSink, WriteStreamSubscriber};
use writebridge_stream::{
    byte_queue, completion, pipe, spawn_pipe, PipeConfig, QueueConfig, QueueError, StreamExt,
    StreamPublisher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== writebridge Demo ===\n");

    demo_basic_pipe().await?;
    demo_backpressure().await?;
    demo_manual_wiring().await?;
    demo_cancellation().await?;
    demo_upstream_failure().await?;
    demo_sink_failure().await?;

    println!("\n=== All demos completed successfully! ===");
    Ok(())
}

fn chunks(parts: &[&'static str]) -> impl futures_core::Stream<Item = Result<Bytes, std::io::Error>> {
    let items: Vec<Result<Bytes, std::io::Error>> =
        parts.iter().map(|&p| Ok(Bytes::from_static(p.as_bytes()))).collect();
    futures_util::stream::iter(items)
}

/// Demo 1: Pipe a stream into a queue and read it back
async fn demo_basic_pipe() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 1: Basic Pipe ---");

    let (queue, mut reader) = byte_queue(QueueConfig::default());

    let consumer = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(buf) = reader.next().await {
            received.push(buf);
        }
        received
    });

    pipe(chunks(&["hello", " ", "world"]), queue).await?;
    let received = consumer.await?;

    let text: Vec<u8> = received.iter().flat_map(|b| b.iter().copied()).collect();
    println!("  Received {} chunks: {:?}", received.len(), String::from_utf8_lossy(&text));
    println!("  ✓ Basic pipe complete\n");
    Ok(())
}

/// Demo 2: A slow reader pauses the producer through drain-based demand
async fn demo_backpressure() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 2: Backpressure ---");

    let (queue, mut reader) = byte_queue(QueueConfig::new(4));
    let source = futures_util::stream::iter(
        (0..64).map(|i| Ok::<_, std::io::Error>(Bytes::from(format!("chunk-{i:02}")))),
    );

    let handle = spawn_pipe(source, Arc::clone(&queue), PipeConfig::default().with_name("slow-reader"));

    let consumer = tokio::spawn(async move {
        let mut max_buffered = 0;
        let mut count = 0;
        while let Some(_buf) = reader.next().await {
            max_buffered = max_buffered.max(reader.buffered_count() + 1);
            count += 1;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        (count, max_buffered)
    });

    let metrics = Arc::clone(handle.metrics());
    handle.join().await?;
    let (count, max_buffered) = consumer.await?;

    let snapshot = metrics.snapshot();
    println!("  Reader consumed {} chunks, never more than {} queued", count, max_buffered);
    println!(
        "  Demand requested: {} ({} after drain), pauses: {}",
        snapshot.demand_requested, snapshot.drain_requests, snapshot.backpressure_pauses
    );
    println!("  ✓ Backpressure complete\n");
    Ok(())
}

/// Demo 3: Wiring adapter, publisher and completion by hand
async fn demo_manual_wiring() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 3: Manual Wiring ---");

    let (queue, mut reader) = byte_queue(QueueConfig::new(2));
    let (notifier, done) = completion();

    // Callbacks are registered on the queue before anything subscribes.
    let adapter = Arc::new(
        WriteStreamSubscriber::builder(Arc::clone(&queue), notifier)
            .name("manual")
            .build(),
    );
    println!("  Adapter delegate is our queue: {}", Arc::ptr_eq(adapter.delegate(), &queue));

    let task = StreamPublisher::new(chunks(&["first", "second", "third"])).subscribe(adapter.clone());

    let mut received = Vec::new();
    while let Some(buf) = reader.next().await {
        received.push(String::from_utf8_lossy(&buf).into_owned());
    }
    done.await?;
    task.await?;

    println!("  Received in order: {:?}", received);
    println!("  Queue ended: {}", queue.is_ended());
    println!("  ✓ Manual wiring complete\n");
    Ok(())
}

/// Demo 4: Cancelling a pipe is a successful finish
async fn demo_cancellation() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 4: Cancellation ---");

    let (queue, _reader) = byte_queue(QueueConfig::new(2));
    // An endless source: only cancellation can stop it.
    let endless = futures_util::stream::repeat_with(|| Ok::<_, std::io::Error>(Bytes::from_static(b"tick")));

    let handle = spawn_pipe(endless, Arc::clone(&queue), PipeConfig::default().with_name("endless"));
    let canceller = handle.canceller();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let outcome = handle.join().await;
    println!("  Outcome: {:?}, queue ended: {}, queued: {}", outcome, queue.is_ended(), queue.len());
    println!("  ✓ Cancellation complete\n");
    Ok(())
}

/// Demo 5: Upstream errors fail the pipe without ending the sink
async fn demo_upstream_failure() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 5: Upstream Failure ---");

    let (queue, _reader) = byte_queue(QueueConfig::default());
    let source = futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::other("source truncated")),
    ]);

    match pipe(source, Arc::clone(&queue)).await {
        Err(BridgeError::Upstream(e)) => println!("  Upstream failed: {}", e),
        other => println!("  Unexpected outcome: {:?}", other),
    }
    println!("  Queue ended: {} (left to the transport)", queue.is_ended());
    println!("  ✓ Upstream failure complete\n");
    Ok(())
}

/// Demo 6: The reader going away fails the pipe from the sink side
async fn demo_sink_failure() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 6: Sink Failure ---");

    let (queue, reader) = byte_queue(QueueConfig::new(2));
    let endless = futures_util::stream::repeat_with(|| Ok::<_, std::io::Error>(Bytes::from_static(b"data")));
    let handle = spawn_pipe(endless, Arc::clone(&queue), PipeConfig::default().with_name("orphaned"));

    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(reader);

    match handle.join().await {
        Err(err @ BridgeError::Sink(_)) => {
            let closed = err
                .source_error()
                .and_then(|e| e.downcast_ref::<QueueError>())
                .is_some_and(|e| *e == QueueError::Closed);
            println!("  Sink failed: {} (reader closed: {})", err, closed);
        }
        other => println!("  Unexpected outcome: {:?}", other),
    }
    println!("  Queue full when the reader left: {}", queue.is_full());
    println!("  ✓ Sink failure complete\n");
    Ok(())
}
