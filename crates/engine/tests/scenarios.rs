//! End-to-end pipeline scenarios
//!
//! Whole-instance behavior through the public API: staged flows,
//! filtering, recycling, disabled stages, and conservation of items.

use piper_engine::{EngineDefaults, Pipeline, PipelineError, Segment};

fn identity(label: &str) -> Segment<i64> {
    Segment::process(label, |flow, batch| {
        flow.emit(batch);
        Ok(())
    })
}

#[test]
fn halving_filter() {
    let segment = Segment::process("half", |flow, batch: Vec<i64>| {
        flow.emit(batch.into_iter().map(|x| x / 2).collect());
        Ok(())
    })
    .with_batch_size(2)
    .with_allow(|x| x % 2 == 0);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3, 4, 5]);
    pipeline.flush().unwrap();

    // Odds skip the segment in arrival order, then the halved evens.
    assert_eq!(pipeline.dequeue(5).unwrap(), vec![1, 3, 5, 1, 2]);
}

#[test]
fn emit_doubling() {
    let segment = Segment::process("double", |flow, batch: Vec<i64>| {
        flow.emit(batch.into_iter().map(|x| x * 2).collect());
        Ok(())
    })
    .with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3]);
    pipeline.flush().unwrap();

    assert_eq!(pipeline.dequeue(3).unwrap(), vec![2, 4, 6]);
}

#[test]
fn recycle_until_odd() {
    // Halve; even non-zero results go back head-of-line, odd ones leave.
    let segment = Segment::process("mod_power_2", |flow, batch: Vec<i64>| {
        for x in batch {
            let halved = x / 2;
            if halved > 0 && halved % 2 == 0 {
                flow.recycle(vec![halved]);
            } else {
                flow.emit(vec![halved]);
            }
        }
        Ok(())
    })
    .with_batch_size(3)
    .with_allow(|x| x % 2 == 0);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![2, 3, 4]);
    pipeline.process_batch().unwrap();

    // 3 was filtered straight through, 2 halved to 1 and emitted, 4
    // halved to 2 and recycled.
    assert_eq!(pipeline.pending(), 1);
    assert_eq!(pipeline.ready(), 2);

    pipeline.flush().unwrap();
    assert_eq!(pipeline.dequeue(3).unwrap(), vec![3, 1, 1]);
}

#[test]
fn disabled_stage_equals_removed_stage() {
    let add = |label: &str, delta: i64| {
        Segment::process(label, move |flow, batch: Vec<i64>| {
            flow.emit(batch.into_iter().map(|x| x + delta).collect());
            Ok(())
        })
        .with_batch_size(4)
    };

    let full = Segment::pipeline("main", vec![add("one", 1), add("two", 10), add("three", 100)]);
    let mut disabled = Pipeline::init(full, ()).unwrap();
    let middle = disabled.find_segment("two").unwrap();
    disabled.set_enabled(middle, Some(false));

    let trimmed = Segment::pipeline("main", vec![add("one", 1), add("three", 100)]);
    let mut reference = Pipeline::init(trimmed, ()).unwrap();

    let input: Vec<i64> = (1..=10).collect();
    disabled.enqueue(input.clone());
    reference.enqueue(input);
    disabled.flush().unwrap();
    reference.flush().unwrap();

    assert_eq!(
        disabled.dequeue(10).unwrap(),
        reference.dequeue(10).unwrap()
    );
}

#[test]
fn inject_at_unknown_address_raises() {
    let segment = Segment::process("a", |flow, batch: Vec<i64>| {
        flow.inject_at("bad", batch)?;
        Ok(())
    })
    .with_batch_size(4);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3, 4]);
    let err = pipeline.flush().unwrap_err();

    assert!(matches!(err, PipelineError::Unroutable { .. }));
    assert!(err.to_string().contains("bad"));
}

#[test]
fn nearest_neighbour_addressing() {
    let segment = Segment::pipeline(
        "main",
        vec![
            Segment::pipeline("pipeA", vec![identity("processA"), identity("processB")]),
            identity("processA"),
        ],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    let caller = pipeline.find_segment("pipeA/processB").unwrap();

    let near = pipeline.find_segment_from(caller, "processA").unwrap();
    assert_eq!(pipeline.path(near).to_string(), "main/pipeA/processA");

    let rooted = pipeline.find_segment_from(caller, "main/processA").unwrap();
    assert_eq!(pipeline.path(rooted).to_string(), "main/processA");
}

#[test]
fn items_are_conserved_through_identity_stages() {
    let segment = Segment::pipeline(
        "main",
        vec![
            identity("one").with_batch_size(3),
            identity("two").with_batch_size(2),
        ],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue((0..10).collect());
    let mut dequeued = 0usize;

    loop {
        assert_eq!(pipeline.pending() + pipeline.ready() + dequeued, 10);
        if pipeline.is_exhausted().unwrap() {
            break;
        }
        dequeued += pipeline.dequeue(2).unwrap().len();
    }
    assert_eq!(dequeued, 10);
}

#[test]
fn exhaustion_matches_queue_state() {
    let segment = identity("only").with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    assert!(pipeline.is_exhausted().unwrap());
    assert_eq!(pipeline.pending(), 0);
    assert_eq!(pipeline.ready(), 0);

    pipeline.enqueue(vec![1, 2, 3]);
    assert!(!pipeline.is_exhausted().unwrap());

    pipeline.flush().unwrap();
    assert!(!pipeline.is_exhausted().unwrap());
    assert_eq!(pipeline.ready(), 3);

    pipeline.dequeue(3).unwrap();
    assert!(pipeline.is_exhausted().unwrap());
    assert_eq!(pipeline.pending(), 0);
    assert_eq!(pipeline.ready(), 0);
}

#[test]
fn identity_flush_preserves_input_order() {
    let segment = Segment::pipeline(
        "main",
        vec![
            identity("one").with_batch_size(3),
            identity("two").with_batch_size(5),
            identity("three").with_batch_size(2),
        ],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    let input: Vec<i64> = (0..23).collect();
    pipeline.enqueue(input.clone());
    pipeline.flush().unwrap();

    assert_eq!(pipeline.dequeue(23).unwrap(), input);
}

#[test]
fn allow_is_a_split_of_the_input() {
    let through = Segment::process("tag", |flow, batch: Vec<i64>| {
        flow.emit(batch.into_iter().map(|x| x + 1000).collect());
        Ok(())
    })
    .with_batch_size(4)
    .with_allow(|x| x % 3 == 0);
    let mut pipeline = Pipeline::init(through, ()).unwrap();

    pipeline.enqueue((1..=9).collect());
    pipeline.flush().unwrap();
    let output = pipeline.dequeue(9).unwrap();

    // Rejected items first in arrival order, then the processed ones.
    assert_eq!(output, vec![1, 2, 4, 5, 7, 8, 1003, 1006, 1009]);
}

#[test]
fn config_defaults_drive_batching() {
    let config: piper_config::Config = "[global]\nbatch_size = 4".parse().unwrap();
    let segment = identity("only");
    let mut pipeline = Pipeline::<i64, ()>::builder()
        .defaults(EngineDefaults::from_config(&config))
        .build(segment, ())
        .unwrap();

    pipeline.enqueue((0..10).collect());
    pipeline.flush().unwrap();

    // 10 items at batch size 4: three handler invocations.
    assert_eq!(pipeline.metrics().batches_processed(), 3);
    assert_eq!(pipeline.ready(), 10);
}

#[test]
fn metrics_reflect_a_run() {
    let segment = Segment::process("half", |flow, batch: Vec<i64>| {
        flow.emit(batch.into_iter().map(|x| x / 2).collect());
        Ok(())
    })
    .with_batch_size(2)
    .with_allow(|x| x % 2 == 0);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3, 4, 5]);
    pipeline.flush().unwrap();

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.items_enqueued, 5);
    assert_eq!(snapshot.items_skipped, 3);
    assert_eq!(snapshot.items_processed, 2);
    assert_eq!(snapshot.items_emitted, 2);
    assert_eq!(snapshot.batches_processed, 1);
    assert_eq!(snapshot.handler_errors, 0);
}
