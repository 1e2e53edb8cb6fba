//! Scheduler tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::{Pipeline, PipelineError, Segment, SegmentId, FULL_BATCH};

fn identity(label: &str) -> Segment<i64> {
    Segment::process(label, |flow, batch| {
        flow.emit(batch);
        Ok(())
    })
}

/// Identity leaf that also records its label on every invocation
fn tracked(label: &'static str, trace: &Rc<RefCell<Vec<&'static str>>>) -> Segment<i64> {
    let trace = Rc::clone(trace);
    Segment::process(label, move |flow, batch| {
        trace.borrow_mut().push(label);
        flow.emit(batch);
        Ok(())
    })
}

fn id_of(pipeline: &Pipeline<i64>, path: &str) -> SegmentId {
    pipeline
        .segments()
        .find(|&id| pipeline.path(id).to_string() == path)
        .unwrap_or_else(|| panic!("no segment at {path}"))
}

// ============================================================================
// Pressure
// ============================================================================

#[test]
fn test_pressure_zero_when_idle() {
    let pipeline = Pipeline::init(identity("only"), ()).unwrap();
    assert_eq!(pipeline.pressure(pipeline.root()), 0);
}

#[test]
fn test_pressure_proportional_to_backlog() {
    let segment = identity("only").with_batch_size(10);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![0; 5]);
    assert_eq!(pipeline.pressure(pipeline.root()), 50);

    pipeline.enqueue(vec![0; 5]);
    assert_eq!(pipeline.pressure(pipeline.root()), FULL_BATCH);
}

#[test]
fn test_pressure_floors_at_one() {
    // One item against the default batch size of 200 still registers.
    let mut pipeline = Pipeline::init(identity("only"), ()).unwrap();
    pipeline.enqueue(vec![42]);
    assert_eq!(pipeline.pressure(pipeline.root()), 1);
}

#[test]
fn test_pressure_saturates_past_full() {
    let segment = identity("only").with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();
    pipeline.enqueue(vec![0; 10]);
    assert_eq!(pipeline.pressure(pipeline.root()), 500);
}

#[test]
fn test_container_pressure_is_max_of_children() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let segment = Segment::pipeline(
        "main",
        vec![
            tracked("a", &trace).with_batch_size(10),
            tracked("b", &trace).with_batch_size(10),
        ],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![0; 3]);
    // Only the head leaf holds items; the container reports its pressure.
    assert_eq!(pipeline.pressure(pipeline.root()), 30);
}

// ============================================================================
// Leaf selection
// ============================================================================

#[test]
fn test_rightmost_full_batch_runs_first() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let segment = Segment::pipeline(
        "main",
        vec![
            tracked("a", &trace).with_batch_size(2),
            tracked("b", &trace).with_batch_size(2),
        ],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3, 4]);

    // First step: only a has work. Second step: a and b are both at a
    // full batch, so the stage nearest the output goes first.
    assert!(pipeline.process_batch().unwrap());
    assert!(pipeline.process_batch().unwrap());
    assert_eq!(*trace.borrow(), ["a", "b"]);

    pipeline.flush().unwrap();
    assert_eq!(*trace.borrow(), ["a", "b", "a", "b"]);
    assert_eq!(pipeline.dequeue(4).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_equal_pressure_prefers_leftmost() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let first = {
        let trace = Rc::clone(&trace);
        // Forwards one item per batch and drops the rest.
        Segment::process("a", move |flow, batch: Vec<i64>| {
            trace.borrow_mut().push("a");
            if let Some(head) = batch.into_iter().next() {
                flow.emit(vec![head]);
            }
            Ok(())
        })
        .with_batch_size(2)
    };
    let segment = Segment::pipeline(
        "main",
        vec![first, tracked("b", &trace).with_batch_size(2)],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3]);

    // Step 1 leaves a and b tied at half a batch; the tie goes left.
    assert!(pipeline.process_batch().unwrap());
    assert!(pipeline.process_batch().unwrap());
    assert_eq!(*trace.borrow(), ["a", "a"]);

    pipeline.flush().unwrap();
    assert_eq!(*trace.borrow(), ["a", "a", "b"]);
}

#[test]
fn test_process_batch_without_work() {
    let mut pipeline = Pipeline::init(identity("only"), ()).unwrap();
    assert!(!pipeline.process_batch().unwrap());
}

// ============================================================================
// prepare / flush / dequeue / is_exhausted
// ============================================================================

#[test]
fn test_prepare_stops_once_satisfied() {
    let segment = identity("only").with_batch_size(1);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3, 4, 5]);
    assert_eq!(pipeline.prepare(2).unwrap(), 2);
    assert_eq!(pipeline.pending(), 3);

    // Already satisfied: no further batches run.
    let batches = pipeline.metrics().batches_processed();
    assert_eq!(pipeline.prepare(1).unwrap(), 2);
    assert_eq!(pipeline.metrics().batches_processed(), batches);
}

#[test]
fn test_flush_drains_everything() {
    let segment = identity("only").with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3, 4, 5]);
    pipeline.flush().unwrap();

    assert_eq!(pipeline.pending(), 0);
    assert_eq!(pipeline.ready(), 5);
}

#[test]
fn test_dequeue_prepares_implicitly() {
    let segment = identity("only").with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 3]);
    assert_eq!(pipeline.dequeue(2).unwrap(), vec![1, 2]);
    assert_eq!(pipeline.dequeue(2).unwrap(), vec![3]);
    assert_eq!(pipeline.dequeue(2).unwrap(), Vec::<i64>::new());
}

#[test]
fn test_is_exhausted() {
    let segment = identity("only").with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    assert!(pipeline.is_exhausted().unwrap());

    pipeline.enqueue(vec![1]);
    assert!(!pipeline.is_exhausted().unwrap());

    pipeline.dequeue(1).unwrap();
    assert!(pipeline.is_exhausted().unwrap());
}

#[test]
fn test_batch_size_bounds_handler_input() {
    let sizes = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&sizes);
    let segment = Segment::process("only", move |flow, batch: Vec<i64>| {
        seen.borrow_mut().push(batch.len());
        flow.emit(batch);
        Ok(())
    })
    .with_batch_size(3);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![0; 7]);
    pipeline.flush().unwrap();

    assert_eq!(*sizes.borrow(), [3, 3, 1]);
}

// ============================================================================
// Disabled segments and errors
// ============================================================================

#[test]
fn test_disabled_leaf_forwards_mid_stream() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let segment = Segment::pipeline(
        "main",
        vec![
            tracked("a", &trace).with_batch_size(2),
            tracked("b", &trace).with_batch_size(2),
            tracked("c", &trace).with_batch_size(2),
        ],
    );
    let mut pipeline = Pipeline::init(segment, ()).unwrap();
    let b = id_of(&pipeline, "main/b");
    pipeline.set_enabled(b, Some(false));

    pipeline.enqueue(vec![1, 2, 3, 4]);
    pipeline.flush().unwrap();

    // Items emitted by a crossed b untouched and c saw all of them.
    assert_eq!(pipeline.dequeue(4).unwrap(), vec![1, 2, 3, 4]);
    assert!(!trace.borrow().contains(&"b"));
    assert_eq!(pipeline.metrics().snapshot().items_skipped, 4);
}

#[test]
fn test_handler_error_propagates_and_batch_is_lost() {
    let segment = Segment::process("flaky", |flow, batch: Vec<i64>| {
        if batch.contains(&13) {
            return Err(flow.error("refusing to process 13"));
        }
        flow.emit(batch);
        Ok(())
    })
    .with_batch_size(2);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();

    pipeline.enqueue(vec![1, 2, 13, 14, 5]);

    let err = pipeline.flush().unwrap_err();
    assert!(matches!(err, PipelineError::Handler { .. }));
    assert!(err.to_string().contains("refusing"));
    assert_eq!(pipeline.metrics().handler_errors(), 1);

    // The failed batch [13, 14] is gone; the rest still processes.
    pipeline.flush().unwrap();
    assert_eq!(pipeline.dequeue(5).unwrap(), vec![1, 2, 5]);
}

#[test]
fn test_zero_batch_override_still_makes_progress() {
    let segment = identity("only").with_batch_size(4);
    let mut pipeline = Pipeline::init(segment, ()).unwrap();
    let root = pipeline.root();

    pipeline.set_batch_size(root, Some(0));
    assert_eq!(pipeline.resolved_batch_size(root), 1);

    pipeline.enqueue(vec![1, 2]);
    pipeline.flush().unwrap();
    assert_eq!(pipeline.ready(), 2);
}
