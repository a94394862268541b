mod custom_error;
mod record_emissions;

use std::sync::Arc;

use custom_error::CustomError;
use record_emissions::Emissions;
use rxcourses::subjects::BehaviorSubject;
use rxcourses::{Observer, Subscribeable};

#[test]
fn behavior_subject_emit_then_complete() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = BehaviorSubject::emitter_receiver(9);

    // Emitting without any registered subscribers replaces the current value.
    stx.next(1);

    assert_eq!(srx.len(), 0);
    assert_eq!(srx.value(), 1);
    assert!(emissions.nexts().is_empty());

    // Subscribing emits the current value.
    srx.subscribe(emissions.subscriber());

    assert_eq!(emissions.nexts(), vec![1]);

    stx.next(2);
    srx.subscribe(emissions.subscriber());

    assert_eq!(srx.len(), 2);
    assert_eq!(emissions.nexts(), vec![1, 2, 2]);

    stx.next(3);
    stx.complete();

    assert_eq!(srx.len(), 0);
    assert_eq!(emissions.nexts(), vec![1, 2, 2, 3, 3]);
    assert_eq!(emissions.completes(), 2);

    // After completion the value is still readable but no longer emitted.
    let late = Emissions::new();
    srx.subscribe(late.subscriber());

    assert_eq!(stx.value(), 3);
    assert!(late.nexts().is_empty());
    assert_eq!(late.completes(), 1);
}

#[test]
fn behavior_subject_emit_then_error() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = BehaviorSubject::emitter_receiver(Vec::<u64>::new());

    srx.subscribe(emissions.subscriber());
    stx.next(vec![1, 2]);
    stx.error(Arc::new(CustomError));
    stx.next(vec![3]);

    assert_eq!(emissions.nexts(), vec![vec![], vec![1, 2]]);
    assert_eq!(emissions.errors().len(), 1);

    let late = Emissions::new();
    srx.subscribe(late.subscriber());

    assert!(late.nexts().is_empty());
    assert_eq!(late.errors().len(), 1);
}
