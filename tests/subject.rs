mod custom_error;
mod record_emissions;

use std::sync::Arc;

use custom_error::CustomError;
use record_emissions::Emissions;
use rxcourses::subjects::Subject;
use rxcourses::{Observer, Subscribeable, Unsubscribeable};

#[test]
fn subject_emit_then_complete() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = Subject::emitter_receiver();

    // Nobody is registered yet, the value is lost.
    stx.next(1);

    assert_eq!(srx.len(), 0);
    assert!(emissions.nexts().is_empty());

    srx.subscribe(emissions.subscriber());

    // Values are not stored, subscribing emits nothing.
    assert_eq!(srx.len(), 1);
    assert!(emissions.nexts().is_empty());

    stx.next(2);
    stx.next(3);

    assert_eq!(emissions.nexts(), vec![2, 3]);

    srx.subscribe(emissions.subscriber());
    srx.subscribe(emissions.subscriber());
    stx.next(4);

    assert_eq!(srx.len(), 3);
    assert_eq!(emissions.nexts(), vec![2, 3, 4, 4, 4]);
    assert_eq!(emissions.completes(), 0);

    stx.complete();

    assert_eq!(srx.len(), 0);
    assert_eq!(emissions.completes(), 3);

    // A late subscriber only gets the completion, later values are dropped.
    srx.subscribe(emissions.subscriber());
    stx.next(5);

    assert_eq!(srx.len(), 0);
    assert_eq!(emissions.nexts(), vec![2, 3, 4, 4, 4]);
    assert_eq!(emissions.completes(), 4);
    assert!(emissions.errors().is_empty());
}

#[test]
fn subject_emit_then_error() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = Subject::emitter_receiver();

    srx.subscribe(emissions.subscriber());
    srx.subscribe(emissions.subscriber());
    stx.next("rxjs");

    stx.error(Arc::new(CustomError));

    assert_eq!(srx.len(), 0);
    assert_eq!(emissions.nexts(), vec!["rxjs", "rxjs"]);
    assert_eq!(emissions.errors().len(), 2);
    assert_eq!(emissions.errors()[0].to_string(), "custom error");

    // Neither a later completion nor a late subscriber see anything but the error.
    stx.complete();
    srx.subscribe(emissions.subscriber());

    assert_eq!(emissions.errors().len(), 3);
    assert_eq!(emissions.completes(), 0);
}

#[test]
fn unsubscribing_the_receiver_drops_every_subscriber() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = Subject::emitter_receiver();

    srx.subscribe(emissions.subscriber());
    srx.subscribe(emissions.subscriber());
    srx.clone().unsubscribe();

    stx.next(1);
    srx.subscribe(emissions.subscriber());

    assert_eq!(srx.len(), 0);
    assert!(emissions.nexts().is_empty());
    assert_eq!(emissions.completes(), 0);
}
