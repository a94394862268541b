//! Save stream of the course edit dialog.
//!
//! A [`CourseDialog`] holds the form of one course. Editing the form and
//! clicking the save button are two trigger sources, each flattened into
//! `PUT /api/courses/<id>` requests by its own [`SavePolicy`]:
//!
//! | policy    | trigger while a save is in flight          |
//! |-----------|--------------------------------------------|
//! | `Concat`  | queued, saved after the running one        |
//! | `Exhaust` | ignored                                    |
//! | `Merge`   | saved right away, responses may interleave |
//!
//! Autosave on form changes defaults to `Concat` and the save button to
//! `Exhaust`. A form that does not validate is never saved.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace, warn};

use crate::{
    lock,
    model::{Course, CourseForm},
    observer::Observer,
    subjects::{Subject, SubjectEmitter, SubjectReceiver},
    ClientConfig, CourseStore, CoursesApi, Observable, ObservableExt, StreamError, Subscribeable,
};

/// How triggers arriving while a save is in flight are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// Save every trigger right away.
    Merge,
    /// Ignore triggers until the running save finished.
    Exhaust,
    /// Queue triggers and save them one after another.
    Concat,
}

/// Result of one save. A failed save does not end the save stream.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved { course_id: u64 },
    Failed { course_id: u64, error: StreamError },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

#[derive(Clone)]
struct Saver {
    course_id: u64,
    api: CoursesApi,
    store: Option<CourseStore>,
}

impl Saver {
    fn save(&self, form: &CourseForm) -> Observable<SaveOutcome> {
        let course_id = self.course_id;
        let request = match &self.store {
            Some(store) => store.save_course(&self.api, course_id, form),
            None => self.api.save_course(course_id, form),
        };

        request
            .map(move |()| SaveOutcome::Saved { course_id })
            .tap(|outcome| debug!(?outcome, "course saved"))
            .catch_error(move |error| {
                warn!(course_id, %error, "course save failed");
                Observable::of(SaveOutcome::Failed { course_id, error })
            })
    }
}

/// The edit dialog of a single course.
///
/// Triggers are hot: subscribe to [`saves`](Self::saves) before editing or
/// clicking, triggers without a subscriber are dropped.
pub struct CourseDialog {
    saver: Saver,
    form: Arc<Mutex<CourseForm>>,
    changes: (SubjectEmitter<CourseForm>, SubjectReceiver<CourseForm>),
    clicks: (SubjectEmitter<()>, SubjectReceiver<()>),
    autosave_policy: SavePolicy,
    save_button_policy: SavePolicy,
}

impl CourseDialog {
    /// Opens the dialog with a form pre-filled from `course`.
    pub fn open(api: &CoursesApi, course: &Course) -> Self {
        CourseDialog {
            saver: Saver {
                course_id: course.id,
                api: api.clone(),
                store: None,
            },
            form: Arc::new(Mutex::new(CourseForm::from_course(course))),
            changes: Subject::emitter_receiver(),
            clicks: Subject::emitter_receiver(),
            autosave_policy: SavePolicy::Concat,
            save_button_policy: SavePolicy::Exhaust,
        }
    }

    /// Saves through `store`, which updates its course list before every PUT.
    pub fn with_store(mut self, store: &CourseStore) -> Self {
        self.saver.store = Some(store.clone());
        self
    }

    pub fn with_policies(mut self, autosave: SavePolicy, save_button: SavePolicy) -> Self {
        self.autosave_policy = autosave;
        self.save_button_policy = save_button;
        self
    }

    /// Takes both policies from `config`.
    pub fn with_config(self, config: &ClientConfig) -> Self {
        self.with_policies(config.autosave_policy, config.save_button_policy)
    }

    pub fn course_id(&self) -> u64 {
        self.saver.course_id
    }

    /// Copy of the current form.
    pub fn form(&self) -> CourseForm {
        lock(&self.form).clone()
    }

    /// Changes the form and emits the new value as a form change.
    pub fn edit(&self, f: impl FnOnce(&mut CourseForm)) {
        let form = {
            let mut form = lock(&self.form);
            f(&mut form);
            form.clone()
        };
        self.changes.0.clone().next(form);
    }

    pub fn click_save(&self) {
        self.clicks.0.clone().next(());
    }

    /// Outcomes of autosaves and save button saves, in completion order.
    ///
    /// Completes after [`close`](Self::close) once the running saves finished.
    pub fn saves(&self) -> Observable<SaveOutcome> {
        let course_id = self.course_id();

        let changes = self
            .changes
            .1
            .clone()
            .filter(move |form| valid_or_skipped(course_id, "form change", form));
        let autosaves = flatten_saves(changes, self.autosave_policy, self.saver.clone());

        let form = Arc::clone(&self.form);
        let clicks = self
            .clicks
            .1
            .clone()
            .map(move |()| lock(&form).clone())
            .filter(move |form| valid_or_skipped(course_id, "save click", form));
        let button_saves = flatten_saves(clicks, self.save_button_policy, self.saver.clone());

        autosaves.merge(vec![button_saves])
    }

    /// Completes both trigger sources.
    pub fn close(&self) {
        self.changes.0.clone().complete();
        self.clicks.0.clone().complete();
    }
}

fn valid_or_skipped(course_id: u64, trigger: &str, form: &CourseForm) -> bool {
    let valid = form.is_valid();
    if !valid {
        trace!(course_id, trigger, "invalid form not saved");
    }
    valid
}

fn flatten_saves<S>(triggers: S, policy: SavePolicy, saver: Saver) -> Observable<SaveOutcome>
where
    S: Subscribeable<ObsType = CourseForm> + Send + Sync + 'static,
{
    let save = move |form: CourseForm| saver.save(&form);
    match policy {
        SavePolicy::Merge => triggers.merge_map(save),
        SavePolicy::Exhaust => triggers.exhaust_map(save),
        SavePolicy::Concat => triggers.concat_map(save),
    }
}
