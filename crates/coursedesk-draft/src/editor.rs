//! Path-addressed editing of a draft.
//!
//! Every edit clones the root, then walks the path with [`Arc::make_mut`].
//! The previous root is held for the duration of the walk, so each `Arc`
//! along the path is shared and gets copied, while every sibling keeps its
//! reference. A failed edit leaves the current draft untouched.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use coursedesk_shared::constants::MIN_QUIZ_OPTIONS;
use coursedesk_shared::types::InstructorId;

use crate::attachments::{file_extension, AttachmentKey, Attachments, PendingBinary, PreviewHandle};
use crate::error::{DraftError, Result};
use crate::model::{Draft, FormatDetail, Item, List, Module, Quiz, Resource, Topic};
use crate::numeric::js_number;
use crate::path::{Collection, FieldPath, Segment};
use crate::state::{SubmissionState, SubmissionTracker};
use crate::submission::{build_submission, validate_required, CourseSubmission};

/// Owns one draft, its attachment side-table and its submission state.
#[derive(Debug)]
pub struct DraftEditor {
    draft: Arc<Draft>,
    attachments: Attachments,
    tracker: SubmissionTracker,
}

impl DraftEditor {
    pub fn new(instructor: Option<InstructorId>, max_upload_bytes: usize) -> Self {
        info!(?instructor, "draft opened");
        Self {
            draft: Arc::new(Draft::new(instructor)),
            attachments: Attachments::new(max_upload_bytes),
            tracker: SubmissionTracker::default(),
        }
    }

    /// The current draft. Cheap; holding it keeps that version alive.
    pub fn draft(&self) -> Arc<Draft> {
        Arc::clone(&self.draft)
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn state(&self) -> &SubmissionState {
        self.tracker.state()
    }

    /// Length of a structural collection.
    pub fn len(&self, collection: Collection) -> Result<usize> {
        let d = &self.draft;
        let len = match collection {
            Collection::Modules => d.modules.len(),
            Collection::Topics { module } => node(&d.modules, module, &collection)?.topics.len(),
            Collection::Quizzes { module, topic } => {
                let m = node(&d.modules, module, &collection)?;
                node(&m.topics, topic, &collection)?.mcq_quizzes.len()
            }
            Collection::Resources => d.course_resources.len(),
            Collection::FormatDetails => d.course_format_details.len(),
            Collection::LearnItems => d.learn_items.len(),
            Collection::Prerequisites => d.prerequisites.len(),
            Collection::Features => d.pricing.features.len(),
        };
        Ok(len)
    }

    /// Whether `remove_at` on this collection would pass its floor check.
    pub fn can_remove(&self, collection: Collection) -> bool {
        self.len(collection)
            .is_ok_and(|len| len > collection.min_len())
    }

    // -----------------------------------------------------------------------
    // Field edits
    // -----------------------------------------------------------------------

    /// Set the scalar (or string list) at `path`, e.g.
    /// `modules[0].topics[1].mcqQuizzes[0].correctAnswer`.
    pub fn set_field(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let path = FieldPath::parse(path)?;
        let value = value.into();
        self.edit(|d| set_in_draft(d, &path, &value))?;
        debug!(path = %path, "field set");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Insert `item` at `index` (0..=len) of the collection at `path`.
    pub fn insert_at(&mut self, path: &str, index: usize, item: Item) -> Result<()> {
        self.insert_item(path.parse()?, index, item)
    }

    /// Remove the element at `index`. Refused on a collection at its floor.
    pub fn remove_at(&mut self, path: &str, index: usize) -> Result<()> {
        self.remove_item(path.parse()?, index)
    }

    pub fn insert_item(&mut self, collection: Collection, index: usize, item: Item) -> Result<()> {
        self.edit(|d| insert_in_draft(d, collection, index, item))?;
        self.attachments.rekey(remap(collection, index, Shift::Inserted));
        debug!(collection = %collection, index, "item inserted");
        Ok(())
    }

    pub fn remove_item(&mut self, collection: Collection, index: usize) -> Result<()> {
        self.edit(|d| remove_in_draft(d, collection, index))?;
        self.attachments.rekey(remap(collection, index, Shift::Removed));
        debug!(collection = %collection, index, "item removed");
        Ok(())
    }

    /// Append the collection's default element, returning its index.
    pub fn push_default(&mut self, collection: Collection) -> Result<usize> {
        let index = self.len(collection)?;
        self.insert_item(collection, index, Item::default_for(collection))?;
        Ok(index)
    }

    pub fn add_module(&mut self) -> Result<usize> {
        self.push_default(Collection::Modules)
    }

    pub fn add_topic(&mut self, module: usize) -> Result<usize> {
        self.push_default(Collection::Topics { module })
    }

    pub fn add_quiz(&mut self, module: usize, topic: usize) -> Result<usize> {
        self.push_default(Collection::Quizzes { module, topic })
    }

    pub fn add_resource(&mut self) -> Result<usize> {
        self.push_default(Collection::Resources)
    }

    pub fn remove_topic(&mut self, module: usize, topic: usize) -> Result<()> {
        self.remove_item(Collection::Topics { module }, topic)
    }

    // -----------------------------------------------------------------------
    // Attachments
    // -----------------------------------------------------------------------

    /// Hold `binary` for the node at `key` and point the node at its file
    /// name. Any earlier pending binary for the key is replaced and its
    /// preview revoked.
    pub fn attach(&mut self, key: AttachmentKey, binary: PendingBinary) -> Result<PreviewHandle> {
        self.attachments.check_size(&binary)?;
        let name = binary.file_name.clone();
        self.edit(|d| set_reference(d, key, Some(name.as_str())))?;
        self.attachments.insert(key, binary)
    }

    /// Drop the pending binary for `key` and clear the node's reference.
    pub fn detach(&mut self, key: AttachmentKey) -> Result<Option<PendingBinary>> {
        self.edit(|d| set_reference(d, key, None))?;
        let removed = self.attachments.remove(&key);
        debug!(key = %key, had_pending = removed.is_some(), "attachment detached");
        Ok(removed)
    }

    /// Point the node at a file that already exists on the server.
    pub fn link_existing(&mut self, key: AttachmentKey, file_name: &str) -> Result<()> {
        self.edit(|d| set_reference(d, key, Some(file_name)))?;
        self.attachments.remove(&key);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Build the payload without side effects.
    pub fn build_submission(&self) -> Result<CourseSubmission> {
        build_submission(&self.draft, &self.attachments)
    }

    /// Validate, build, and enter `Submitting`. Nothing changes on error.
    pub fn begin_submission(&mut self) -> Result<CourseSubmission> {
        validate_required(&self.draft)?;
        let submission = self.build_submission()?;
        self.tracker.begin()?;
        info!(
            title = %self.draft.title,
            modules = submission.metadata.modules.len(),
            binaries = submission.binaries.len(),
            "submitting draft"
        );
        Ok(submission)
    }

    /// Record the outcome of the network phase. A failure keeps the draft
    /// and its attachments for a retry; success releases the attachments.
    pub fn finish_submission(&mut self, outcome: std::result::Result<(), String>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.tracker.succeed()?;
                self.attachments.clear();
            }
            Err(message) => self.tracker.fail(message)?,
        }
        Ok(())
    }

    fn edit<R>(&mut self, f: impl FnOnce(&mut Draft) -> Result<R>) -> Result<R> {
        self.tracker.ensure_editable()?;
        let prev = Arc::clone(&self.draft);
        let mut next = Draft::clone(&prev);
        let out = f(&mut next)?;
        self.draft = Arc::new(next);
        drop(prev);
        Ok(out)
    }
}

impl Item {
    /// Fresh element for `collection`, as the editor's "add" buttons create it.
    pub fn default_for(collection: Collection) -> Self {
        match collection {
            Collection::Modules => Item::Module(Module::default()),
            Collection::Topics { .. } => Item::Topic(Topic::default()),
            Collection::Quizzes { .. } => Item::Quiz(Quiz::default()),
            Collection::Resources => Item::Resource(Resource::default()),
            Collection::FormatDetails => Item::FormatDetail(FormatDetail::default()),
            Collection::LearnItems | Collection::Prerequisites | Collection::Features => {
                Item::Text(String::new())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tree walking
// ---------------------------------------------------------------------------

fn node<'a, T>(list: &'a List<T>, index: usize, path: &dyn fmt::Display) -> Result<&'a T> {
    list.get(index)
        .map(|n| n.as_ref())
        .ok_or_else(|| DraftError::IndexOutOfRange {
            path: path.to_string(),
            index,
            len: list.len(),
        })
}

/// Copy-on-write access to element `index` of `list`.
fn node_mut<'a, T: Clone>(
    list: &'a mut List<T>,
    index: usize,
    path: &dyn fmt::Display,
) -> Result<&'a mut T> {
    let items = Arc::make_mut(list);
    let len = items.len();
    let slot = items.get_mut(index).ok_or_else(|| DraftError::IndexOutOfRange {
        path: path.to_string(),
        index,
        len,
    })?;
    Ok(Arc::make_mut(slot))
}

fn text(path: &FieldPath, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(DraftError::FieldType {
            path: path.to_string(),
            expected: "string",
        }),
    }
}

fn flag(path: &FieldPath, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| DraftError::FieldType {
        path: path.to_string(),
        expected: "boolean",
    })
}

fn strings(path: &FieldPath, value: &Value) -> Result<Vec<String>> {
    let invalid = || DraftError::FieldType {
        path: path.to_string(),
        expected: "list of strings",
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn set_text_at(list: &mut Arc<Vec<String>>, index: usize, path: &FieldPath, value: &Value) -> Result<()> {
    let value = text(path, value)?;
    let items = Arc::make_mut(list);
    let len = items.len();
    let slot = items.get_mut(index).ok_or_else(|| DraftError::IndexOutOfRange {
        path: path.to_string(),
        index,
        len,
    })?;
    *slot = value;
    Ok(())
}

fn set_in_draft(d: &mut Draft, path: &FieldPath, value: &Value) -> Result<()> {
    use Segment::{Field, Index};

    let invalid = || DraftError::InvalidPath(path.to_string());
    let Some((Field(head), rest)) = path.segments().split_first() else {
        return Err(invalid());
    };

    match (head.as_str(), rest) {
        ("title", []) => d.title = text(path, value)?,
        ("description", []) => d.description = text(path, value)?,
        ("category", []) => d.category = text(path, value)?,
        ("level", []) => d.level = text(path, value)?,
        ("duration", []) => d.duration = text(path, value)?,
        ("price", []) => d.price = text(path, value)?,
        ("overviewSubtitle", []) => d.overview_subtitle = text(path, value)?,
        ("overviewDescription", []) => d.overview_description = text(path, value)?,

        ("learnItems", []) => d.learn_items = Arc::new(strings(path, value)?),
        ("learnItems", [Index(i)]) => set_text_at(&mut d.learn_items, *i, path, value)?,
        ("prerequisites", []) => d.prerequisites = Arc::new(strings(path, value)?),
        ("prerequisites", [Index(i)]) => set_text_at(&mut d.prerequisites, *i, path, value)?,

        ("durationDetails", [Field(f)]) => {
            let dd = Arc::make_mut(&mut d.duration_details);
            match f.as_str() {
                "totalHours" => dd.total_hours = text(path, value)?,
                "totalWeeks" => dd.total_weeks = text(path, value)?,
                "startDate" => dd.start_date = text(path, value)?,
                "endDate" => dd.end_date = text(path, value)?,
                _ => return Err(invalid()),
            }
        }

        ("pricing", [Field(f), more @ ..]) => {
            let p = Arc::make_mut(&mut d.pricing);
            match (f.as_str(), more) {
                ("originalPrice", []) => p.original_price = text(path, value)?,
                ("discountText", []) => p.discount_text = text(path, value)?,
                ("offerNote", []) => p.offer_note = text(path, value)?,
                ("features", []) => p.features = Arc::new(strings(path, value)?),
                ("features", [Index(i)]) => set_text_at(&mut p.features, *i, path, value)?,
                _ => return Err(invalid()),
            }
        }

        ("finalAssessment", [Field(f)]) => {
            let fa = Arc::make_mut(&mut d.final_assessment);
            match f.as_str() {
                "type" => fa.kind = text(path, value)?,
                "description" => fa.description = text(path, value)?,
                "totalMarks" => fa.total_marks = text(path, value)?,
                "assessmentDate" => fa.assessment_date = text(path, value)?,
                _ => return Err(invalid()),
            }
        }

        ("modules", [Index(m), more @ ..]) => {
            let module = node_mut(&mut d.modules, *m, path)?;
            set_in_module(module, more, path, value)?;
        }

        ("courseResources", [Index(i), Field(f)]) => {
            let r = node_mut(&mut d.course_resources, *i, path)?;
            match f.as_str() {
                "title" => r.title = text(path, value)?,
                "type" => r.kind = text(path, value)?,
                _ => return Err(invalid()),
            }
        }

        ("courseFormatDetails", [Index(i), Field(f)]) => {
            let fd = node_mut(&mut d.course_format_details, *i, path)?;
            match f.as_str() {
                "classType" => fd.class_type = text(path, value)?,
                "assesmentTypes" => fd.assessment_types = text(path, value)?,
                _ => return Err(invalid()),
            }
        }

        _ => return Err(invalid()),
    }
    Ok(())
}

fn set_in_module(module: &mut Module, rest: &[Segment], path: &FieldPath, value: &Value) -> Result<()> {
    use Segment::{Field, Index};

    match rest {
        [Field(f)] if f == "title" => module.title = text(path, value)?,
        [Field(f)] if f == "lessons" => module.lessons = text(path, value)?,
        [Field(f)] if f == "hours" => module.hours = text(path, value)?,
        [Field(f), Index(t), more @ ..] if f == "topics" => {
            let topic = node_mut(&mut module.topics, *t, path)?;
            set_in_topic(topic, more, path, value)?;
        }
        _ => return Err(DraftError::InvalidPath(path.to_string())),
    }
    Ok(())
}

fn set_in_topic(topic: &mut Topic, rest: &[Segment], path: &FieldPath, value: &Value) -> Result<()> {
    use Segment::{Field, Index};

    match rest {
        [Field(f)] => match f.as_str() {
            "title" => topic.title = text(path, value)?,
            "unlockDate" => topic.unlock_date = text(path, value)?,
            "preview" => topic.flags.preview = flag(path, value)?,
            "watch" => topic.flags.watch = flag(path, value)?,
            "completed" => topic.flags.completed = flag(path, value)?,
            "hasAssessment" => topic.flags.has_assessment = flag(path, value)?,
            _ => return Err(DraftError::InvalidPath(path.to_string())),
        },
        [Field(f), Index(k), more @ ..] if f == "mcqQuizzes" => {
            let quiz = node_mut(&mut topic.mcq_quizzes, *k, path)?;
            set_in_quiz(quiz, more, path, value)?;
        }
        _ => return Err(DraftError::InvalidPath(path.to_string())),
    }
    Ok(())
}

fn set_in_quiz(quiz: &mut Quiz, rest: &[Segment], path: &FieldPath, value: &Value) -> Result<()> {
    use Segment::{Field, Index};

    match rest {
        [Field(f)] if f == "question" => quiz.question = text(path, value)?,
        [Field(f)] if f == "marks" => {
            let raw = text(path, value)?;
            if let Some(v) = js_number(&raw).filter(|v| *v < 0.0) {
                return Err(DraftError::NegativeMarks(v));
            }
            quiz.marks = raw;
        }
        [Field(f)] if f == "correctAnswer" => {
            let answer = text(path, value)?;
            if !answer.is_empty() && !quiz.is_valid_answer(&answer) {
                return Err(DraftError::CorrectAnswer(answer));
            }
            quiz.correct_answer = answer;
        }
        [Field(f)] if f == "options" => {
            let options = strings(path, value)?;
            if options.len() < MIN_QUIZ_OPTIONS {
                return Err(DraftError::Cardinality {
                    collection: path.to_string(),
                    min: MIN_QUIZ_OPTIONS,
                });
            }
            quiz.options = Arc::new(options);
            if quiz.revalidate_answer() {
                debug!(path = %path, "correct answer cleared by option change");
            }
        }
        [Field(f), Index(n)] if f == "options" => {
            set_text_at(&mut quiz.options, *n, path, value)?;
            if quiz.revalidate_answer() {
                debug!(path = %path, "correct answer cleared by option change");
            }
        }
        _ => return Err(DraftError::InvalidPath(path.to_string())),
    }
    Ok(())
}

fn set_reference(d: &mut Draft, key: AttachmentKey, file: Option<&str>) -> Result<()> {
    let unknown = |_| DraftError::UnknownNode(key.to_string());
    match key {
        AttachmentKey::CourseImage => d.image = file.map(str::to_string),
        AttachmentKey::Resource(i) => {
            let r = node_mut(&mut d.course_resources, i, &key).map_err(unknown)?;
            r.file = file.map(str::to_string);
            if let Some(name) = file {
                r.kind = file_extension(name).to_string();
            }
        }
        AttachmentKey::Topic { module, topic } => {
            let m = node_mut(&mut d.modules, module, &key).map_err(unknown)?;
            let t = node_mut(&mut m.topics, topic, &key).map_err(unknown)?;
            t.file = file.map(str::to_string);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

fn insert_checked<E>(items: &mut Vec<E>, index: usize, value: E, c: Collection) -> Result<()> {
    if index > items.len() {
        return Err(DraftError::IndexOutOfRange {
            path: c.to_string(),
            index,
            len: items.len(),
        });
    }
    items.insert(index, value);
    Ok(())
}

fn remove_checked<E>(items: &mut Vec<E>, index: usize, c: Collection) -> Result<()> {
    if index >= items.len() {
        return Err(DraftError::IndexOutOfRange {
            path: c.to_string(),
            index,
            len: items.len(),
        });
    }
    if items.len() <= c.min_len() {
        return Err(DraftError::Cardinality {
            collection: c.to_string(),
            min: c.min_len(),
        });
    }
    items.remove(index);
    Ok(())
}

fn insert_in_draft(d: &mut Draft, c: Collection, index: usize, item: Item) -> Result<()> {
    match (c, item) {
        (Collection::Modules, Item::Module(m)) => {
            insert_checked(Arc::make_mut(&mut d.modules), index, Arc::new(m), c)
        }
        (Collection::Topics { module }, Item::Topic(t)) => {
            let m = node_mut(&mut d.modules, module, &c)?;
            insert_checked(Arc::make_mut(&mut m.topics), index, Arc::new(t), c)
        }
        (Collection::Quizzes { module, topic }, Item::Quiz(q)) => {
            let m = node_mut(&mut d.modules, module, &c)?;
            let t = node_mut(&mut m.topics, topic, &c)?;
            insert_checked(Arc::make_mut(&mut t.mcq_quizzes), index, Arc::new(q), c)
        }
        (Collection::Resources, Item::Resource(r)) => {
            insert_checked(Arc::make_mut(&mut d.course_resources), index, Arc::new(r), c)
        }
        (Collection::FormatDetails, Item::FormatDetail(f)) => {
            insert_checked(Arc::make_mut(&mut d.course_format_details), index, Arc::new(f), c)
        }
        (Collection::LearnItems, Item::Text(s)) => {
            insert_checked(Arc::make_mut(&mut d.learn_items), index, s, c)
        }
        (Collection::Prerequisites, Item::Text(s)) => {
            insert_checked(Arc::make_mut(&mut d.prerequisites), index, s, c)
        }
        (Collection::Features, Item::Text(s)) => {
            let p = Arc::make_mut(&mut d.pricing);
            insert_checked(Arc::make_mut(&mut p.features), index, s, c)
        }
        _ => Err(DraftError::FieldType {
            path: c.to_string(),
            expected: Item::default_for(c).kind(),
        }),
    }
}

fn remove_in_draft(d: &mut Draft, c: Collection, index: usize) -> Result<()> {
    match c {
        Collection::Modules => remove_checked(Arc::make_mut(&mut d.modules), index, c),
        Collection::Topics { module } => {
            let m = node_mut(&mut d.modules, module, &c)?;
            remove_checked(Arc::make_mut(&mut m.topics), index, c)
        }
        Collection::Quizzes { module, topic } => {
            let m = node_mut(&mut d.modules, module, &c)?;
            let t = node_mut(&mut m.topics, topic, &c)?;
            remove_checked(Arc::make_mut(&mut t.mcq_quizzes), index, c)
        }
        Collection::Resources => remove_checked(Arc::make_mut(&mut d.course_resources), index, c),
        Collection::FormatDetails => {
            remove_checked(Arc::make_mut(&mut d.course_format_details), index, c)
        }
        Collection::LearnItems => remove_checked(Arc::make_mut(&mut d.learn_items), index, c),
        Collection::Prerequisites => remove_checked(Arc::make_mut(&mut d.prerequisites), index, c),
        Collection::Features => {
            let p = Arc::make_mut(&mut d.pricing);
            remove_checked(Arc::make_mut(&mut p.features), index, c)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Shift {
    Inserted,
    Removed,
}

fn shift_index(i: usize, at: usize, shift: Shift) -> Option<usize> {
    match shift {
        Shift::Inserted if i >= at => Some(i + 1),
        Shift::Inserted => Some(i),
        Shift::Removed => match i.cmp(&at) {
            Ordering::Less => Some(i),
            Ordering::Equal => None,
            Ordering::Greater => Some(i - 1),
        },
    }
}

/// How attachment keys move after a structural edit of `c` at `at`.
fn remap(c: Collection, at: usize, shift: Shift) -> impl Fn(AttachmentKey) -> Option<AttachmentKey> {
    move |key| match (c, key) {
        (Collection::Modules, AttachmentKey::Topic { module, topic }) => {
            shift_index(module, at, shift).map(|module| AttachmentKey::Topic { module, topic })
        }
        (Collection::Topics { module: m }, AttachmentKey::Topic { module, topic }) if module == m => {
            shift_index(topic, at, shift).map(|topic| AttachmentKey::Topic { module, topic })
        }
        (Collection::Resources, AttachmentKey::Resource(i)) => {
            shift_index(i, at, shift).map(AttachmentKey::Resource)
        }
        (_, other) => Some(other),
    }
}
