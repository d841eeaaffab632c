//! The draft course tree.
//!
//! Every child node and list sits behind an [`Arc`]. Edits go through
//! [`Arc::make_mut`] along the edited path only, so an edited draft shares
//! every untouched subtree with the draft it was derived from, and consumers
//! can detect changes with [`Arc::ptr_eq`].
//!
//! Numeric fields keep the raw text the author typed; they are coerced when
//! the submission is built.

use std::sync::Arc;

use coursedesk_shared::constants::DEFAULT_QUIZ_OPTIONS;
use coursedesk_shared::types::InstructorId;

pub type Shared<T> = Arc<T>;
pub type List<T> = Arc<Vec<Arc<T>>>;

pub(crate) fn list<T>(items: impl IntoIterator<Item = T>) -> List<T> {
    Arc::new(items.into_iter().map(Arc::new).collect())
}

// ---------------------------------------------------------------------------
// Draft (root)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub duration: String,
    pub price: String,
    /// File name of the course image, pending or already on the server.
    pub image: Option<String>,
    pub overview_subtitle: String,
    pub overview_description: String,
    pub learn_items: Arc<Vec<String>>,
    pub duration_details: Shared<DurationDetails>,
    pub pricing: Shared<Pricing>,
    pub prerequisites: Arc<Vec<String>>,
    pub modules: List<Module>,
    pub course_resources: List<Resource>,
    pub course_format_details: List<FormatDetail>,
    pub final_assessment: Shared<FinalAssessment>,
    pub instructor: Option<InstructorId>,
}

impl Draft {
    /// Empty draft owned by `instructor`. Starts without modules.
    pub fn new(instructor: Option<InstructorId>) -> Self {
        Self {
            instructor,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationDetails {
    pub total_hours: String,
    pub total_weeks: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pricing {
    pub original_price: String,
    pub discount_text: String,
    pub offer_note: String,
    pub features: Arc<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalAssessment {
    pub kind: String,
    pub description: String,
    pub total_marks: String,
    pub assessment_date: String,
}

// ---------------------------------------------------------------------------
// Modules, topics, quizzes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub title: String,
    pub lessons: String,
    pub hours: String,
    pub topics: List<Topic>,
}

impl Default for Module {
    /// A new module starts with one topic.
    fn default() -> Self {
        Self {
            title: String::new(),
            lessons: String::new(),
            hours: String::new(),
            topics: list([Topic::default()]),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicFlags {
    pub preview: bool,
    pub watch: bool,
    pub completed: bool,
    pub has_assessment: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub title: String,
    /// File name of the topic video, pending or already on the server.
    pub file: Option<String>,
    pub flags: TopicFlags,
    pub unlock_date: String,
    pub mcq_quizzes: List<Quiz>,
}

impl Default for Topic {
    /// A new topic starts with one quiz.
    fn default() -> Self {
        Self {
            title: String::new(),
            file: None,
            flags: TopicFlags::default(),
            unlock_date: String::new(),
            mcq_quizzes: list([Quiz::default()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    pub question: String,
    pub options: Arc<Vec<String>>,
    /// Empty while unset; otherwise exactly one of `options`.
    pub correct_answer: String,
    pub marks: String,
}

impl Default for Quiz {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: Arc::new(vec![String::new(); DEFAULT_QUIZ_OPTIONS]),
            correct_answer: String::new(),
            marks: "0".to_string(),
        }
    }
}

impl Quiz {
    /// `answer` occurs exactly once among the options.
    pub fn is_valid_answer(&self, answer: &str) -> bool {
        self.options.iter().filter(|o| o.as_str() == answer).count() == 1
    }

    /// Drop the correct answer if the options no longer back it.
    pub(crate) fn revalidate_answer(&mut self) -> bool {
        if !self.correct_answer.is_empty() && !self.is_valid_answer(&self.correct_answer) {
            self.correct_answer.clear();
            return true;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Resources and format details
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub title: String,
    pub kind: String,
    pub file: Option<String>,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            title: String::new(),
            kind: "pdf".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatDetail {
    pub class_type: String,
    pub assessment_types: String,
}

/// A node for `insert_at`, matching the collection it goes into.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Module(Module),
    Topic(Topic),
    Quiz(Quiz),
    Resource(Resource),
    FormatDetail(FormatDetail),
    Text(String),
}

impl Item {
    pub fn kind(&self) -> &'static str {
        match self {
            Item::Module(_) => "module",
            Item::Topic(_) => "topic",
            Item::Quiz(_) => "quiz",
            Item::Resource(_) => "resource",
            Item::FormatDetail(_) => "format detail",
            Item::Text(_) => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_nest_one_topic_one_quiz_three_options() {
        let m = Module::default();
        assert_eq!(m.topics.len(), 1);
        let quiz = &m.topics[0].mcq_quizzes[0];
        assert_eq!(quiz.options.len(), 3);
        assert!(quiz.correct_answer.is_empty());
        assert_eq!(quiz.marks, "0");
        assert_eq!(Resource::default().kind, "pdf");
    }

    #[test]
    fn new_draft_has_no_modules() {
        let d = Draft::new(Some(InstructorId(4)));
        assert!(d.modules.is_empty());
        assert_eq!(d.instructor, Some(InstructorId(4)));
    }

    #[test]
    fn answer_must_be_unique_among_options() {
        let mut q = Quiz {
            options: Arc::new(vec!["A".into(), "B".into(), "A".into()]),
            ..Quiz::default()
        };
        assert!(q.is_valid_answer("B"));
        assert!(!q.is_valid_answer("A"));
        assert!(!q.is_valid_answer("C"));

        q.correct_answer = "B".into();
        q.options = Arc::new(vec!["A".into(), "C".into()]);
        assert!(q.revalidate_answer());
        assert!(q.correct_answer.is_empty());
    }
}
