//! Turning a draft into the `POST /courses/add` payload.
//!
//! [`build_submission`] is pure: it reads the draft and the attachment
//! side-table and returns the `courseDetails` metadata plus the list of
//! binary parts. It can be called any number of times (for a preview, say)
//! without touching either input.

use serde::{Serialize, Serializer};
use tracing::debug;

use coursedesk_shared::constants::{
    MIN_QUIZ_OPTIONS, PART_IMAGE, PART_RESOURCE_FILES, PART_VIDEO_FILES,
};
use coursedesk_shared::types::InstructorId;

use crate::attachments::{AttachmentKey, Attachments, PendingBinary};
use crate::error::{DraftError, Result};
use crate::model::{Draft, Module, Quiz, Topic};
use crate::numeric::coerce;

/// A finite number serialized the way `JSON.stringify` prints it: integral
/// values without a fractional part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsNumber(pub f64);

impl Serialize for JsNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
        if self.0.fract() == 0.0 && self.0.abs() <= MAX_SAFE {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shape of `courseDetails`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub duration: String,
    pub price: String,
    /// File name only.
    pub image: String,
    pub overview_subtitle: String,
    pub overview_description: String,
    pub learn_items: Vec<String>,
    pub duration_details: DurationDetailsPart,
    pub pricing: PricingPart,
    pub prerequisites: Vec<String>,
    pub modules: Vec<ModulePart>,
    pub course_resources: Vec<ResourcePart>,
    pub course_format_details: Vec<FormatDetailPart>,
    pub final_assessment: FinalAssessmentPart,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_entity: Option<InstructorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationDetailsPart {
    pub total_hours: JsNumber,
    pub total_weeks: JsNumber,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPart {
    pub original_price: JsNumber,
    pub discount_text: JsNumber,
    pub offer_note: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulePart {
    pub title: String,
    pub lessons: String,
    pub hours: String,
    pub topics: Vec<TopicPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPart {
    pub title: String,
    pub file: String,
    pub preview: bool,
    pub watch: bool,
    pub completed: bool,
    pub has_assessment: bool,
    pub unlock_date: String,
    pub mcq_quizzes: Vec<QuizPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPart {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub marks: JsNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePart {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatDetailPart {
    #[serde(rename = "classType")]
    pub class_type: String,
    /// The backend reads this misspelled name.
    #[serde(rename = "assesmentTypes")]
    pub assessment_types: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalAssessmentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub total_marks: JsNumber,
    pub assessment_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstructorRef {
    pub id: InstructorId,
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// One binary part of the multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryPart {
    /// Multipart field name (`image`, `resourceFiles` or `videoFiles`).
    pub field: &'static str,
    pub key: AttachmentKey,
    pub payload: PendingBinary,
}

/// Immutable result of [`build_submission`].
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSubmission {
    pub metadata: CourseDetails,
    pub binaries: Vec<BinaryPart>,
}

impl CourseSubmission {
    /// Body of the `courseDetails` part.
    pub fn metadata_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.metadata)?)
    }
}

pub fn part_name(key: &AttachmentKey) -> &'static str {
    match key {
        AttachmentKey::CourseImage => PART_IMAGE,
        AttachmentKey::Resource(_) => PART_RESOURCE_FILES,
        AttachmentKey::Topic { .. } => PART_VIDEO_FILES,
    }
}

/// Fields that must be filled in before a draft may be sent.
pub fn validate_required(draft: &Draft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(DraftError::MissingField("title"));
    }
    Ok(())
}

/// Serialize the draft and collect its pending binaries.
///
/// Fails (and sends nothing) if a numeric field is infinite or a structural
/// invariant of the tree does not hold.
pub fn build_submission(draft: &Draft, attachments: &Attachments) -> Result<CourseSubmission> {
    let dd = &draft.duration_details;
    let pricing = &draft.pricing;
    let fa = &draft.final_assessment;

    let modules = draft
        .modules
        .iter()
        .enumerate()
        .map(|(m, module)| module_part(m, module))
        .collect::<Result<Vec<_>>>()?;

    let metadata = CourseDetails {
        title: draft.title.clone(),
        description: draft.description.clone(),
        category: draft.category.clone(),
        level: draft.level.clone(),
        duration: draft.duration.clone(),
        price: draft.price.clone(),
        image: draft.image.clone().unwrap_or_default(),
        overview_subtitle: draft.overview_subtitle.clone(),
        overview_description: draft.overview_description.clone(),
        learn_items: draft.learn_items.to_vec(),
        duration_details: DurationDetailsPart {
            total_hours: JsNumber(coerce("durationDetails.totalHours", &dd.total_hours)?),
            total_weeks: JsNumber(coerce("durationDetails.totalWeeks", &dd.total_weeks)?),
            start_date: dd.start_date.clone(),
            end_date: dd.end_date.clone(),
        },
        pricing: PricingPart {
            original_price: JsNumber(coerce("pricing.originalPrice", &pricing.original_price)?),
            discount_text: JsNumber(coerce("pricing.discountText", &pricing.discount_text)?),
            offer_note: pricing.offer_note.clone(),
            features: pricing.features.to_vec(),
        },
        prerequisites: draft.prerequisites.to_vec(),
        modules,
        course_resources: draft
            .course_resources
            .iter()
            .map(|r| ResourcePart {
                title: r.title.clone(),
                kind: r.kind.clone(),
                file: r.file.clone().unwrap_or_default(),
            })
            .collect(),
        course_format_details: draft
            .course_format_details
            .iter()
            .map(|f| FormatDetailPart {
                class_type: f.class_type.clone(),
                assessment_types: f.assessment_types.clone(),
            })
            .collect(),
        final_assessment: FinalAssessmentPart {
            kind: fa.kind.clone(),
            description: fa.description.clone(),
            total_marks: JsNumber(coerce("finalAssessment.totalMarks", &fa.total_marks)?),
            assessment_date: fa.assessment_date.clone(),
        },
        instructor_entity: draft.instructor.map(|id| InstructorRef { id }),
    };

    let binaries: Vec<BinaryPart> = attachments
        .iter()
        .map(|(key, payload)| BinaryPart {
            field: part_name(key),
            key: *key,
            payload: payload.clone(),
        })
        .collect();

    debug!(
        modules = metadata.modules.len(),
        binaries = binaries.len(),
        "submission built"
    );
    Ok(CourseSubmission { metadata, binaries })
}

fn module_part(m: usize, module: &Module) -> Result<ModulePart> {
    if module.topics.is_empty() {
        return Err(DraftError::Cardinality {
            collection: format!("modules[{m}].topics"),
            min: 1,
        });
    }
    let topics = module
        .topics
        .iter()
        .enumerate()
        .map(|(t, topic)| topic_part(m, t, topic))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModulePart {
        title: module.title.clone(),
        lessons: module.lessons.clone(),
        hours: module.hours.clone(),
        topics,
    })
}

fn topic_part(m: usize, t: usize, topic: &Topic) -> Result<TopicPart> {
    if topic.mcq_quizzes.is_empty() {
        return Err(DraftError::Cardinality {
            collection: format!("modules[{m}].topics[{t}].mcqQuizzes"),
            min: 1,
        });
    }
    let mcq_quizzes = topic
        .mcq_quizzes
        .iter()
        .enumerate()
        .map(|(k, quiz)| quiz_part(&format!("modules[{m}].topics[{t}].mcqQuizzes[{k}]"), quiz))
        .collect::<Result<Vec<_>>>()?;

    Ok(TopicPart {
        title: topic.title.clone(),
        file: topic.file.clone().unwrap_or_default(),
        preview: topic.flags.preview,
        watch: topic.flags.watch,
        completed: topic.flags.completed,
        has_assessment: topic.flags.has_assessment,
        unlock_date: topic.unlock_date.clone(),
        mcq_quizzes,
    })
}

fn quiz_part(path: &str, quiz: &Quiz) -> Result<QuizPart> {
    if quiz.options.len() < MIN_QUIZ_OPTIONS {
        return Err(DraftError::Cardinality {
            collection: format!("{path}.options"),
            min: MIN_QUIZ_OPTIONS,
        });
    }
    if !quiz.correct_answer.is_empty() && !quiz.is_valid_answer(&quiz.correct_answer) {
        return Err(DraftError::CorrectAnswer(quiz.correct_answer.clone()));
    }
    let marks = coerce(&format!("{path}.marks"), &quiz.marks)?;
    if marks < 0.0 {
        return Err(DraftError::NegativeMarks(marks));
    }

    Ok(QuizPart {
        question: quiz.question.clone(),
        options: quiz.options.to_vec(),
        correct_answer: quiz.correct_answer.clone(),
        marks: JsNumber(marks),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FinalAssessment, FormatDetail, list};
    use serde_json::json;
    use std::sync::Arc;

    fn draft_with_marks(total: &str) -> Draft {
        Draft {
            title: "Rust 101".into(),
            final_assessment: Arc::new(FinalAssessment {
                total_marks: total.into(),
                ..FinalAssessment::default()
            }),
            ..Draft::new(Some(InstructorId(7)))
        }
    }

    fn metadata_value(draft: &Draft) -> serde_json::Value {
        let sub = build_submission(draft, &Attachments::new(1024)).unwrap();
        serde_json::from_slice(&sub.metadata_json().unwrap()).unwrap()
    }

    #[test]
    fn total_marks_coerces_to_number() {
        let v = metadata_value(&draft_with_marks("85"));
        assert_eq!(v["finalAssessment"]["totalMarks"], json!(85));
        assert_eq!(v["instructorEntity"], json!({"id": 7}));
    }

    #[test]
    fn garbage_total_marks_becomes_sentinel() {
        let v = metadata_value(&draft_with_marks("abc"));
        assert_eq!(v["finalAssessment"]["totalMarks"], json!(0));
    }

    #[test]
    fn infinite_total_marks_blocks_submission() {
        let err = build_submission(&draft_with_marks("1e400"), &Attachments::new(1024)).unwrap_err();
        assert!(matches!(err, DraftError::NonFinite { .. }));
    }

    #[test]
    fn legacy_format_field_name_is_kept() {
        let draft = Draft {
            course_format_details: list([FormatDetail {
                class_type: "Live".into(),
                assessment_types: "Quiz".into(),
            }]),
            ..draft_with_marks("0")
        };
        let v = metadata_value(&draft);
        assert_eq!(
            v["courseFormatDetails"],
            json!([{"classType": "Live", "assesmentTypes": "Quiz"}])
        );
    }

    #[test]
    fn fractional_numbers_stay_fractional() {
        assert_eq!(serde_json::to_value(JsNumber(2.5)).unwrap(), json!(2.5));
        assert_eq!(serde_json::to_value(JsNumber(-3.0)).unwrap(), json!(-3));
    }

    #[test]
    fn missing_title_fails_required_check() {
        let draft = Draft::new(None);
        assert_eq!(validate_required(&draft), Err(DraftError::MissingField("title")));
        // The pure build still works for previews.
        assert!(build_submission(&draft, &Attachments::new(1)).is_ok());
    }

    #[test]
    fn binaries_come_out_in_part_order() {
        let mut table = Attachments::new(1024);
        table
            .insert(AttachmentKey::Topic { module: 0, topic: 1 }, PendingBinary::new("t.mp4", "video/mp4", vec![1]))
            .unwrap();
        table
            .insert(AttachmentKey::Resource(0), PendingBinary::new("r.pdf", "application/pdf", vec![2]))
            .unwrap();
        table
            .insert(AttachmentKey::CourseImage, PendingBinary::new("c.png", "image/png", vec![3]))
            .unwrap();

        let sub = build_submission(&Draft::new(None), &table).unwrap();
        let fields: Vec<_> = sub.binaries.iter().map(|b| b.field).collect();
        assert_eq!(fields, [PART_IMAGE, PART_RESOURCE_FILES, PART_VIDEO_FILES]);
    }
}
