use serde::{Deserialize, Serialize};

/// A lesson of a course as served by `/api/lessons`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: u64,
    pub course_id: u64,
    #[serde(rename = "description", alias = "title")]
    pub title: String,
    #[serde(default)]
    pub seq_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_read_from_description_or_title() {
        let from_description: Lesson = serde_json::from_str(
            r#"{"id": 1, "courseId": 12, "description": "Intro", "seqNo": 1, "duration": "4:17"}"#,
        )
        .unwrap();
        let from_title: Lesson =
            serde_json::from_str(r#"{"id": 2, "courseId": 12, "title": "Setup"}"#).unwrap();

        assert_eq!(from_description.title, "Intro");
        assert_eq!(from_description.duration.as_deref(), Some("4:17"));
        assert_eq!(from_title.title, "Setup");
        assert_eq!(from_title.seq_no, 0);
    }
}
