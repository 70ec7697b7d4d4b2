use serde::{Deserialize, Deserializer};

/// Identifier handed back when a job is enqueued at the queue service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedJob {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// State of a writer job as reported by either job backend.
#[derive(Debug, Clone, Deserialize)]
pub struct JobResult {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub status: String,

    #[serde(rename = "isFinished", default)]
    pub is_finished: bool,

    #[serde(default)]
    pub result: Option<JobResultDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobResultDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl JobResult {
    pub fn message(&self) -> &str {
        self.result
            .as_ref()
            .and_then(|detail| detail.message.as_deref())
            .unwrap_or("No message")
    }
}

/// Terminal outcome of a writer job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success { id: String },
    Failure { message: String },
}

/// Normalize a terminal job state. `success` and `error` are the terminal
/// statuses, anything else surfacing here means the backend stopped the job
/// in an unexpected state.
pub fn classify(job: &JobResult) -> JobOutcome {
    match job.status.as_str() {
        "success" => JobOutcome::Success { id: job.id.clone() },
        "error" => JobOutcome::Failure {
            message: format!(
                "Writer job failed with following message: \"{}\"",
                job.message()
            ),
        },
        other => JobOutcome::Failure {
            message: format!(
                "Writer job failed with status \"{}\" and message: \"{}\"",
                other,
                job.message()
            ),
        },
    }
}

// The legacy job service reports numeric ids, the queue service strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        String(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::String(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(status: &str, message: Option<&str>) -> JobResult {
        JobResult {
            id: "123".to_string(),
            status: status.to_string(),
            is_finished: true,
            result: message.map(|m| JobResultDetail {
                message: Some(m.to_string()),
            }),
        }
    }

    #[test]
    fn test_success_carries_the_job_id() {
        assert_eq!(
            classify(&job("success", None)),
            JobOutcome::Success {
                id: "123".to_string()
            }
        );
    }

    #[test]
    fn test_error_status_carries_the_remote_message() {
        assert_eq!(
            classify(&job("error", Some("table not found"))),
            JobOutcome::Failure {
                message: "Writer job failed with following message: \"table not found\""
                    .to_string()
            }
        );
    }

    #[test]
    fn test_unknown_status_reports_status_and_message() {
        assert_eq!(
            classify(&job("cancelled", Some("killed by operator"))),
            JobOutcome::Failure {
                message:
                    "Writer job failed with status \"cancelled\" and message: \"killed by operator\""
                        .to_string()
            }
        );
    }

    #[test]
    fn test_missing_message_defaults_to_placeholder() {
        assert_eq!(
            classify(&job("cancelled", None)),
            JobOutcome::Failure {
                message: "Writer job failed with status \"cancelled\" and message: \"No message\""
                    .to_string()
            }
        );
    }

    #[test]
    fn test_job_ids_deserialize_from_numbers_and_strings() {
        let numeric: JobResult =
            serde_json::from_value(json!({ "id": 4521, "status": "success" })).unwrap();
        assert_eq!(numeric.id, "4521");
        assert!(!numeric.is_finished);

        let string: JobResult = serde_json::from_value(
            json!({ "id": "job-4521", "status": "processing", "isFinished": false }),
        )
        .unwrap();
        assert_eq!(string.id, "job-4521");
    }
}
