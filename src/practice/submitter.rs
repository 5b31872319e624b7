use std::sync::Arc;

use tracing::debug;

use crate::{
    api::{
        OutcomeSubmitter,
        SubmitResponse,
    },
    core::{
        models::{
            ItemId,
            Outcome,
            PracticeCount,
            SessionId,
            SubmissionResult,
        },
        PracticeError,
    },
};

/// Merge payload produced from an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub result: SubmissionResult,
    pub points: i64,
}

/// Sends an outcome and turns the server's answer into a merge payload. The response
/// is authoritative; the only local arithmetic is bumping the previous practice count.
pub struct ResultSubmitter {
    submitter: Arc<dyn OutcomeSubmitter>,
}

impl ResultSubmitter {
    pub fn new(submitter: Arc<dyn OutcomeSubmitter>) -> Self {
        Self { submitter }
    }

    pub async fn submit(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        outcome: Outcome,
    ) -> Result<SubmissionOutcome, PracticeError> {
        let response = self.submitter.submit(session_id, item_id, outcome).await?;
        debug!(
            session = %session_id,
            monster = %item_id,
            ?outcome,
            points = response.points_update,
            "outcome accepted"
        );
        map_response(response)
    }
}

impl Clone for ResultSubmitter {
    fn clone(&self) -> Self {
        Self { submitter: Arc::clone(&self.submitter) }
    }
}

/// Rejects a familiarity outside 0-100 rather than clamping it.
pub fn map_response(response: SubmitResponse) -> Result<SubmissionOutcome, PracticeError> {
    let familiarity = response.updates.familiarity;
    if familiarity > 100 {
        return Err(PracticeError::Validation(format!(
            "familiarity {familiarity} out of range in submission result"
        )));
    }

    let practice_count = match response.from.practice_count {
        Some(previous) => PracticeCount::Count(previous.saturating_add(1)),
        None => PracticeCount::Pending,
    };

    Ok(SubmissionOutcome {
        result: SubmissionResult {
            familiarity,
            next_practice_at: response.updates.next_practice_at,
            practice_at: response.updates.practice_at,
            practice_count,
        },
        points: response.points_update,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{
        Duration,
        TimeZone,
        Utc,
    };
    use futures::{
        future::BoxFuture,
        FutureExt,
    };

    use super::*;
    use crate::api::types::{
        PreviousState,
        UpdatedState,
    };

    fn response(previous: Option<u32>) -> SubmitResponse {
        let practice_at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        SubmitResponse {
            points_update: 25,
            from: PreviousState { practice_count: previous },
            updates: UpdatedState {
                familiarity: 40,
                next_practice_at: practice_at + Duration::days(3),
                practice_at,
            },
        }
    }

    struct Fixed(SubmitResponse);

    impl OutcomeSubmitter for Fixed {
        fn submit<'a>(
            &'a self,
            _session_id: &'a SessionId,
            _item_id: &'a ItemId,
            _outcome: Outcome,
        ) -> BoxFuture<'a, Result<SubmitResponse, PracticeError>> {
            let response = self.0.clone();
            async move { Ok(response) }.boxed()
        }
    }

    #[test]
    fn test_maps_server_fields_verbatim() {
        let source = response(Some(4));
        let outcome = map_response(source.clone()).unwrap();

        assert_eq!(outcome.points, 25);
        assert_eq!(outcome.result.familiarity, 40);
        assert_eq!(outcome.result.next_practice_at, source.updates.next_practice_at);
        assert_eq!(outcome.result.practice_at, source.updates.practice_at);
        assert_eq!(outcome.result.practice_count, PracticeCount::Count(5));
    }

    #[test]
    fn test_unknown_previous_count_is_pending() {
        let outcome = map_response(response(None)).unwrap();
        assert_eq!(outcome.result.practice_count, PracticeCount::Pending);
    }

    #[tokio::test]
    async fn test_submit_through_collaborator() {
        let submitter = ResultSubmitter::new(Arc::new(Fixed(response(Some(0)))));
        let outcome = submitter
            .submit(&SessionId("s".into()), &ItemId("m".into()), Outcome::Kill)
            .await
            .unwrap();
        assert_eq!(outcome.result.practice_count, PracticeCount::Count(1));
    }

    #[test]
    fn test_out_of_range_familiarity_is_rejected() {
        let mut source = response(Some(2));
        source.updates.familiarity = 140;

        let result = map_response(source);
        assert!(matches!(result, Err(PracticeError::Validation(_))));
    }
}
