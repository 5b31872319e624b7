use futures::{
    future::BoxFuture,
    FutureExt,
};

use super::{
    types::{
        BatchEntry,
        SubmitRequest,
        SubmitResponse,
    },
    ItemSource,
    OutcomeSubmitter,
};
use crate::core::{
    http::Transport,
    models::{
        ContentSnapshot,
        ItemId,
        Outcome,
        SessionId,
        SessionInfo,
    },
    PracticeError,
};

/// REST client for the practice endpoints.
pub struct ApiClient {
    transport: Transport,
}

impl ApiClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn get_session(&self, session_id: &SessionId) -> Result<SessionInfo, PracticeError> {
        self.transport.get_json(&format!("/practice/sessions/{session_id}"), &[]).await
    }

    pub async fn get_monsters(
        &self,
        session_id: &SessionId,
        count: usize,
    ) -> Result<Vec<BatchEntry>, PracticeError> {
        self.transport
            .get_json(
                &format!("/practice/sessions/{session_id}/monsters"),
                &[("count", count.to_string())],
            )
            .await
    }

    pub async fn get_monster(&self, item_id: &ItemId) -> Result<ContentSnapshot, PracticeError> {
        self.transport.get_json(&format!("/monsters/{item_id}"), &[]).await
    }

    pub async fn post_result(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        outcome: Outcome,
    ) -> Result<SubmitResponse, PracticeError> {
        self.transport
            .post_json(
                &format!("/practice/sessions/{session_id}/results"),
                &SubmitRequest { item_id, outcome },
            )
            .await
    }
}

impl ItemSource for ApiClient {
    fn fetch_session<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<SessionInfo, PracticeError>> {
        self.get_session(session_id).boxed()
    }

    fn fetch_batch<'a>(
        &'a self,
        session_id: &'a SessionId,
        count: usize,
    ) -> BoxFuture<'a, Result<Vec<BatchEntry>, PracticeError>> {
        self.get_monsters(session_id, count).boxed()
    }

    fn fetch_detail<'a>(
        &'a self,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, Result<ContentSnapshot, PracticeError>> {
        self.get_monster(item_id).boxed()
    }
}

impl OutcomeSubmitter for ApiClient {
    fn submit<'a>(
        &'a self,
        session_id: &'a SessionId,
        item_id: &'a ItemId,
        outcome: Outcome,
    ) -> BoxFuture<'a, Result<SubmitResponse, PracticeError>> {
        self.post_result(session_id, item_id, outcome).boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        matchers::{
            body_json,
            method,
            path,
            query_param,
        },
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;
    use crate::{
        api::fetch_practice_items,
        core::http::{
            Credentials,
            RetryPolicy,
        },
    };

    fn client(server: &MockServer) -> ApiClient {
        let transport = Transport::new(
            server.uri(),
            Credentials { access_token: "tok".into(), refresh_token: None },
            RetryPolicy { max_retries: 0, backoff: Duration::from_millis(1) },
            Duration::from_secs(5),
        )
        .unwrap();
        ApiClient::new(transport)
    }

    #[tokio::test]
    async fn test_batch_with_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/practice/sessions/s1/monsters"))
            .and(query_param("count", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sequence_position": 0, "monster_id": "bat", "familiarity": 5, "difficulty": 1, "visibility": 90 },
                { "sequence_position": 1, "monster_id": "orc", "familiarity": 60, "difficulty": 4, "visibility": 30 }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/monsters/bat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "name": "Bat", "description": "Flaps." })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/monsters/orc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Orc" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let items = fetch_practice_items(&client, &SessionId("s1".into()), 2).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content.description, "Flaps.");
        assert_eq!(items[1].content.name, "Orc");
        assert_eq!(items[1].difficulty, 4);
    }

    #[tokio::test]
    async fn test_submit_posts_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/practice/sessions/s1/results"))
            .and(body_json(json!({ "monster_id": "orc", "outcome": "kill" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "points_update": 12,
                "from": { "practice_count": 2 },
                "updates": {
                    "familiarity": 40,
                    "next_practice_at": "2026-10-19T08:00:00Z",
                    "practice_at": "2026-10-16T08:00:00Z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .submit(&SessionId("s1".into()), &ItemId("orc".into()), Outcome::Kill)
            .await
            .unwrap();
        assert_eq!(response.points_update, 12);
        assert_eq!(response.updates.familiarity, 40);
    }

    #[tokio::test]
    async fn test_session_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/practice/sessions/s1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "s1", "name": "Caves" })),
            )
            .mount(&server)
            .await;

        let info = client(&server).fetch_session(&SessionId("s1".into())).await.unwrap();
        assert_eq!(info.name, "Caves");
        assert_eq!(info.total_items, None);
    }
}
