use super::error::{self, Result};
use super::{ClusterApi, ResourceClient};
use crate::constants::TOKEN_REVIEW_NAME;
use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use log::{debug, info};
use snafu::ensure;

/// Submits `TokenReview` requests to a managed cluster's API server.
pub struct TokenReviewClient<'a> {
    reviews: ResourceClient<'a, TokenReview>,
}

impl<'a> TokenReviewClient<'a> {
    pub fn new(managed: &'a dyn ClusterApi) -> Self {
        Self {
            reviews: ResourceClient::cluster_scoped(managed),
        }
    }

    /// Ask the managed cluster who `token` belongs to. Nothing is persisted by the API server,
    /// the answer is in the returned object's status.
    pub async fn review(&self, token: &str) -> Result<TokenReview> {
        self.reviews
            .create(&TokenReview {
                metadata: ObjectMeta {
                    name: Some(TOKEN_REVIEW_NAME.to_string()),
                    ..ObjectMeta::default()
                },
                spec: TokenReviewSpec {
                    token: Some(token.to_string()),
                    ..TokenReviewSpec::default()
                },
                status: None,
            })
            .await
    }

    /// Succeeds when the managed cluster authenticates `token` as `expected_username`.
    pub async fn validate(&self, token: &str, expected_username: &str) -> Result<()> {
        let review = self.review(token).await?;
        let status = review.status.unwrap_or_default();
        debug!(
            "token review on '{}': authenticated={:?}",
            self.reviews.endpoint().name(),
            status.authenticated
        );
        ensure!(
            status.authenticated.unwrap_or_default(),
            error::TokenNotAuthenticatedSnafu {
                username: expected_username,
                reason: status
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "not authenticated".to_string()),
            }
        );
        let actual = status
            .user
            .and_then(|user| user.username)
            .unwrap_or_default();
        ensure!(
            actual == expected_username,
            error::UsernameMismatchSnafu {
                expected: expected_username,
                actual,
            }
        );
        info!(
            "'{}' authenticated the token as '{}'",
            self.reviews.endpoint().name(),
            actual
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clients::ErrorKind;
    use crate::mock::{MockCluster, Verb};
    use crate::resource_id::TOKEN_REVIEW;
    use http::StatusCode;

    fn managed() -> MockCluster {
        let managed = MockCluster::new("cluster1");
        managed.authenticate(
            "good-token",
            "system:serviceaccount:open-cluster-management-agent-addon:e2e-abc",
        );
        managed
    }

    #[tokio::test]
    async fn accepted_token() {
        let managed = managed();
        TokenReviewClient::new(&managed)
            .validate(
                "good-token",
                "system:serviceaccount:open-cluster-management-agent-addon:e2e-abc",
            )
            .await
            .unwrap();
        assert_eq!(managed.count(Verb::Create, &TOKEN_REVIEW), 1);
        // reviews are never stored
        let stored = managed.get_stored(&TOKEN_REVIEW, None, TOKEN_REVIEW_NAME);
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn username_mismatch() {
        let managed = managed();
        let err = TokenReviewClient::new(&managed)
            .validate("good-token", "system:serviceaccount:other:e2e-abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let message = err.to_string();
        assert!(message.contains("system:serviceaccount:other:e2e-abc"));
    }

    #[tokio::test]
    async fn unknown_token() {
        let managed = managed();
        let err = TokenReviewClient::new(&managed)
            .validate("bad-token", "anyone")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("failed to authenticate"));
    }

    #[tokio::test]
    async fn rejected_request() {
        let managed = managed();
        managed.fail_next(Verb::Create, &TOKEN_REVIEW, StatusCode::FORBIDDEN);
        let err = TokenReviewClient::new(&managed)
            .validate("good-token", "anyone")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
