use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    workflow::{
        WorkflowRun, WorkflowRuns,
        client::{GitHubClient, fetch_json},
    },
};

/// The number of runs requested per page.
pub const PER_PAGE: u32 = 50;

/// Which runs to enumerate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunQuery {
    /// Runs with an ID at or below this are never yielded. Zero yields every run.
    pub lower_bound: u64,
    /// Only runs triggered on this branch.
    pub branch: Option<String>,
    /// Only runs triggered by this event.
    pub event: Option<String>,
}

/// Walks the workflow runs of a repository page by page, newest first.
///
/// Pages are fetched lazily. The enumeration ends once the `total_count` reported by the first page has been
/// consumed, a page comes back empty, or a run at or below [`RunQuery::lower_bound`] is met. The listing is sorted by
/// descending ID, so nothing after such a run can be newer.
#[derive(Debug)]
pub struct RunEnumerator<'a> {
    client: &'a GitHubClient,
    query: &'a RunQuery,
    page: u32,
    buffered: VecDeque<WorkflowRun>,
    total_count: Option<u64>,
    consumed: u64,
    finished: bool,
}

impl<'a> RunEnumerator<'a> {
    /// Creates a [`RunEnumerator`]. Nothing is fetched until [`Self::next_run`] is called.
    pub fn new(client: &'a GitHubClient, query: &'a RunQuery) -> Self {
        Self {
            client,
            query,
            page: 0,
            buffered: VecDeque::new(),
            total_count: None,
            consumed: 0,
            finished: false,
        }
    }

    /// Returns the next run newer than the lower bound, or [`None`] once the enumeration is over.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching a page fails, or [`Error::Cancelled`] once `cancel` is cancelled. The enumeration
    /// should not be resumed after an error.
    pub async fn next_run(&mut self, cancel: &CancellationToken) -> Result<Option<WorkflowRun>> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if self.finished {
                return Ok(None);
            }
            if self.total_count.is_some_and(|total| self.consumed >= total) {
                debug!("consumed all {} workflow runs", self.consumed);
                self.finished = true;
                continue;
            }

            let Some(run) = self.buffered.pop_front() else {
                self.fetch_page(cancel).await?;
                continue;
            };
            self.consumed += 1;

            if run.id <= self.query.lower_bound {
                info!(
                    "reached run {} at or below {}, stopping",
                    run.id, self.query.lower_bound
                );
                self.finished = true;
                self.buffered.clear();
                continue;
            }

            return Ok(Some(run));
        }
    }

    async fn fetch_page(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.page += 1;
        let url = self.client.endpoint("actions/runs");
        let mut request = self.client.request(&url).query(&[
            ("per_page", PER_PAGE.to_string()),
            ("page", self.page.to_string()),
        ]);
        if let Some(branch) = &self.query.branch {
            request = request.query(&[("branch", branch)]);
        }
        if let Some(event) = &self.query.event {
            request = request.query(&[("event", event)]);
        }

        debug!("fetching page {} of workflow runs from {url}…", self.page);
        let page: WorkflowRuns = fetch_json(request, &url, cancel).await?;

        if self.total_count.is_none() {
            info!("found {} workflow runs at {url}", page.total_count);
            self.total_count = Some(page.total_count);
        }
        if page.workflow_runs.is_empty() {
            debug!("page {} of workflow runs is empty", self.page);
            self.finished = true;
        }
        self.buffered.extend(page.workflow_runs);

        Ok(())
    }
}

/// Fetches a single workflow run by ID.
///
/// # Errors
///
/// Returns an error if the request fails or the run does not exist.
pub async fn fetch_run(
    client: &GitHubClient,
    run_id: u64,
    cancel: &CancellationToken,
) -> Result<WorkflowRun> {
    let url = client.endpoint(&format!("actions/runs/{run_id}"));
    debug!("fetching workflow run from {url}…");

    let run: WorkflowRun = fetch_json(client.request(&url), &url, cancel).await?;
    info!("fetched workflow run {run}");

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    use crate::workflow::client::{Credentials, DEFAULT_TIMEOUT};

    fn client(server: &ServerGuard) -> GitHubClient {
        GitHubClient::new(
            &server.url(),
            "octo",
            "demo",
            Credentials::Token("secret".to_owned()),
            DEFAULT_TIMEOUT,
        )
        .unwrap()
    }

    fn page(total_count: u64, ids: &[u64]) -> String {
        let runs: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "head_branch": "main",
                    "event": "push",
                    "artifacts_url": format!("https://example.com/runs/{id}/artifacts"),
                    "head_commit": { "id": format!("sha{id}"), "message": "msg" },
                })
            })
            .collect();
        json!({ "total_count": total_count, "workflow_runs": runs }).to_string()
    }

    fn page_query(page: u32) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("per_page".into(), PER_PAGE.to_string()),
            Matcher::UrlEncoded("page".into(), page.to_string()),
        ])
    }

    async fn collect(enumerator: &mut RunEnumerator<'_>) -> Result<Vec<u64>> {
        let cancel = CancellationToken::new();
        let mut ids = Vec::new();
        while let Some(run) = enumerator.next_run(&cancel).await? {
            ids.push(run.id);
        }
        Ok(ids)
    }

    #[tokio::test]
    async fn stops_at_the_lower_bound() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(1))
            .with_body(page(200, &[105, 102, 99]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(2))
            .with_body(page(200, &[98]))
            .expect(0)
            .create_async()
            .await;
        let client = client(&server);
        let query = RunQuery {
            lower_bound: 100,
            ..RunQuery::default()
        };

        let ids = collect(&mut RunEnumerator::new(&client, &query)).await.unwrap();

        assert_eq!(ids, [105, 102]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn walks_pages_until_the_total_count_is_consumed() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(1))
            .with_body(page(3, &[30, 20]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(2))
            .with_body(page(3, &[10]))
            .expect(1)
            .create_async()
            .await;
        let third = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(3))
            .with_body(page(3, &[]))
            .expect(0)
            .create_async()
            .await;
        let client = client(&server);
        let query = RunQuery::default();

        let ids = collect(&mut RunEnumerator::new(&client, &query)).await.unwrap();

        assert_eq!(ids, [30, 20, 10]);
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn an_empty_page_ends_an_overcounted_listing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(1))
            .with_body(page(500, &[7]))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(2))
            .with_body(page(500, &[]))
            .expect(1)
            .create_async()
            .await;
        let client = client(&server);
        let query = RunQuery::default();

        let ids = collect(&mut RunEnumerator::new(&client, &query)).await.unwrap();

        assert_eq!(ids, [7]);
        second.assert_async().await;
    }

    #[tokio::test]
    async fn passes_branch_and_event_filters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("branch".into(), "release/1.x".into()),
                Matcher::UrlEncoded("event".into(), "push".into()),
            ]))
            .with_body(page(1, &[5]))
            .expect(1)
            .create_async()
            .await;
        let client = client(&server);
        let query = RunQuery {
            lower_bound: 0,
            branch: Some("release/1.x".to_owned()),
            event: Some("push".to_owned()),
        };

        let ids = collect(&mut RunEnumerator::new(&client, &query)).await.unwrap();

        assert_eq!(ids, [5]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn a_failed_page_aborts_the_enumeration() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(1))
            .with_status(502)
            .with_body(r#"{"message":"Server Error"}"#)
            .create_async()
            .await;
        let client = client(&server);
        let query = RunQuery::default();

        let err = collect(&mut RunEnumerator::new(&client, &query))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Remote { ref message, .. } if message == "Server Error"));
    }

    #[tokio::test]
    async fn cancellation_stops_between_runs() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(1))
            .with_body(page(4, &[4, 3]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/octo/demo/actions/runs")
            .match_query(page_query(2))
            .with_body(page(4, &[2, 1]))
            .expect(0)
            .create_async()
            .await;
        let client = client(&server);
        let query = RunQuery::default();
        let cancel = CancellationToken::new();
        let mut enumerator = RunEnumerator::new(&client, &query);

        let run = enumerator.next_run(&cancel).await.unwrap().unwrap();
        cancel.cancel();
        let err = enumerator.next_run(&cancel).await.unwrap_err();

        assert_eq!(run.id, 4);
        assert!(err.is_cancelled());
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn fetches_a_single_run() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/octo/demo/actions/runs/42")
            .with_body(
                json!({
                    "id": 42,
                    "event": "pull_request",
                    "artifacts_url": "https://example.com/runs/42/artifacts",
                })
                .to_string(),
            )
            .create_async()
            .await;
        let client = client(&server);

        let run = fetch_run(&client, 42, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(run.id, 42);
        assert_eq!(run.event, "pull_request");
        assert!(run.head_commit.is_none());
    }
}
