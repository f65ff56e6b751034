use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;

use crate::time_entry::{duration_from_parts, NewTimeEntry, SummaryPoint, TimeEntry};

/// APIのデフォルトのベースURL。
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// コミットを永続化するためのリポジトリ。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommitRepository: Send + Sync {
    /// コミットを追加し、IDと作成日時が付与されたコミットを返す。
    async fn add_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry>;

    /// IDを指定してコミットを削除する。
    async fn delete_entry(&self, id: &str) -> Result<()>;

    /// 指定された日付のコミットを取得する。
    async fn fetch_entries_for_date(&self, date: NaiveDate) -> Result<Vec<TimeEntry>>;

    /// 指定された年の日毎の合計時間を取得する。活動のない日は含まれないことがある。
    async fn fetch_summary(&self, year: i32) -> Result<Vec<SummaryPoint>>;
}

/// APIのIDは数値と文字列のどちらでも受け付ける。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommitId {
    Text(String),
    Number(i64),
}

impl CommitId {
    fn into_string(self) -> String {
        match self {
            CommitId::Text(id) => id,
            CommitId::Number(id) => id.to_string(),
        }
    }
}

/// APIのレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    id: CommitId,
    date: NaiveDate,
    message: String,
    hours: u32,
    minutes: u32,
    created_at: Option<String>,
}

impl TryFrom<CommitResponse> for TimeEntry {
    type Error = anyhow::Error;

    fn try_from(response: CommitResponse) -> Result<Self> {
        let created_at = response
            .created_at
            .as_deref()
            .map(parse_created_at)
            .transpose()?;
        let duration_minutes = duration_from_parts(response.hours, response.minutes)?;

        Ok(TimeEntry {
            id: Some(response.id.into_string()),
            date: response.date,
            message: response.message,
            duration_minutes,
            created_at,
        })
    }
}

/// 作成日時をパースする。
///
/// タイムゾーンを含まない場合はLocalタイムゾーンの日時として扱う。
fn parse_created_at(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.to_utc());
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .with_context(|| format!("Failed to parse createdAt: {}", s))?;
    let datetime = Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("Invalid local datetime: {}", s))?
        .to_utc();

    Ok(datetime)
}

/// コミットAPIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = CommitClient::new("http://localhost:8080/api");
/// let summary = client.fetch_summary(2025).await.unwrap();
/// ```
pub struct CommitClient {
    client: Client,
    api_url: String,
}

impl CommitClient {
    /// 新しい`CommitClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `api_url` - `/commits`を含まないAPIのベースURL
    pub fn new(api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn commits_url(&self) -> String {
        format!("{}/commits", self.api_url)
    }
}

#[async_trait]
impl CommitRepository for CommitClient {
    async fn add_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry> {
        let response = self
            .client
            .post(self.commits_url())
            .header(CONTENT_TYPE, "application/json")
            .json(entry)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.commits_url()))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<CommitResponse>()
            .await
            .context("Failed to deserialize response")?;
        debug!("created commit: {:?}", response);

        TimeEntry::try_from(response)
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.commits_url(), id);
        self.client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .context("Request returned an error status")?;
        info!("Commit {} deleted.", id);

        Ok(())
    }

    async fn fetch_entries_for_date(&self, date: NaiveDate) -> Result<Vec<TimeEntry>> {
        let responses = self
            .client
            .get(self.commits_url())
            .header(CONTENT_TYPE, "application/json")
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.commits_url()))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<CommitResponse>>()
            .await
            .context("Failed to deserialize response")?;
        info!("length of commits on {}: {}", date, responses.len());

        responses.into_iter().map(TimeEntry::try_from).collect()
    }

    async fn fetch_summary(&self, year: i32) -> Result<Vec<SummaryPoint>> {
        let url = format!("{}/summary", self.commits_url());
        let summary = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .query(&[("year", year.to_string())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<SummaryPoint>>()
            .await
            .context("Failed to deserialize response")?;
        info!("length of summary for {}: {}", year, summary.len());

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone, Utc};
    use mockito::Matcher;
    use rstest::rstest;
    use serde_json::json;

    use super::{parse_created_at, CommitClient, CommitRepository};
    use crate::time_entry::{NewTimeEntry, SummaryPoint};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_add_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/commits")
            .match_body(Matcher::Json(json!({
                "date": "2025-03-10",
                "message": "Fix login bug",
                "hours": 2,
                "minutes": 30,
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "a1",
                    "date": "2025-03-10",
                    "message": "Fix login bug",
                    "hours": 2,
                    "minutes": 30,
                    "createdAt": "2025-03-10T09:15:00Z",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api/", server.url()));
        let entry = client
            .add_entry(&NewTimeEntry {
                date: date(2025, 3, 10),
                message: "Fix login bug".to_string(),
                hours: 2,
                minutes: 30,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(entry.id.as_deref(), Some("a1"));
        assert_eq!(entry.date, date(2025, 3, 10));
        assert_eq!(entry.duration_minutes, 150);
        assert_eq!(
            entry.created_at,
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 15, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/commits/42")
            .with_status(204)
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api", server.url()));
        client.delete_entry("42").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_entries_for_date() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/commits")
            .match_query(Matcher::UrlEncoded("date".into(), "2025-10-13".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "id": 1,
                        "date": "2025-10-13",
                        "message": "Fix login bug",
                        "hours": 1,
                        "minutes": 0,
                        "createdAt": "2025-10-13T10:30:00",
                    },
                    {
                        "id": 2,
                        "date": "2025-10-13",
                        "message": "Update README",
                        "hours": 0,
                        "minutes": 10,
                    },
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api", server.url()));
        let entries = client
            .fetch_entries_for_date(date(2025, 10, 13))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id.as_deref(), Some("1"));
        assert_eq!(entries[0].duration_minutes, 60);
        assert_eq!(
            entries[0].created_at,
            Some(
                Local
                    .with_ymd_and_hms(2025, 10, 13, 10, 30, 0)
                    .unwrap()
                    .to_utc()
            )
        );
        assert_eq!(entries[1].duration_minutes, 10);
        assert_eq!(entries[1].created_at, None);
    }

    #[tokio::test]
    async fn test_fetch_summary() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/commits/summary")
            .match_query(Matcher::UrlEncoded("year".into(), "2025".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    { "date": "2025-03-10", "duration": 120 },
                    { "date": "2025-03-11", "duration": 15 },
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api", server.url()));
        let summary = client.fetch_summary(2025).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            summary,
            vec![
                SummaryPoint {
                    date: date(2025, 3, 10),
                    duration: 120,
                },
                SummaryPoint {
                    date: date(2025, 3, 11),
                    duration: 15,
                },
            ]
        );
    }

    /// エラーステータスが返された場合はエラーになることを確認する。
    #[rstest]
    #[case(404)]
    #[case(500)]
    #[tokio::test]
    async fn test_fetch_summary_error_status(#[case] status: usize) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/commits/summary")
            .match_query(Matcher::Any)
            .with_status(status)
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api", server.url()));
        let result = client.fetch_summary(2025).await;

        assert!(result.is_err());
    }

    /// 日付のないレスポンスはスキップせずにエラーとする。
    #[tokio::test]
    async fn test_fetch_entries_missing_date() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/commits")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{ "id": 1, "message": "x", "hours": 1, "minutes": 0 }]).to_string())
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api", server.url()));
        let result = client.fetch_entries_for_date(date(2025, 1, 1)).await;

        assert!(result.is_err());
    }

    /// `u32`の分数に収まらない時間はエラーとする。
    #[tokio::test]
    async fn test_fetch_entries_duration_out_of_range() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/commits")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": 1,
                    "date": "2025-01-01",
                    "message": "x",
                    "hours": 4294967295u32,
                    "minutes": 0,
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let client = CommitClient::new(&format!("{}/api", server.url()));
        let result = client.fetch_entries_for_date(date(2025, 1, 1)).await;

        assert!(result.is_err());
    }

    #[rstest]
    #[case::utc("2025-03-10T09:15:00Z", Utc.with_ymd_and_hms(2025, 3, 10, 9, 15, 0).unwrap())]
    #[case::offset("2025-03-10T18:15:00+09:00", Utc.with_ymd_and_hms(2025, 3, 10, 9, 15, 0).unwrap())]
    #[case::local(
        "2025-03-10T09:15:00.123",
        Local.with_ymd_and_hms(2025, 3, 10, 9, 15, 0).unwrap().to_utc() + chrono::Duration::milliseconds(123),
    )]
    fn test_parse_created_at(#[case] input: &str, #[case] expected: chrono::DateTime<Utc>) {
        assert_eq!(parse_created_at(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_created_at_invalid() {
        assert!(parse_created_at("yesterday").is_err());
    }
}
