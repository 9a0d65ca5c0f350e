use crate::domain::models::{Board, ColumnValue, Group, Task};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;

const MONDAY_API_ENDPOINT: &str = "https://api.monday.com/v2/";

const BOARD_QUERY: &str = r#"
query getAllItemsInGroupsByBoardId($boardID: [Int]) {
  boards(ids: $boardID) {
    name
    groups {
      id
      title
      items(limit: 50) {
        id
        name
        column_values {
          id
          text
          title
        }
      }
    }
  }
}
"#;

#[async_trait]
pub trait BoardClient: Send + Sync {
    async fn fetch_board(&self, board_id: u64) -> Result<Board, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestMondayClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl ReqwestMondayClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, MONDAY_API_ENDPOINT)
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: BoardVariables,
}

#[derive(Debug, serde::Serialize)]
struct BoardVariables {
    #[serde(rename = "boardID")]
    board_id: Vec<u64>,
}

#[derive(Debug, serde::Deserialize)]
struct GraphqlResponse {
    data: Option<BoardsData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, serde::Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, serde::Deserialize)]
struct BoardsData {
    #[serde(default)]
    boards: Vec<BoardPayload>,
}

#[derive(Debug, serde::Deserialize)]
struct BoardPayload {
    name: Option<String>,
    #[serde(default)]
    groups: Vec<GroupPayload>,
}

#[derive(Debug, serde::Deserialize)]
struct GroupPayload {
    title: String,
    #[serde(default)]
    items: Vec<ItemPayload>,
}

#[derive(Debug, serde::Deserialize)]
struct ItemPayload {
    name: String,
    #[serde(default)]
    column_values: Vec<ColumnValuePayload>,
}

#[derive(Debug, serde::Deserialize)]
struct ColumnValuePayload {
    title: String,
    text: Option<String>,
}

impl BoardPayload {
    fn into_board(self, board_id: u64) -> Board {
        let id = board_id.to_string();
        Board {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            groups: self
                .groups
                .into_iter()
                .map(|group| Group {
                    title: group.title,
                    tasks: group
                        .items
                        .into_iter()
                        .map(|item| Task {
                            name: item.name,
                            column_values: item
                                .column_values
                                .into_iter()
                                .map(|column| ColumnValue {
                                    title: column.title,
                                    text: column.text,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl BoardClient for ReqwestMondayClient {
    async fn fetch_board(&self, board_id: u64) -> Result<Board, InfraError> {
        if self.api_key.trim().is_empty() {
            return Err(InfraError::BoardApi("api key must not be empty".to_string()));
        }

        let request = GraphqlRequest {
            query: BOARD_QUERY,
            variables: BoardVariables {
                board_id: vec![board_id],
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                InfraError::BoardApi(format!("network error while fetching board: {error}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| {
                InfraError::BoardApi(format!("failed reading board response: {error}"))
            })?;

        if !status.is_success() {
            return Err(InfraError::BoardApi(format!(
                "http {} while fetching board {board_id}; body={body}",
                status.as_u16()
            )));
        }

        let parsed: GraphqlResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::BoardApi(format!("invalid board payload: {error}; body={body}"))
        })?;

        if !parsed.errors.is_empty() {
            let messages: Vec<&str> = parsed
                .errors
                .iter()
                .map(|error| error.message.as_str())
                .collect();
            return Err(InfraError::BoardApi(format!(
                "query for board {board_id} failed: {}",
                messages.join("; ")
            )));
        }

        parsed
            .data
            .and_then(|data| data.boards.into_iter().next())
            .map(|board| board.into_board(board_id))
            .ok_or_else(|| InfraError::BoardApi(format!("board {board_id} was not found")))
    }
}
