use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::StoreError;
use crate::models::DocumentSnapshot;
use crate::storage::{DocumentStore, StoreFuture};

/// Reads documents from the file management API.
#[derive(Debug)]
pub struct FileServiceClient {
    client: Client,
    base_url: String,
    jwt_secret: Option<String>,
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

/// File record as returned by the file API. Only the fields we need.
#[derive(Debug, Deserialize)]
struct FileRecord {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileResponse {
    Wrapped { file: FileRecord },
    Bare(FileRecord),
}

impl FileServiceClient {
    pub fn new(base_url: String, jwt_secret: Option<String>, service_name: String) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            jwt_secret,
            service_name,
        })
    }

    fn generate_token(&self) -> Option<String> {
        let secret = self.jwt_secret.as_ref()?;
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(60)) // 1 minute expiration
            .map(|t| t.timestamp())
            .unwrap_or_default();

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        match encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())) {
            Ok(token) => Some(token),
            Err(e) => {
                error!("Failed to generate service token: {}", e);
                None
            }
        }
    }

    fn document_url(&self, project_id: &str, file_id: &str) -> String {
        format!("{}/api/projects/{}/files/{}", self.base_url, project_id, file_id)
    }

    async fn fetch(&self, project_id: &str, file_id: &str) -> Result<DocumentSnapshot, StoreError> {
        let url = self.document_url(project_id, file_id);
        debug!("Fetching document from file service: {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = self.generate_token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(StoreError::NotFound {
                    project_id: project_id.to_string(),
                    file_id: file_id.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(StoreError::Unavailable(format!("file service answered {}", status)));
            }
            _ => {}
        }

        let record = match response
            .json::<FileResponse>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?
        {
            FileResponse::Wrapped { file } => file,
            FileResponse::Bare(file) => file,
        };

        Ok(DocumentSnapshot {
            file_id: file_id.to_string(),
            project_id: project_id.to_string(),
            content: record.content.unwrap_or_default(),
        })
    }
}

impl DocumentStore for FileServiceClient {
    fn get_document<'a>(&'a self, project_id: &'a str, file_id: &'a str) -> StoreFuture<'a, DocumentSnapshot> {
        Box::pin(self.fetch(project_id, file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_document_url_without_double_slash() {
        let client = FileServiceClient::new("http://files.local/".into(), None, "codecollab-sync".into()).unwrap();
        assert_eq!(client.document_url("p1", "f1"), "http://files.local/api/projects/p1/files/f1");
    }

    #[test]
    fn token_only_when_secret_configured() {
        let without = FileServiceClient::new("http://x".into(), None, "svc".into()).unwrap();
        assert!(without.generate_token().is_none());
        let with = FileServiceClient::new("http://x".into(), Some("secret".into()), "svc".into()).unwrap();
        assert!(with.generate_token().is_some());
    }

    #[test]
    fn accepts_wrapped_and_bare_file_records() {
        let wrapped: FileResponse = serde_json::from_str(r#"{"file":{"content":"a"}}"#).unwrap();
        assert!(matches!(wrapped, FileResponse::Wrapped { file } if file.content.as_deref() == Some("a")));
        let bare: FileResponse = serde_json::from_str(r#"{"content":null,"name":"x"}"#).unwrap();
        assert!(matches!(bare, FileResponse::Bare(file) if file.content.is_none()));
    }
}
