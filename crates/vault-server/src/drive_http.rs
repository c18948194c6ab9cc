//! Google Drive v3 over HTTP.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use vault_core::drive::{FOLDER_MIME_TYPE, Result, TEXT_MIME_TYPE};
use vault_core::{DriveError, RemoteDrive, RemoteFile, RemoteFolder};

use crate::config::DriveConfig;

const FOLDER_FIELDS: &str = "files(id,name,parents)";
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,parents";

#[derive(Deserialize)]
struct FileList<T> {
    #[serde(default = "Vec::new")]
    files: Vec<T>,
}

/// Drive client authorised with a bearer token.
pub struct HttpDrive {
    client: Client,
    token: String,
    api_base: String,
    upload_base: String,
}

impl HttpDrive {
    pub fn new(token: String, config: &DriveConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vault-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DriveError::Request(e.to_string()))?;
        Ok(Self {
            client,
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        })
    }

    async fn list<T: DeserializeOwned>(&self, query: &str, fields: &str) -> Result<Vec<T>> {
        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&self.token)
            .query(&[("q", query), ("fields", fields)])
            .send()
            .await
            .map_err(request_error)?;
        let list: FileList<T> = check(response, "files")?
            .json()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))?;
        Ok(list.files)
    }
}

/// Drive query for the direct children of a folder.
fn children_query(folder_id: &str) -> String {
    format!("'{}' in parents and trashed = false", folder_id.replace('\'', "\\'"))
}

fn request_error(e: reqwest::Error) -> DriveError {
    DriveError::Request(e.to_string())
}

fn status_error(status: StatusCode, id: &str) -> DriveError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DriveError::Unauthorized,
        StatusCode::NOT_FOUND => DriveError::NotFound(id.to_string()),
        other => DriveError::Request(format!("{} for {}", other, id)),
    }
}

fn check(response: Response, id: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status_error(status, id))
    }
}

#[async_trait]
impl RemoteDrive for HttpDrive {
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>> {
        let query = format!("mimeType = '{}' and trashed = false", FOLDER_MIME_TYPE);
        self.list(&query, FOLDER_FIELDS).await
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let fields = format!("files({})", FILE_FIELDS);
        self.list(&children_query(folder_id), &fields).await
    }

    async fn read(&self, file_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(request_error)?;
        check(response, file_id)?
            .text()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))
    }

    async fn write(&self, file_id: &str, content: &str) -> Result<()> {
        let response = self
            .client
            .patch(format!("{}/files/{}", self.upload_base, file_id))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, TEXT_MIME_TYPE)
            .body(content.to_string())
            .send()
            .await
            .map_err(request_error)?;
        check(response, file_id)?;
        Ok(())
    }

    async fn create(&self, folder_id: &str, name: &str, content: &str) -> Result<RemoteFile> {
        let metadata = serde_json::json!({ "name": name, "parents": [folder_id] });
        let form = multipart::Form::new()
            .part(
                "metadata",
                multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(request_error)?,
            )
            .part(
                "file",
                multipart::Part::text(content.to_string())
                    .mime_str(TEXT_MIME_TYPE)
                    .map_err(request_error)?,
            );

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;
        check(response, folder_id)?
            .json()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(request_error)?;
        check(response, file_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_query_escapes_quotes() {
        assert_eq!(
            children_query("abc"),
            "'abc' in parents and trashed = false"
        );
        assert_eq!(
            children_query("a'b"),
            "'a\\'b' in parents and trashed = false"
        );
    }

    #[test]
    fn status_codes_map_to_drive_errors() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, "f"),
            DriveError::Unauthorized
        );
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "f"),
            DriveError::NotFound("f".into())
        );
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "f"),
            DriveError::Request(_)
        ));
    }

    #[test]
    fn trims_trailing_slashes_from_bases() {
        let config = DriveConfig {
            api_base: "http://localhost:9000/drive/".into(),
            upload_base: "http://localhost:9000/upload/".into(),
            access_token: None,
        };
        let drive = HttpDrive::new("token".into(), &config).unwrap();
        assert_eq!(drive.api_base, "http://localhost:9000/drive");
        assert_eq!(drive.upload_base, "http://localhost:9000/upload");
    }

    #[test]
    fn file_list_tolerates_missing_files_key() {
        let list: FileList<RemoteFolder> = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }
}
