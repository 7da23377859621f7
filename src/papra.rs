//! Papra document-store client: tag vocabulary, tag creation and
//! attachment, document upload.
//!
//! Every call is scoped to one organization and authenticated with the
//! Papra API key as a bearer token:
//!
//! | Call | Method and path (under `/api/organizations/<org>`) |
//! |------|----------------------------------------------------|
//! | [`PapraClient::list_tags`] | `GET /tags` |
//! | [`PapraClient::create_tag`] | `POST /tags` |
//! | [`PapraClient::attach_tag_to_document`] | `POST /documents/<id>/tags` |
//! | [`PapraClient::upload_document`] | `POST /documents` (multipart) |

use crate::config::IngestConfig;
use crate::error::{truncate_body, IngestError};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Colour given to tags created by this tool.
pub const DEFAULT_TAG_COLOR: &str = "#000000";

/// A tag as stored in Papra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The part of Papra's upload reply this tool cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Deserialize)]
struct TagEnvelope {
    tag: Tag,
}

#[derive(Deserialize)]
struct DocumentEnvelope {
    document: Option<UploadedDocument>,
}

#[derive(Serialize)]
struct CreateTagRequest<'a> {
    name: &'a str,
    color: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachTagRequest<'a> {
    tag_id: &'a str,
}

/// Client for one Papra organization.
#[derive(Debug, Clone)]
pub struct PapraClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    organization_id: String,
}

impl PapraClient {
    /// Build a client from the configuration. Fails when required fields
    /// are missing or the Papra URL does not parse.
    pub fn new(config: &IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let base = Url::parse(&config.papra_url).map_err(|e| {
            IngestError::InvalidConfig(format!("papra_url '{}': {e}", config.papra_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(IngestError::InvalidConfig(format!(
                "papra_url '{}' is not a base URL",
                config.papra_url
            )));
        }
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            base,
            api_key: config.papra_api_key.clone(),
            organization_id: config.papra_organization_id.clone(),
        })
    }

    /// Absolute URL of `path` inside the organization. Only the origin of
    /// the configured Papra URL is kept.
    pub fn org_url(&self, path: &str) -> Result<Url, IngestError> {
        let full = format!(
            "/api/organizations/{}/{}",
            self.organization_id,
            path.trim_start_matches('/')
        );
        self.base
            .join(&full)
            .map_err(|e| IngestError::Internal(format!("build URL for {full}: {e}")))
    }

    // ── Tags ─────────────────────────────────────────────────────────────

    /// All tags of the organization. A reply without `tags` is an empty list.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, IngestError> {
        let response = self
            .http
            .get(self.org_url("tags")?)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let list: TagList = parse_json(check_status(response).await?).await?;
        debug!("Fetched {} existing tags", list.tags.len());
        Ok(list.tags)
    }

    /// Create a tag named `name`.
    pub async fn create_tag(&self, name: &str) -> Result<Tag, IngestError> {
        let response = self
            .http
            .post(self.org_url("tags")?)
            .bearer_auth(&self.api_key)
            .json(&CreateTagRequest {
                name,
                color: DEFAULT_TAG_COLOR,
            })
            .send()
            .await?;
        let envelope: TagEnvelope = parse_json(check_status(response).await?).await?;
        info!("Created tag '{}' ({})", envelope.tag.name, envelope.tag.id);
        Ok(envelope.tag)
    }

    /// Attach an existing tag to a document.
    pub async fn attach_tag_to_document(
        &self,
        document_id: &str,
        tag_id: &str,
    ) -> Result<(), IngestError> {
        let response = self
            .http
            .post(self.org_url(&format!("documents/{document_id}/tags"))?)
            .bearer_auth(&self.api_key)
            .json(&AttachTagRequest { tag_id })
            .send()
            .await?;
        check_status(response).await?;
        debug!("Attached tag {} to document {}", tag_id, document_id);
        Ok(())
    }

    /// Resolve `names` to tags, creating the ones that do not exist yet.
    ///
    /// Names are matched case-insensitively against the organization's tags,
    /// which are listed once. The result follows the order of `names`; a name
    /// repeated in a different case resolves to the same tag and appears once.
    pub async fn ensure_tags_exist(&self, names: &[String]) -> Result<Vec<Tag>, IngestError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_name: HashMap<String, Tag> = self
            .list_tags()
            .await?
            .into_iter()
            .map(|tag| (tag.name.to_lowercase(), tag))
            .collect();

        let mut resolved: Vec<Tag> = Vec::with_capacity(names.len());
        for name in names {
            let key = name.to_lowercase();
            let tag = match by_name.get(&key) {
                Some(tag) => tag.clone(),
                None => {
                    let created = self.create_tag(name).await?;
                    by_name.insert(key, created.clone());
                    created
                }
            };
            if !resolved.iter().any(|t| t.id == tag.id) {
                resolved.push(tag);
            }
        }
        Ok(resolved)
    }

    /// Ensure every tag in `names` exists, then attach all of them to the
    /// document. Returns the attached tags.
    pub async fn attach_tags_to_document(
        &self,
        document_id: &str,
        names: &[String],
    ) -> Result<Vec<Tag>, IngestError> {
        let tags = self.ensure_tags_exist(names).await?;
        self.attach_resolved_tags(document_id, &tags).await?;
        Ok(tags)
    }

    /// Attach tags that are already known to exist.
    pub async fn attach_resolved_tags(
        &self,
        document_id: &str,
        tags: &[Tag],
    ) -> Result<(), IngestError> {
        for tag in tags {
            self.attach_tag_to_document(document_id, &tag.id).await?;
        }
        Ok(())
    }

    // ── Documents ────────────────────────────────────────────────────────

    /// Upload the PDF at `path`, passing `ocr_languages` to Papra's OCR.
    ///
    /// Returns `None` when Papra accepted the file but the reply carried no
    /// document record, in which case tags cannot be attached.
    pub async fn upload_document(
        &self,
        path: &Path,
        ocr_languages: &[String],
    ) -> Result<Option<UploadedDocument>, IngestError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| IngestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let size = bytes.len();

        let file_part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/pdf")?;
        let mut form = Form::new().part("file", file_part);
        if !ocr_languages.is_empty() {
            let languages = serde_json::to_string(ocr_languages)
                .map_err(|e| IngestError::Internal(format!("encode OCR languages: {e}")))?;
            form = form.text("ocrLanguages", languages);
        }

        debug!("Uploading {} ({} bytes)", file_name, size);
        let response = self
            .http
            .post(self.org_url("documents")?)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        match serde_json::from_str::<DocumentEnvelope>(&body) {
            Ok(envelope) => Ok(envelope.document),
            Err(e) => {
                debug!("Upload reply is not a document envelope ({}): {}", e, truncate_body(&body));
                Ok(None)
            }
        }
    }
}

/// Turn a non-2xx reply into [`IngestError::PapraApi`].
async fn check_status(response: Response) -> Result<Response, IngestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IngestError::PapraApi {
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, IngestError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        IngestError::UnexpectedResponse(format!("{e} in {}", truncate_body(&body)))
    })
}
