//! Concrete content entities: posts and their taxonomy, media, redirects,
//! structured-data blocks and the contact inbox.
//!
//! Each type holds only its own fields. Identity, audit and soft-delete state
//! live in the surrounding [`Record`](crate::record::Record).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  entity::{Entity, EntityKind, Reference},
  relation::{POST_CATEGORY, POST_COVER_MEDIA, POST_TAGS, SCHEMA_BLOCK_POST},
};

// ─── Validation helpers ──────────────────────────────────────────────────────

fn max_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
  match value {
    Some(v) if v.chars().count() > max => Err(Error::validation(format!(
      "{field}: ensure this field has no more than {max} characters"
    ))),
    _ => Ok(()),
  }
}

fn required(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(format!("{field}: this field may not be blank")));
  }
  Ok(())
}

// ─── Category ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub title: String,
  #[serde(default)]
  pub slug:  Option<String>,
}

impl Entity for Category {
  const KIND: EntityKind = EntityKind::Category;

  fn validate(&self) -> Result<()> {
    required("title", &self.title)?;
    max_len("title", Some(&self.title), 100)
  }

  fn slug_source(&self) -> Option<&str> { Some(&self.title) }

  fn slug_mut(&mut self) -> Option<&mut Option<String>> { Some(&mut self.slug) }
}

// ─── Tag ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub slug:  Option<String>,
}

impl Entity for Tag {
  const KIND: EntityKind = EntityKind::Tag;

  fn validate(&self) -> Result<()> { max_len("title", self.title.as_deref(), 100) }

  fn slug_source(&self) -> Option<&str> { self.title.as_deref() }

  fn slug_mut(&mut self) -> Option<&mut Option<String>> { Some(&mut self.slug) }
}

// ─── Post ────────────────────────────────────────────────────────────────────

/// Editorial state of a post.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
  #[default]
  Draft,
  Published,
  Archived,
}

fn default_published() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  #[serde(default)]
  pub title:          Option<String>,
  #[serde(default)]
  pub slug:           Option<String>,
  #[serde(default)]
  pub body:           Option<String>,
  #[serde(default)]
  pub description:    Option<String>,
  #[serde(default)]
  pub status:         PostStatus,
  #[serde(default = "default_published")]
  pub is_published:   bool,
  #[serde(default)]
  pub category_id:    Option<Uuid>,
  #[serde(default)]
  pub tag_ids:        Vec<Uuid>,
  #[serde(default)]
  pub cover_media_id: Option<Uuid>,
}

impl Post {
  /// A published post with only a title set.
  pub fn titled(title: impl Into<String>) -> Self {
    Self {
      title:          Some(title.into()),
      slug:           None,
      body:           None,
      description:    None,
      status:         PostStatus::default(),
      is_published:   true,
      category_id:    None,
      tag_ids:        Vec::new(),
      cover_media_id: None,
    }
  }
}

impl Entity for Post {
  const KIND: EntityKind = EntityKind::Post;
  const SLUG_COUNTER: bool = true;

  fn references(&self) -> Vec<Reference> {
    let mut refs = Vec::with_capacity(self.tag_ids.len() + 2);
    if let Some(id) = self.category_id {
      refs.push(Reference::new(&POST_CATEGORY, id));
    }
    let mut seen = Vec::with_capacity(self.tag_ids.len());
    for &id in &self.tag_ids {
      if !seen.contains(&id) {
        seen.push(id);
        refs.push(Reference::new(&POST_TAGS, id));
      }
    }
    if let Some(id) = self.cover_media_id {
      refs.push(Reference::new(&POST_COVER_MEDIA, id));
    }
    refs
  }

  fn validate(&self) -> Result<()> {
    max_len("title", self.title.as_deref(), 150)?;
    max_len("description", self.description.as_deref(), 250)
  }

  fn slug_source(&self) -> Option<&str> { self.title.as_deref() }

  fn slug_mut(&mut self) -> Option<&mut Option<String>> { Some(&mut self.slug) }
}

// ─── Media ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
  Image,
  Video,
}

/// Metadata for an uploaded file. The bytes live in object storage under
/// `path`; nothing binary is stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
  #[serde(default)]
  pub title:      Option<String>,
  pub path:       String,
  pub media_type: MediaType,
  #[serde(default)]
  pub alt_text:   Option<String>,
}

impl Entity for Media {
  const KIND: EntityKind = EntityKind::Media;

  fn validate(&self) -> Result<()> {
    required("path", &self.path)?;
    max_len("title", self.title.as_deref(), 150)?;
    max_len("alt_text", self.alt_text.as_deref(), 250)
  }
}

// ─── ContactMessage ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
  #[serde(default)]
  pub name:    Option<String>,
  pub email:   String,
  #[serde(default)]
  pub subject: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

impl Entity for ContactMessage {
  const KIND: EntityKind = EntityKind::ContactMessage;

  fn validate(&self) -> Result<()> {
    required("email", &self.email)?;
    let valid = self
      .email
      .split_once('@')
      .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
      return Err(Error::validation("email: enter a valid email address"));
    }
    max_len("name", self.name.as_deref(), 100)?;
    max_len("subject", self.subject.as_deref(), 200)?;
    max_len("message", self.message.as_deref(), 300)
  }
}

// ─── Redirect ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redirect {
  pub source_path: String,
  pub target_path: String,
  /// `true` for 301, `false` for 302.
  #[serde(default)]
  pub permanent:   bool,
}

impl Entity for Redirect {
  const KIND: EntityKind = EntityKind::Redirect;

  fn validate(&self) -> Result<()> {
    for (field, path) in [
      ("source_path", &self.source_path),
      ("target_path", &self.target_path),
    ] {
      if !path.starts_with('/') {
        return Err(Error::validation(format!("{field}: must start with '/'")));
      }
    }
    if self.source_path == self.target_path {
      return Err(Error::validation("target_path: must differ from source_path"));
    }
    Ok(())
  }
}

// ─── SchemaBlock ─────────────────────────────────────────────────────────────

/// A structured-data (JSON-LD) block attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBlock {
  pub post_id:     Uuid,
  /// The schema.org type, e.g. `"Article"` or `"FAQPage"`.
  pub schema_type: String,
  pub data:        serde_json::Value,
}

impl Entity for SchemaBlock {
  const KIND: EntityKind = EntityKind::SchemaBlock;

  fn references(&self) -> Vec<Reference> {
    vec![Reference::new(&SCHEMA_BLOCK_POST, self.post_id)]
  }

  fn validate(&self) -> Result<()> {
    required("schema_type", &self.schema_type)?;
    if !self.data.is_object() {
      return Err(Error::validation("data: must be a JSON object"));
    }
    Ok(())
  }
}
