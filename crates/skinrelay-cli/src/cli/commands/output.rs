//! Text and JSON renderings of command results.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use skinrelay_cache::StorageRecord;
use skinrelay_common::{PlayerIdentity, SkinIntent, SkinProperty, SkinSource, SkinVariant};
use skinrelay_core::{ApplySummary, ResolveReport};
use uuid::Uuid;

use super::super::args::GlobalArgs;

/// Print `value` as JSON under `--json`, otherwise its text form.
pub fn emit<T: Serialize + Render>(global: &GlobalArgs, value: &T) -> anyhow::Result<()> {
    if global.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", value.render());
    }
    Ok(())
}

pub trait Render {
    fn render(&self) -> String;
}

/// Decoded view of a property; fields are absent when the value does not decode.
#[derive(Debug, Serialize)]
pub struct Texture {
    pub hash: String,
    pub skin_url: Option<String>,
    pub variant: Option<SkinVariant>,
}

impl Texture {
    fn of(property: &SkinProperty) -> Self {
        let payload = property.textures().ok();
        Self {
            hash: property.hash().to_string(),
            skin_url: payload
                .as_ref()
                .and_then(|p| p.skin_url().map(str::to_string)),
            variant: payload.map(|p| p.variant()),
        }
    }

    fn describe(&self) -> String {
        match (&self.skin_url, self.variant) {
            (Some(url), Some(variant)) => format!("{} ({})", url, variant.as_str()),
            (Some(url), None) => url.clone(),
            _ => "-".to_string(),
        }
    }
}

/// Result of `resolve`, `set` and `reset`.
#[derive(Debug, Serialize)]
pub struct SkinReport {
    pub uuid: Uuid,
    pub name: String,
    pub intent: SkinIntent,
    pub origin: &'static str,
    pub source: SkinSource,
    #[serde(flatten)]
    pub texture: Texture,
    pub persisted: bool,
    pub apply: ApplySummary,
}

impl SkinReport {
    pub fn new(identity: &PlayerIdentity, report: &ResolveReport) -> Self {
        Self {
            uuid: identity.uuid(),
            name: identity.name().to_string(),
            intent: report.intent.clone(),
            origin: report.origin.as_str(),
            source: report.property.source(),
            texture: Texture::of(&report.property),
            persisted: report.persisted,
            apply: report.apply,
        }
    }
}

impl Render for SkinReport {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.name, self.uuid);
        let _ = writeln!(out, "  intent:    {}", self.intent);
        let _ = writeln!(out, "  origin:    {}", self.origin);
        let _ = writeln!(out, "  source:    {}", self.source);
        let _ = writeln!(out, "  skin:      {}", self.texture.describe());
        let _ = writeln!(out, "  hash:      {}", self.texture.hash);
        if !self.persisted {
            let _ = writeln!(out, "  warning:   not persisted, storage unavailable");
        }
        let _ = writeln!(
            out,
            "  applied:   {} of {} connected",
            self.apply.applied,
            self.apply.representations()
        );
        out
    }
}

/// A stored record, without the raw value and signature.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub uuid: Uuid,
    pub name: String,
    pub intent: SkinIntent,
    pub source: SkinSource,
    #[serde(flatten)]
    pub texture: Texture,
    pub fetched_at: DateTime<Utc>,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StorageRecord> for RecordView {
    fn from(record: &StorageRecord) -> Self {
        let entry = record.to_entry();
        Self {
            uuid: record.uuid,
            name: record.name.clone(),
            intent: record.intent.clone(),
            source: record.source,
            texture: Texture::of(&entry.property),
            fetched_at: record.fetched_at,
            expires_at: entry.expires_at(),
            updated_at: record.updated_at,
        }
    }
}

impl Render for RecordView {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.name, self.uuid);
        let _ = writeln!(out, "  intent:    {}", self.intent);
        let _ = writeln!(out, "  source:    {}", self.source);
        let _ = writeln!(out, "  skin:      {}", self.texture.describe());
        let _ = writeln!(out, "  hash:      {}", self.texture.hash);
        let _ = writeln!(out, "  fetched:   {}", self.fetched_at.to_rfc3339());
        let expires = self
            .expires_at
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        let _ = writeln!(out, "  expires:   {}", expires);
        let _ = writeln!(out, "  updated:   {}", self.updated_at.to_rfc3339());
        out
    }
}

/// Output of `list`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct RecordTable(pub Vec<RecordView>);

impl Render for RecordTable {
    fn render(&self) -> String {
        if self.0.is_empty() {
            return "no skins stored\n".to_string();
        }
        let mut out = String::new();
        let _ = writeln!(out, "{:<36}  {:<16}  {:<14}  UPDATED", "UUID", "NAME", "SOURCE");
        for row in &self.0 {
            let _ = writeln!(
                out,
                "{:<36}  {:<16}  {:<14}  {}",
                row.uuid,
                row.name,
                row.source.as_str(),
                row.updated_at.to_rfc3339()
            );
        }
        out
    }
}
