use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::{
    helpers::{from_json, to_json},
    Database,
};
use crate::settings::{ModelSettings, SettingsBackend, SettingsPatch};

const LAST_SELECTED_MODEL_KEY: &str = "last_selected_model";

#[async_trait]
impl SettingsBackend for Database {
    async fn load(&self, model_id: &str) -> Result<Option<ModelSettings>> {
        let model_id = model_id.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT inference_json, prompts_json
                     FROM model_settings
                     WHERE model_id = ?1",
                    params![model_id],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                        ))
                    },
                )
                .optional()
                .context("failed to query model settings")?;

            let Some((inference_json, prompts_json)) = row else {
                return Ok(None);
            };

            Ok(Some(ModelSettings {
                inference: from_json(inference_json, "inference_json")?.unwrap_or_default(),
                prompts: from_json(prompts_json, "prompts_json")?.unwrap_or_default(),
            }))
        })
        .await
    }

    async fn save(&self, model_id: &str, patch: SettingsPatch) -> Result<()> {
        let model_id = model_id.to_string();
        let now = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            match patch {
                SettingsPatch::Inference(inference) => {
                    let json = to_json(&inference, "inference settings")?;
                    conn.execute(
                        "INSERT INTO model_settings (model_id, inference_json, updated_at)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT(model_id) DO UPDATE SET
                             inference_json = excluded.inference_json,
                             updated_at = excluded.updated_at",
                        params![model_id, json, now],
                    )
                    .with_context(|| "failed to upsert inference settings")?;
                }
                SettingsPatch::Prompts(prompts) => {
                    let json = to_json(&prompts, "prompt settings")?;
                    conn.execute(
                        "INSERT INTO model_settings (model_id, prompts_json, updated_at)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT(model_id) DO UPDATE SET
                             prompts_json = excluded.prompts_json,
                             updated_at = excluded.updated_at",
                        params![model_id, json, now],
                    )
                    .with_context(|| "failed to upsert prompt settings")?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn last_selected_model(&self) -> Result<Option<String>> {
        self.execute(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM app_state WHERE key = ?1",
                    params![LAST_SELECTED_MODEL_KEY],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()
                .context("failed to read last selected model")?;
            Ok(value.flatten())
        })
        .await
    }

    async fn set_last_selected_model(&self, model_id: Option<&str>) -> Result<()> {
        let model_id = model_id.map(String::from);
        let now = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO app_state (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![LAST_SELECTED_MODEL_KEY, model_id, now],
            )
            .with_context(|| "failed to store last selected model")?;
            Ok(())
        })
        .await
    }
}
