use log::{error, info};

use crate::core::ports::repository::{FormCommon, Store, TxStore};
use crate::core::settings::{self, Settings};
use crate::error::Error;

pub async fn form_settings<S>(store: &mut S, form_id: i32) -> Result<Settings, Error>
where
    S: Store,
{
    let form = FormCommon::get(store, form_id).await?;
    settings::resolve(form.settings_json.as_deref())
}

/// Merges `raw_patch` into the stored settings of a form and persists the
/// normalized result. Only the form owner may do this.
pub async fn update_settings<S>(mut store: S, uid: i32, form_id: i32, raw_patch: &str) -> Result<Settings, Error>
where
    S: TxStore,
{
    let patch = settings::parse(raw_patch).map_err(|e| Error::InvalidSettingsPatch(e.to_string()))?;
    let form = FormCommon::get_for_update(&mut store, form_id).await?;
    if !form.is_owned_by(uid) {
        return Err(Error::Forbidden);
    }
    let base = settings::resolve(form.settings_json.as_deref()).map_err(|e| {
        error!("stored settings of form {} are unusable: {}", form_id, e);
        e
    })?;
    let mut merged = settings::merge(&base, &patch);
    settings::validate(&mut merged).map_err(|e| Error::InvalidSettingsPatch(e.to_string()))?;
    FormCommon::update_settings(&mut store, form_id, settings::normalize(&merged)?).await?;
    store.commit().await?;
    info!("settings of form {} updated by user {}", form_id, uid);
    Ok(merged)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::form::Form;
    use crate::core::settings::Tristate;
    use crate::database::memory::{MemoryDb, Tables};

    fn db(settings: Option<&str>) -> MemoryDb {
        MemoryDb::new(Tables {
            forms: vec![Form {
                id: 1,
                owner_id: Some(7),
                settings_json: settings.map(str::to_owned),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_patch_merges_and_persists() {
        let db = db(Some(r#"{"max_responses": 10, "language": "vi"}"#));
        let merged = update_settings(db.begin().await, 7, 1, r#"{"require_login": true}"#).await.unwrap();
        assert_eq!(merged.quota(), Some(10));
        assert!(merged.requires_login());

        let stored = db.snapshot().await.forms[0].settings_json.clone().unwrap();
        assert_eq!(stored, r#"{"max_responses":10,"require_login":true,"language":"vi"}"#);

        let cleared = update_settings(db.begin().await, 7, 1, r#"{"max_responses": null}"#).await.unwrap();
        assert_eq!(cleared.max_responses, Tristate::SetTo(None));
        assert_eq!(form_settings(&mut db.begin().await, 1).await.unwrap().quota(), None);
    }

    #[tokio::test]
    async fn test_bad_patches_are_rejected() {
        let db = db(Some(r#"{"start_at": 100}"#));
        assert!(matches!(update_settings(db.begin().await, 7, 1, "{oops").await, Err(Error::InvalidSettingsPatch(_))));
        assert!(matches!(
            update_settings(db.begin().await, 7, 1, r#"{"expire_at": 50}"#).await,
            Err(Error::InvalidSettingsPatch(_))
        ));
        assert!(matches!(update_settings(db.begin().await, 8, 1, "{}").await, Err(Error::Forbidden)));
        assert!(matches!(update_settings(db.begin().await, 7, 2, "{}").await, Err(Error::FormNotFound(2))));
        assert_eq!(db.snapshot().await.forms[0].settings_json.as_deref(), Some(r#"{"start_at": 100}"#));
    }

    #[tokio::test]
    async fn test_corrupt_stored_settings_are_a_server_fault() {
        let db = db(Some("[]"));
        assert!(matches!(update_settings(db.begin().await, 7, 1, "{}").await, Err(Error::InvalidSettingsFormat(_))));
        assert!(matches!(form_settings(&mut db.begin().await, 1).await, Err(Error::InvalidSettingsFormat(_))));
    }
}
