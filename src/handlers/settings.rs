use crate::actix_web::web::{Json, Path};
use crate::context::UserInfo;
use crate::core::services::settings;
use crate::core::settings::Settings;
use crate::error::Error;
use crate::handlers::DB;

pub async fn get(path: Path<(i32,)>, db: DB) -> Result<Json<Settings>, Error> {
    let (form_id,) = path.into_inner();
    let mut store = db.acquire().await?;
    let settings = settings::form_settings(&mut store, form_id).await?;
    Ok(Json(settings))
}

/// The body is a partial settings document; absent fields keep their value.
pub async fn update(user: UserInfo, path: Path<(i32,)>, body: String, db: DB) -> Result<Json<Settings>, Error> {
    let (form_id,) = path.into_inner();
    let store = db.begin().await?;
    let settings = settings::update_settings(store, user.id, form_id, &body).await?;
    Ok(Json(settings))
}
