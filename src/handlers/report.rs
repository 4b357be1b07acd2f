use crate::actix_web::web::{Json, Path};
use crate::context::UserInfo;
use crate::core::services::report::{self, Dashboard};
use crate::error::Error;
use crate::handlers::DB;

pub async fn dashboard(user: UserInfo, path: Path<(i32,)>, db: DB) -> Result<Json<Dashboard>, Error> {
    let (form_id,) = path.into_inner();
    let mut store = db.acquire().await?;
    let dashboard = report::dashboard(&mut store, user.id, form_id).await?;
    Ok(Json(dashboard))
}
