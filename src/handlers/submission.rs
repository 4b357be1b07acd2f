use actix_multipart::{Field, Multipart};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;

use crate::actix_web::{
    guard::GuardContext,
    http::header::CONTENT_TYPE,
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use crate::context::UserInfo;
use crate::core::codec::AttachmentPolicy;
use crate::core::models::submission::{Attachment, Attachments, Respondent, SubmissionDetail, Submit, SubmitRequest};
use crate::core::ports::uploader::AttachmentUploader;
use crate::core::services::submission;
use crate::error::Error;
use crate::handlers::DB;
use crate::request::SubmissionListParams;
use crate::response::List;

const DATA_FIELD: &str = "data";
const FILE_FIELD_PREFIX: &str = "file_";
const MAX_DATA_BYTES: usize = 1 << 20;

pub fn is_multipart(ctx: &GuardContext) -> bool {
    ctx.head()
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

fn malformed<E: ToString>(e: E) -> Error {
    Error::MalformedRequest(e.to_string())
}

/// Reads a field, keeping at most `limit` bytes and discarding the rest.
async fn collect(field: &mut Field, limit: usize) -> Result<Bytes, Error> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if buf.len() < limit {
            let take = (limit - buf.len()).min(chunk.len());
            buf.extend_from_slice(&chunk[..take]);
        }
    }
    Ok(buf.freeze())
}

/// Splits a multipart body into the JSON `data` field and `file_<question_id>`
/// parts. Files are cut one byte past `max_bytes` so oversize uploads are
/// still recognised as such.
async fn read_multipart(mut payload: Multipart, max_bytes: usize) -> Result<(SubmitRequest, Attachments), Error> {
    let mut request = None;
    let mut attachments = Attachments::new();
    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().to_owned();
        if name == DATA_FIELD {
            let raw = collect(&mut field, MAX_DATA_BYTES + 1).await?;
            if raw.len() > MAX_DATA_BYTES {
                return Err(Error::MalformedRequest("data field is too large".into()));
            }
            request = Some(serde_json::from_slice::<SubmitRequest>(&raw).map_err(malformed)?);
        } else if let Some(id) = name.strip_prefix(FILE_FIELD_PREFIX) {
            let question_id: i32 = id.parse().map_err(|_| Error::MalformedRequest(format!("invalid file field {}", name)))?;
            let filename = field.content_disposition().get_filename().unwrap_or_default().to_owned();
            let content = collect(&mut field, max_bytes + 1).await?;
            if attachments.insert(question_id, Attachment { filename, content }).is_some() {
                return Err(Error::MalformedRequest(format!("more than one file for question {}", question_id)));
            }
        } else {
            collect(&mut field, 0).await?;
        }
    }
    let request = request.ok_or_else(|| Error::MalformedRequest(format!("missing {} field", DATA_FIELD)))?;
    Ok((request, attachments))
}

async fn accept<U>(user: Option<UserInfo>, form_id: i32, request: SubmitRequest, attachments: Attachments, db: DB, uploader: Data<U>, policy: Data<AttachmentPolicy>) -> Result<HttpResponse, Error>
where
    U: AttachmentUploader + 'static,
{
    let store = db.begin().await?;
    let receipt = submission::submit(
        store,
        uploader.get_ref(),
        policy.get_ref(),
        Submit {
            form_id,
            respondent: user.map(|u| Respondent { id: u.id }),
            request,
            attachments,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(receipt))
}

pub async fn submit_json<U>(
    user: Option<UserInfo>,
    path: Path<(i32,)>,
    Json(request): Json<SubmitRequest>,
    db: DB,
    uploader: Data<U>,
    policy: Data<AttachmentPolicy>,
) -> Result<HttpResponse, Error>
where
    U: AttachmentUploader + 'static,
{
    accept(user, path.into_inner().0, request, Attachments::new(), db, uploader, policy).await
}

pub async fn submit_multipart<U>(
    user: Option<UserInfo>,
    path: Path<(i32,)>,
    payload: Multipart,
    db: DB,
    uploader: Data<U>,
    policy: Data<AttachmentPolicy>,
) -> Result<HttpResponse, Error>
where
    U: AttachmentUploader + 'static,
{
    let (request, attachments) = read_multipart(payload, policy.max_bytes).await?;
    accept(user, path.into_inner().0, request, attachments, db, uploader, policy).await
}

pub async fn list(user: UserInfo, path: Path<(i32,)>, params: Query<SubmissionListParams>, db: DB) -> Result<Json<List<SubmissionDetail>>, Error> {
    let pagination = params.pagination();
    let query = params.to_query(path.into_inner().0)?;
    let mut store = db.acquire().await?;
    let (list, total) = submission::list_submissions(&mut store, user.id, query, pagination).await?;
    Ok(Json(List::new(list, total, pagination.page(), pagination.limit)))
}

pub async fn detail(user: UserInfo, path: Path<(i32, i32)>, db: DB) -> Result<Json<SubmissionDetail>, Error> {
    let (form_id, id) = path.into_inner();
    let mut store = db.acquire().await?;
    let detail = submission::submission_detail(&mut store, user.id, form_id, id).await?;
    Ok(Json(detail))
}
