use crate::actix_web::{self, dev::Payload, FromRequest, HttpMessage, HttpRequest};
use crate::error::Error;
use std::future::{ready, Ready};

/// Identity attached by the JWT middleware.
#[derive(Debug, Clone, Copy)]
pub struct UserInfo {
    pub id: i32,
}

impl FromRequest for UserInfo {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Self>() {
            Some(user) => ready(Ok(*user)),
            None => ready(Err(Error::Unauthorized.into())),
        }
    }
}
