use crate::actix_web::{
    dev::{Service, ServiceRequest, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use crate::context::UserInfo;
use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error as AppError;
use crate::impls::tokener::jwt::{Claim, JWT};
use log::debug;
use std::future::{ready, Future, Ready};
use std::pin::Pin;

const BEARER: &str = "Bearer ";

/// Attaches a `UserInfo` when the request carries a valid bearer token. A
/// request without a token passes through anonymously; a bad token is
/// rejected.
pub(crate) struct JWTMiddleware {
    tokener: JWT,
}

impl JWTMiddleware {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { tokener: JWT::new(secret) }
    }
}

impl<S> Transform<S, ServiceRequest> for JWTMiddleware
where
    S: Service<ServiceRequest, Error = Error> + 'static,
    S::Future: 'static,
{
    type Error = Error;
    type Response = S::Response;
    type Transform = JWTService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JWTService {
            tokener: self.tokener.clone(),
            next_service: service,
        }))
    }
}

pub struct JWTService<S> {
    tokener: JWT,
    next_service: S,
}

fn identify(tokener: &JWT, req: &ServiceRequest) -> Result<Option<UserInfo>, AppError> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => return Ok(None),
        Some(h) => h.to_str().map_err(|_| AppError::Unauthorized)?,
    };
    let token = header.strip_prefix(BEARER).ok_or(AppError::Unauthorized)?.trim();
    let claim = <JWT as Tokener<Claim>>::verify_token(tokener, token).map_err(|e| {
        debug!("rejected token: {}", e);
        AppError::Unauthorized
    })?;
    Ok(Some(UserInfo { id: claim.user_id() }))
}

impl<S> Service<ServiceRequest> for JWTService<S>
where
    S: Service<ServiceRequest, Error = Error>,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.next_service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match identify(&self.tokener, &req) {
            Err(e) => return Box::pin(async move { Err(e.into()) }),
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
        }
        let res_fut = self.next_service.call(req);
        Box::pin(res_fut)
    }
}
