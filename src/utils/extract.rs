/// Extractors com rejeição no formato `{"error","status"}` de [`AppError`]
///
/// Os extractors padrão do axum respondem 422/400 com texto puro quando o
/// corpo, a query ou o path não desserializam.

use axum::extract::{FromRequest, FromRequestParts};

use super::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
