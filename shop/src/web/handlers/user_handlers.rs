// shop/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::responses;

#[instrument(name = "handler::get_user_details", skip_all, fields(user_id = auth_user.user_id))]
pub async fn get_user_details_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = app_state.auth.user_details(auth_user.user_id).await?;
  Ok(responses::ok("fetched user data successful", user))
}
