use axum::{
    extract::Path,
    routing::{get, post},
    Json,
};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{AdminLoginSchema, JoinSchema, NewVenueSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, Venue},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/venues",
    tag = "venues",
    request_body = NewVenueSchema,
    responses(
        (status = 200, body = Venue)
    )
)]
async fn create_venue(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewVenueSchema>,
) -> ServerResult<Json<Venue>> {
    let venue = context
        .collab
        .auth
        .create_venue(body.name, &body.admin_password)
        .await?;

    Ok(Json(venue.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/venues/{code}",
    tag = "venues",
    params(
        ("code" = String, Path, description = "Join code of the venue, in any case")
    ),
    responses(
        (status = 200, body = Venue),
        (status = 404, description = "No venue has this code")
    )
)]
async fn venue(context: ServerContext, Path(code): Path<String>) -> ServerResult<Json<Venue>> {
    let venue = context.collab.auth.venue_by_code(&code).await?;

    Ok(Json(venue.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/venues/{code}/join",
    tag = "venues",
    request_body = JoinSchema,
    params(
        ("code" = String, Path, description = "Join code of the venue")
    ),
    responses(
        (status = 200, body = LoginResult),
        (status = 404, description = "No venue has this code")
    )
)]
async fn join(
    context: ServerContext,
    Path(code): Path<String>,
    ValidatedJson(body): ValidatedJson<JoinSchema>,
) -> ServerResult<Json<LoginResult>> {
    let login = context.collab.auth.join(&code, body.nickname).await?;

    Ok(Json(login.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/venues/{code}/admin",
    tag = "venues",
    request_body = AdminLoginSchema,
    params(
        ("code" = String, Path, description = "Join code of the venue")
    ),
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Wrong password")
    )
)]
async fn admin_login(
    context: ServerContext,
    Path(code): Path<String>,
    ValidatedJson(body): ValidatedJson<AdminLoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let login = context
        .collab
        .auth
        .admin_login(&code, &body.password)
        .await?;

    Ok(Json(login.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_venue))
        .route("/:code", get(venue))
        .route("/:code/join", post(join))
        .route("/:code/admin", post(admin_login))
}
