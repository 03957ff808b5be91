//! Console routes.
//!
//! Each handler builds page state, applies the user's action through the
//! auth context or vendor service, and renders the resulting state.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use super::ConsoleError;
use super::state::{
    AuthMode, DashboardState, LoginFormState, LoginSubmission, VendorFormState, VendorSubmission,
};
use crate::auth::{AuthError, SignUpOutcome, SignedInUser, User};
use crate::repositories::UpdateVendorRequest;
use crate::server::AppState;
use crate::services::NewVendor;

/// Console page routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        .route("/vendors", post(create_vendor))
        .route("/vendors/new", get(new_vendor_form))
        .route("/vendors/{id}", post(update_vendor))
        .route("/vendors/{id}/edit", get(edit_vendor_form))
        .route("/vendors/{id}/delete", post(delete_vendor))
}

fn page(status: StatusCode, html: String) -> Response {
    (status, Html(html)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub mode: Option<AuthMode>,
}

async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ConsoleError> {
    if let Some(auth) = state.sessions.context(&jar) {
        if auth.is_loading() {
            return Ok(page(StatusCode::OK, state.views.loading()?));
        }
        if auth.current_user().is_some() {
            return Ok(Redirect::to("/").into_response());
        }
    }

    let form = LoginFormState::new(query.mode.unwrap_or_default());
    Ok(page(StatusCode::OK, state.views.login(&form)?))
}

async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(submission): Form<LoginSubmission>,
) -> Result<Response, ConsoleError> {
    let form = LoginFormState::from_submission(&submission);
    if let Err(message) = form.check(&submission) {
        return rejected_login(&state, form.failed(message));
    }

    // Only contexts that end up signed in are registered.
    let auth = state.sessions.unregistered();
    let outcome = match form.mode {
        AuthMode::SignIn => auth
            .sign_in(&form.email, &submission.password)
            .await
            .map(|_| None),
        AuthMode::SignUp => auth
            .sign_up(&form.email, &submission.password)
            .await
            .map(|outcome| match outcome {
                SignUpOutcome::SignedIn(_) => None,
                SignUpOutcome::ConfirmationPending(_) => Some(form.clone().confirmation_pending()),
            }),
    };

    match outcome {
        Ok(None) => {
            if let Some(previous) = state.sessions.session_id(&jar) {
                state.sessions.remove(previous);
            }
            let id = state.sessions.insert(auth);
            let jar = jar.add(state.sessions.session_cookie(id));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Ok(Some(pending)) => Ok(page(StatusCode::OK, state.views.login(&pending)?)),
        Err(err) => {
            warn!(error = %err, mode = ?form.mode, "Authentication failed");
            rejected_login(&state, form.failed(err.to_string()))
        }
    }
}

fn rejected_login(state: &AppState, form: LoginFormState) -> Result<Response, ConsoleError> {
    Ok(page(
        StatusCode::UNPROCESSABLE_ENTITY,
        state.views.login(&form)?,
    ))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let closed = state
        .sessions
        .session_id(&jar)
        .and_then(|id| state.sessions.remove(id));

    if let Some(auth) = closed {
        match auth.sign_out().await {
            Ok(()) | Err(AuthError::NotSignedIn) => {}
            Err(err) => warn!(error = %err, "Sign-out failed"),
        }
    }
    (
        jar.remove(state.sessions.removal_cookie()),
        Redirect::to("/login"),
    )
}

async fn dashboard(
    State(state): State<AppState>,
    SignedInUser(user): SignedInUser,
) -> Result<Response, ConsoleError> {
    let dashboard = load_dashboard(&state, &user).await;
    Ok(page(StatusCode::OK, state.views.dashboard(&dashboard)?))
}

async fn load_dashboard(state: &AppState, user: &User) -> DashboardState {
    match state.vendors.list_vendors().await {
        Ok(vendors) => DashboardState::loaded(user, &vendors),
        Err(err) => {
            warn!(error = %err, "Failed to list vendors");
            DashboardState::loaded(user, &[]).with_alert(err.to_string())
        }
    }
}

async fn new_vendor_form(
    State(state): State<AppState>,
    _user: SignedInUser,
) -> Result<Response, ConsoleError> {
    let form = VendorFormState::for_new();
    Ok(page(StatusCode::OK, state.views.vendor_form(&form)?))
}

async fn create_vendor(
    State(state): State<AppState>,
    _user: SignedInUser,
    Form(submission): Form<VendorSubmission>,
) -> Result<Response, ConsoleError> {
    let form = VendorFormState::from_submission(None, submission);
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(message) => return rejected_form(&state, form.with_error(message)),
    };

    let created = state
        .vendors
        .create_vendor(NewVendor {
            slug: draft.slug,
            name: draft.name,
            schema: draft.schema,
        })
        .await;

    match created {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(err) => rejected_form(&state, form.with_error(err.to_string())),
    }
}

async fn edit_vendor_form(
    State(state): State<AppState>,
    _user: SignedInUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<Response, ConsoleError> {
    let vendor = state.vendors.get_vendor(vendor_id).await?;
    let form = VendorFormState::for_edit(&vendor);
    Ok(page(StatusCode::OK, state.views.vendor_form(&form)?))
}

async fn update_vendor(
    State(state): State<AppState>,
    _user: SignedInUser,
    Path(vendor_id): Path<Uuid>,
    Form(submission): Form<VendorSubmission>,
) -> Result<Response, ConsoleError> {
    let form = VendorFormState::from_submission(Some(vendor_id), submission);
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(message) => return rejected_form(&state, form.with_error(message)),
    };

    // The slug names the provisioned tables and stays fixed after creation.
    let update = UpdateVendorRequest {
        slug: None,
        name: Some(draft.name),
        schema: Some(draft.schema),
    };

    match state.vendors.update_vendor(vendor_id, update).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(err) => rejected_form(&state, form.with_error(err.to_string())),
    }
}

fn rejected_form(state: &AppState, form: VendorFormState) -> Result<Response, ConsoleError> {
    Ok(page(
        StatusCode::UNPROCESSABLE_ENTITY,
        state.views.vendor_form(&form)?,
    ))
}

async fn delete_vendor(
    State(state): State<AppState>,
    SignedInUser(user): SignedInUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<Response, ConsoleError> {
    match state.vendors.delete_vendor(vendor_id).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(err) => {
            warn!(vendor_id = %vendor_id, error = %err, "Vendor delete failed");
            let dashboard = load_dashboard(&state, &user)
                .await
                .with_alert(format!("Could not delete vendor: {err}"));
            Ok(page(StatusCode::OK, state.views.dashboard(&dashboard)?))
        }
    }
}
