// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile management for the signed-in user.

use axum::{extract::State, Json};

use crate::{
    auth::{normalize_email, Auth},
    error::ApiError,
    models::{ProfileResponse, UpdateAvatarRequest, UpdateProfileRequest, UserProfile},
    state::AppState,
    storage::StoreError,
};

/// Preset avatar images a user may pick from.
pub const ALLOWED_AVATARS: &[&str] = &[
    "dog.png",
    "cat.png",
    "man.png",
    "woman.png",
    "anime_boy.png",
    "anime_girl.png",
    "football.png",
    "avatar_1.png",
    "avatar_2.png",
    "avatar_3.png",
];

pub const MAX_BIO_CHARS: usize = 200;

fn profile_update_error(e: StoreError) -> ApiError {
    match e {
        StoreError::EmailTaken => ApiError::bad_request("Email is already in use"),
        other => other.into(),
    }
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user's profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(State(state): State<AppState>, Auth(caller): Auth) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .users
        .get_user(&caller.user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ProfileResponse {
        success: true,
        message: None,
        user: UserProfile::from(&user),
    }))
}

#[utoipa::path(
    put,
    path = "/api/users/update-profile",
    request_body = UpdateProfileRequest,
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid field value or email in use"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if let Some(bio) = &request.bio {
        if bio.chars().count() > MAX_BIO_CHARS {
            return Err(ApiError::bad_request(format!(
                "Bio must be at most {MAX_BIO_CHARS} characters"
            )));
        }
    }
    let email = match request.email.as_deref().map(normalize_email) {
        Some(email) if !email.contains('@') => return Err(ApiError::bad_request("Invalid email address")),
        other => other,
    };

    let user = state
        .users
        .update_user(&caller.user_id, |user| -> Result<_, StoreError> {
            if let Some(name) = request.name {
                user.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
            }
            if let Some(email) = email {
                user.email = email;
            }
            if let Some(phone) = request.phone {
                user.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
            }
            if let Some(bio) = request.bio {
                user.bio = Some(bio);
            }
            Ok(user.clone())
        })
        .map_err(profile_update_error)?;

    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(ProfileResponse {
        success: true,
        message: Some("Profile updated successfully".to_string()),
        user: UserProfile::from(&user),
    }))
}

#[utoipa::path(
    put,
    path = "/api/users/update-avatar",
    request_body = UpdateAvatarRequest,
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Avatar updated", body = ProfileResponse),
        (status = 400, description = "Not one of the preset avatars"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_avatar(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<UpdateAvatarRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Some(image) = request
        .profile_image
        .filter(|image| ALLOWED_AVATARS.contains(&image.as_str()))
    else {
        return Err(ApiError::bad_request("Invalid avatar selection"));
    };

    let user = state
        .users
        .update_user(&caller.user_id, |user| -> Result<_, StoreError> {
            user.profile_image = Some(image);
            Ok(user.clone())
        })?;

    Ok(Json(ProfileResponse {
        success: true,
        message: Some("Avatar updated successfully".to_string()),
        user: UserProfile::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::ledger::enroll;
    use crate::storage::NewUser;
    use crate::test_support::test_state;
    use axum::http::StatusCode;

    fn register(state: &AppState, email: &str) -> Auth {
        let reg = enroll(
            &state.users,
            NewUser {
                name: Some("Pat".to_string()),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                gender: None,
                occupation: None,
                occupation_type: None,
                agreed_to_privacy_policy: true,
            },
            None,
            state.rng.as_ref(),
        )
        .unwrap();
        Auth(AuthenticatedUser {
            user_id: reg.user.id,
            role: Role::User,
            expires_at: 0,
        })
    }

    fn again(auth: &Auth) -> Auth {
        Auth(auth.0.clone())
    }

    #[tokio::test]
    async fn update_profile_changes_only_given_fields() {
        let (state, _dir) = test_state();
        let caller = register(&state, "pat@example.com");

        let Json(body) = update_profile(
            State(state.clone()),
            again(&caller),
            Json(UpdateProfileRequest {
                bio: Some("Hello there".to_string()),
                phone: Some(" 555-0100 ".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(body.user.bio.as_deref(), Some("Hello there"));
        assert_eq!(body.user.phone.as_deref(), Some("555-0100"));
        assert_eq!(body.user.name.as_deref(), Some("Pat"));
        assert_eq!(body.user.email, "pat@example.com");

        let Json(profile) = get_profile(State(state), caller).await.unwrap();
        assert_eq!(profile.user.bio.as_deref(), Some("Hello there"));
    }

    #[tokio::test]
    async fn long_bio_is_rejected() {
        let (state, _dir) = test_state();
        let caller = register(&state, "pat@example.com");

        let err = update_profile(
            State(state),
            caller,
            Json(UpdateProfileRequest {
                bio: Some("x".repeat(MAX_BIO_CHARS + 1)),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn email_change_is_normalized_and_unique() {
        let (state, _dir) = test_state();
        let caller = register(&state, "pat@example.com");
        register(&state, "taken@example.com");

        let Json(body) = update_profile(
            State(state.clone()),
            again(&caller),
            Json(UpdateProfileRequest {
                email: Some("Pat.New@Example.com".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.user.email, "pat.new@example.com");
        assert!(state.users.find_by_email("pat.new@example.com").unwrap().is_some());

        let err = update_profile(
            State(state),
            caller,
            Json(UpdateProfileRequest {
                email: Some("TAKEN@example.com".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Email is already in use");
    }

    #[tokio::test]
    async fn avatar_must_be_a_preset() {
        let (state, _dir) = test_state();
        let caller = register(&state, "pat@example.com");

        let err = update_avatar(
            State(state.clone()),
            again(&caller),
            Json(UpdateAvatarRequest {
                profile_image: Some("../../etc/passwd".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(body) = update_avatar(
            State(state),
            caller,
            Json(UpdateAvatarRequest {
                profile_image: Some("cat.png".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.user.profile_image.as_deref(), Some("cat.png"));
    }
}
