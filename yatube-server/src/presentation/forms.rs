use std::collections::BTreeMap;

use actix_multipart::Multipart;
use actix_web::{FromRequest, HttpMessage, HttpRequest, web};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::application::post_service::PostDraft;
use crate::domain::error::DomainError;
use crate::domain::group::Group;
use crate::domain::post::PostEntry;
use crate::infrastructure::media::UploadedImage;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Field name → messages, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        for (field, list) in errors.field_errors() {
            for error in list {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                out.add(&field, message);
            }
        }
        out
    }
}

// ======================= POST =======================

/// Raw post form fields as submitted, before cleaning.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
    #[serde(default)]
    pub group: String,
    #[serde(skip)]
    pub image: Option<UploadedImage>,
}

impl PostForm {
    /// Reads the submission from a multipart or urlencoded body. Any other
    /// body counts as an empty form.
    pub async fn read(req: &HttpRequest, payload: web::Payload) -> Result<Self, DomainError> {
        let content_type = req.content_type().to_ascii_lowercase();
        if content_type.starts_with("multipart/form-data") {
            return Self::from_multipart(Multipart::new(req.headers(), payload)).await;
        }
        if content_type.starts_with("application/x-www-form-urlencoded") {
            let mut payload = payload.into_inner();
            let form = web::Form::<PostForm>::from_request(req, &mut payload)
                .await
                .map_err(|e| DomainError::BadRequest(e.to_string()))?;
            return Ok(form.into_inner());
        }
        Ok(Self::default())
    }

    async fn from_multipart(mut payload: Multipart) -> Result<Self, DomainError> {
        let mut form = PostForm::default();

        while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|m| m.essence_str().to_string());

            let bytes = field
                .bytes(MAX_IMAGE_BYTES)
                .await
                .map_err(|_| DomainError::BadRequest("upload too large".into()))?
                .map_err(bad_multipart)?;

            match name.as_str() {
                "text" => form.text = String::from_utf8_lossy(&bytes).into_owned(),
                "group" => form.group = String::from_utf8_lossy(&bytes).into_owned(),
                "image" => {
                    // browsers send an unnamed empty part when no file is picked
                    if let Some(file_name) = file_name.filter(|f| !f.is_empty()) {
                        form.image = Some(UploadedImage {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validates against the available groups. Nothing is stored here; on
    /// failure the submission comes back with its errors.
    pub fn clean(mut self, groups: &[Group]) -> Result<PostDraft, (Self, FormErrors)> {
        self.text = self.text.trim().to_string();
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::default(),
            Err(e) => FormErrors::from(e),
        };

        let group_id = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        // the declared content type is not trusted; the bytes must decode
        if let Some(upload) = &self.image {
            if image::load_from_memory(&upload.bytes).is_err() {
                errors.add("image", INVALID_IMAGE);
            }
        }

        if !errors.is_empty() {
            return Err((self, errors));
        }
        Ok(PostDraft {
            text: self.text,
            group_id,
            image: self.image,
        })
    }

    /// What the template shows after a failed submission.
    pub fn bound(&self, groups: &[Group], errors: FormErrors) -> PostFormView {
        PostFormView {
            text: self.text.clone(),
            group: Some(self.group.clone()).filter(|g| !g.is_empty()),
            image: None,
            choices: groups.to_vec(),
            errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostFormView {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
    pub choices: Vec<Group>,
    pub errors: FormErrors,
}

impl PostFormView {
    pub fn empty(groups: &[Group]) -> Self {
        Self {
            text: String::new(),
            group: None,
            image: None,
            choices: groups.to_vec(),
            errors: FormErrors::default(),
        }
    }

    /// Edit mode starts from the stored post.
    pub fn initial(post: &PostEntry, groups: &[Group]) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: post.image.clone(),
            choices: groups.to_vec(),
            errors: FormErrors::default(),
        }
    }
}

fn bad_multipart(err: actix_multipart::MultipartError) -> DomainError {
    DomainError::BadRequest(format!("malformed multipart body: {err}"))
}

// ======================= COMMENT =======================

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    pub fn clean(mut self) -> Result<String, (Self, FormErrors)> {
        self.text = self.text.trim().to_string();
        match self.validate() {
            Ok(()) => Ok(self.text),
            Err(e) => Err((self, FormErrors::from(e))),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CommentFormView {
    pub text: String,
    pub errors: FormErrors,
}

// ======================= SIGNUP =======================

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Enter a username of at most 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
}

impl SignupForm {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        self.username = self.username.trim().to_string();
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.validate().map_err(FormErrors::from)?;
        Ok(self)
    }
}

/// First path segments owned by fixed routes; a profile under one of these
/// would be unreachable.
pub const RESERVED_USERNAMES: &[&str] = &["auth", "new", "follow", "group"];

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(ValidationError::new("reserved")
            .with_message("This username is not available.".into()));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn groups() -> Vec<Group> {
        vec![Group {
            id: 7,
            title: "Cats".into(),
            slug: "cats".into(),
            description: String::new(),
        }]
    }

    fn post_form(text: &str, group: &str) -> PostForm {
        PostForm {
            text: text.into(),
            group: group.into(),
            image: None,
        }
    }

    #[test]
    fn blank_text_is_required() {
        let (_, errors) = post_form("   ", "").clean(&groups()).unwrap_err();

        assert_eq!(errors.get("text"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn group_must_be_an_existing_choice() {
        let (_, errors) = post_form("hello", "99").clean(&groups()).unwrap_err();
        assert_eq!(errors.get("group"), Some(&[INVALID_CHOICE.to_string()][..]));

        let (_, errors) = post_form("hello", "cats").clean(&groups()).unwrap_err();
        assert!(errors.get("group").is_some());

        let draft = post_form(" hello ", "7").clean(&groups()).unwrap();
        assert_eq!(draft.text, "hello");
        assert_eq!(draft.group_id, Some(7));
    }

    #[test]
    fn non_image_upload_is_rejected() {
        let mut form = post_form("hello", "");
        form.image = Some(UploadedImage {
            file_name: "notes.txt".into(),
            content_type: Some("text/plain".into()),
            bytes: b"hi".to_vec(),
        });

        let (_, errors) = form.clean(&groups()).unwrap_err();
        assert_eq!(errors.get("image"), Some(&[INVALID_IMAGE.to_string()][..]));
    }

    #[test]
    fn image_content_type_alone_is_not_enough() {
        let mut form = post_form("hello", "");
        form.image = Some(UploadedImage {
            file_name: "evil.gif".into(),
            content_type: Some("image/gif".into()),
            bytes: b"#!/bin/sh\necho not an image\n".to_vec(),
        });

        let (_, errors) = form.clean(&groups()).unwrap_err();
        assert_eq!(errors.get("image"), Some(&[INVALID_IMAGE.to_string()][..]));
    }

    #[test]
    fn decodable_image_is_accepted() {
        let mut form = post_form("hello", "");
        form.image = Some(UploadedImage {
            file_name: "small.gif".into(),
            content_type: None,
            bytes: SMALL_GIF.to_vec(),
        });

        let draft = form.clean(&groups()).unwrap();
        assert_eq!(draft.image.map(|i| i.file_name).as_deref(), Some("small.gif"));
    }

    #[test]
    fn comment_text_is_trimmed() {
        let ok = CommentForm { text: "  nice  ".into() }.clean().unwrap();
        assert_eq!(ok, "nice");

        let (_, errors) = CommentForm { text: " ".into() }.clean().unwrap_err();
        assert!(errors.get("text").is_some());
    }

    #[test]
    fn signup_checks_username_characters() {
        let form = SignupForm {
            username: "bad name!".into(),
            email: Some(String::new()),
            password: "long-enough-pw".into(),
        };

        let errors = form.clean().unwrap_err();
        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn signup_rejects_route_names() {
        for username in ["auth", "new", "follow", "group", "Auth"] {
            let form = SignupForm {
                username: username.into(),
                email: None,
                password: "long-enough-pw".into(),
            };

            let errors = form.clean().unwrap_err();
            assert!(errors.get("username").is_some(), "{username}");
        }
    }
}
