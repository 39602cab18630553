//! Screenshot, video and trace attachments
//!
//! Screenshots are inlined as data URIs or copied next to the report. Videos
//! and traces are always copied. File bytes are never altered.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::ATTACHMENTS_DIR;
use crate::error::{OrtoniError, Result};
use crate::model::RawAttachment;

#[derive(Debug, Clone)]
pub struct AttachmentOptions {
    pub base64_image: bool,
    /// Report folder; copies land under `ortoni-data/attachments` inside it
    pub report_folder: PathBuf,
}

/// Attachment references ready to embed in a `TestResult`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachments {
    pub screenshots: Vec<String>,
    pub trace_path: Option<String>,
    pub video_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachmentKind {
    Screenshot,
    Video,
    Trace,
    Other,
}

/// Resolve all attachments of one attempt.
///
/// An attachment that cannot be read is logged and left out; the others are
/// still returned.
pub fn collect_attachments(
    raw: &[RawAttachment],
    test_key: &str,
    retry: u32,
    options: &AttachmentOptions,
) -> Attachments {
    let mut attachments = Attachments::default();
    let subdir = attempt_dir(test_key, retry);

    for attachment in raw {
        let resolved = match classify(attachment) {
            AttachmentKind::Screenshot => {
                screenshot_reference(attachment, &subdir, options).map(|r| {
                    attachments.screenshots.extend(r);
                })
            }
            AttachmentKind::Video if attachment.path.is_some() => {
                if attachments.video_path.is_some() {
                    tracing::debug!(test_key, "Ignoring additional video attachment");
                    Ok(())
                } else {
                    copy_to_report(attachment, &subdir, options)
                        .map(|p| attachments.video_path = Some(p))
                }
            }
            AttachmentKind::Trace if attachment.path.is_some() => {
                if attachments.trace_path.is_some() {
                    tracing::debug!(test_key, "Ignoring additional trace attachment");
                    Ok(())
                } else {
                    copy_to_report(attachment, &subdir, options)
                        .map(|p| attachments.trace_path = Some(p))
                }
            }
            _ => Ok(()),
        };

        if let Err(e) = resolved {
            tracing::warn!(
                test_key,
                attachment = %attachment.name,
                error = %e,
                "Omitting unreadable attachment"
            );
        }
    }

    attachments
}

fn classify(attachment: &RawAttachment) -> AttachmentKind {
    if attachment.name == "video" {
        return AttachmentKind::Video;
    }
    if attachment.name == "trace" {
        return AttachmentKind::Trace;
    }
    if attachment.content_type.starts_with("image/") {
        return AttachmentKind::Screenshot;
    }
    if attachment.content_type.is_empty() {
        let guessed_image = attachment
            .path
            .as_deref()
            .and_then(|p| mime_guess::from_path(p).first())
            .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE);
        if guessed_image {
            return AttachmentKind::Screenshot;
        }
    }
    AttachmentKind::Other
}

fn screenshot_reference(
    attachment: &RawAttachment,
    subdir: &Path,
    options: &AttachmentOptions,
) -> Result<Option<String>> {
    if let Some(path) = &attachment.path {
        if options.base64_image {
            let bytes = fs::read(path).map_err(|e| attachment_error(path, e))?;
            return Ok(Some(data_uri(&image_mime(attachment), &bytes)));
        }
        return copy_to_report(attachment, subdir, options).map(Some);
    }

    if let Some(body) = &attachment.body {
        let bytes = STANDARD
            .decode(body.trim())
            .map_err(|e| OrtoniError::Attachment {
                path: PathBuf::from(&attachment.name),
                reason: format!("invalid base64 body: {}", e),
            })?;
        return Ok(Some(data_uri(&image_mime(attachment), &bytes)));
    }

    Ok(None)
}

/// Copy an attachment file into the report folder and return its
/// report-relative path
fn copy_to_report(
    attachment: &RawAttachment,
    subdir: &Path,
    options: &AttachmentOptions,
) -> Result<String> {
    let source = attachment
        .path
        .as_deref()
        .ok_or_else(|| OrtoniError::Other(format!("attachment {} has no path", attachment.name)))?;

    let file_name = source
        .file_name()
        .ok_or_else(|| attachment_error(source, "path has no file name"))?;

    let relative = Path::new(ATTACHMENTS_DIR).join(subdir).join(file_name);
    let destination = options.report_folder.join(&relative);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| attachment_error(source, e))?;
    }
    fs::copy(source, &destination).map_err(|e| attachment_error(source, e))?;

    Ok(relative.to_string_lossy().replace('\\', "/"))
}

fn image_mime(attachment: &RawAttachment) -> String {
    if !attachment.content_type.is_empty() {
        return attachment.content_type.clone();
    }
    attachment
        .path
        .as_deref()
        .and_then(|p| mime_guess::from_path(p).first())
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "image/png".to_string())
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// `<key>/retry-<n>` with the key reduced to filesystem-safe characters
fn attempt_dir(test_key: &str, retry: u32) -> PathBuf {
    let safe: String = test_key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let safe = if safe.is_empty() {
        "test".to_string()
    } else {
        safe
    };
    Path::new(&safe).join(format!("retry-{}", retry))
}

fn attachment_error(path: &Path, reason: impl std::fmt::Display) -> OrtoniError {
    OrtoniError::Attachment {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
